//! Intel HEX ROM images.

use thiserror::Error;

use crate::memory::ADDRESS_SPACE_BYTES;
use crate::ConfigError;

const RECORD_DATA: u8 = 0x00;
const RECORD_EOF: u8 = 0x01;

/// Malformed Intel HEX input. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum HexError {
    /// Record does not begin with `:`.
    #[error("line {line}: record must start with ':'")]
    MissingStartCode {
        /// Offending line.
        line: usize,
    },
    /// Non-hex character or odd digit count.
    #[error("line {line}: invalid hex digits")]
    InvalidDigit {
        /// Offending line.
        line: usize,
    },
    /// Byte count field disagrees with the record length.
    #[error("line {line}: record length does not match its byte count")]
    LengthMismatch {
        /// Offending line.
        line: usize,
    },
    /// Record bytes do not sum to zero.
    #[error("line {line}: checksum mismatch (expected {expected:#04x}, found {found:#04x})")]
    ChecksumMismatch {
        /// Offending line.
        line: usize,
        /// Checksum the record should carry.
        expected: u8,
        /// Checksum it carries.
        found: u8,
    },
    /// Record type other than data or end-of-file.
    #[error("line {line}: unsupported record type {kind:#04x}")]
    UnsupportedRecord {
        /// Offending line.
        line: usize,
        /// Record type.
        kind: u8,
    },
    /// Data runs past the 14-bit address space.
    #[error("line {line}: data at {addr:#06x} runs past the address space")]
    AddressOverflow {
        /// Offending line.
        line: usize,
        /// Record load address.
        addr: u16,
    },
    /// Input ended without an end-of-file record.
    #[error("missing end-of-file record")]
    MissingEof,
}

/// Failure loading a ROM image into a system.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    /// Image text could not be parsed.
    #[error(transparent)]
    Hex(#[from] HexError),
    /// Parsed image does not fit the ROM.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Parses Intel HEX text into a flat image starting at address zero.
///
/// Gaps between records are filled with `0x00`. Blank lines are skipped and
/// anything after the end-of-file record is ignored.
///
/// # Errors
///
/// Returns a [`HexError`] describing the first malformed record.
pub fn parse_intel_hex(text: &str) -> Result<Vec<u8>, HexError> {
    let mut image = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let record = raw.trim();
        if record.is_empty() {
            continue;
        }
        let body = record
            .strip_prefix(':')
            .ok_or(HexError::MissingStartCode { line })?;
        let bytes = decode_hex(body).ok_or(HexError::InvalidDigit { line })?;
        let [count, addr_hi, addr_lo, kind, ..] = bytes[..] else {
            return Err(HexError::LengthMismatch { line });
        };
        if bytes.len() != usize::from(count) + 5 {
            return Err(HexError::LengthMismatch { line });
        }
        let (payload, checksum) = bytes.split_at(bytes.len() - 1);
        let expected = payload
            .iter()
            .fold(0_u8, |sum, byte| sum.wrapping_add(*byte))
            .wrapping_neg();
        if expected != checksum[0] {
            return Err(HexError::ChecksumMismatch {
                line,
                expected,
                found: checksum[0],
            });
        }
        match kind {
            RECORD_DATA => {
                let addr = u16::from_be_bytes([addr_hi, addr_lo]);
                let data = &payload[4..];
                let end = usize::from(addr) + data.len();
                if end > ADDRESS_SPACE_BYTES {
                    return Err(HexError::AddressOverflow { line, addr });
                }
                if image.len() < end {
                    image.resize(end, 0);
                }
                image[usize::from(addr)..end].copy_from_slice(data);
            }
            RECORD_EOF => return Ok(image),
            other => return Err(HexError::UnsupportedRecord { line, kind: other }),
        }
    }
    Err(HexError::MissingEof)
}

fn decode_hex(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(text.get(i..i + 2)?, 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{parse_intel_hex, HexError};

    #[test]
    fn data_records_fill_a_flat_image() {
        let text = ":03000000C0C1C2BA\n\n:02000800AABB91\n:00000001FF\n";
        let image = parse_intel_hex(text).unwrap();
        assert_eq!(image.len(), 10);
        assert_eq!(&image[..3], &[0xC0, 0xC1, 0xC2]);
        assert_eq!(&image[3..8], &[0; 5]);
        assert_eq!(&image[8..], &[0xAA, 0xBB]);
    }

    #[test]
    fn checksum_errors_name_the_line() {
        let text = ":00000001FF\n";
        assert_eq!(parse_intel_hex(text), Ok(vec![]));
        let bad = ":03000000C0C1C2BB\n:00000001FF\n";
        assert_eq!(
            parse_intel_hex(bad),
            Err(HexError::ChecksumMismatch {
                line: 1,
                expected: 0xBA,
                found: 0xBB
            })
        );
    }

    #[test]
    fn structural_errors_are_reported() {
        assert_eq!(
            parse_intel_hex("03000000C0C1C2BA\n"),
            Err(HexError::MissingStartCode { line: 1 })
        );
        assert_eq!(
            parse_intel_hex(":0300ZZ00C0C1C2B8\n"),
            Err(HexError::InvalidDigit { line: 1 })
        );
        assert_eq!(
            parse_intel_hex(":04000000C0C1C2B7\n"),
            Err(HexError::LengthMismatch { line: 1 })
        );
        assert_eq!(
            parse_intel_hex(":00000002FE\n"),
            Err(HexError::UnsupportedRecord { line: 1, kind: 0x02 })
        );
        assert_eq!(
            parse_intel_hex(":03000000C0C1C2BA\n"),
            Err(HexError::MissingEof)
        );
        assert_eq!(
            parse_intel_hex(":023FFF00AABB5B\n"),
            Err(HexError::AddressOverflow {
                line: 1,
                addr: 0x3FFF
            })
        );
    }
}
