//! Byte-serial console behind three I/O ports.

use std::collections::VecDeque;

/// Host-fed receive queue plus a transmit log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Console {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
}

impl Console {
    /// Creates an idle console.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues bytes for the program to read.
    pub fn push_input(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    /// Byte presented on the receive port (`0x00` when empty).
    #[must_use]
    pub fn rx_value(&self) -> u8 {
        self.rx.front().copied().unwrap_or(0)
    }

    /// Byte presented on the status port.
    #[must_use]
    pub fn status_value(&self) -> u8 {
        u8::from(!self.rx.is_empty())
    }

    /// Drops the head of the receive queue after the program read it.
    pub fn consume_rx(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }

    /// Records a byte written to the transmit port.
    pub fn transmit(&mut self, value: u8) {
        self.tx.push(value);
    }

    /// Everything transmitted so far.
    #[must_use]
    pub fn output(&self) -> &[u8] {
        &self.tx
    }

    /// Drains the transmit log.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.tx)
    }

    /// Bytes still waiting to be read.
    #[must_use]
    pub fn pending_input(&self) -> usize {
        self.rx.len()
    }
}

#[cfg(test)]
mod tests {
    use super::Console;

    #[test]
    fn receive_queue_is_fifo_and_reads_zero_when_empty() {
        let mut console = Console::new();
        assert_eq!(console.rx_value(), 0x00);
        assert_eq!(console.status_value(), 0);

        console.push_input(b"hi");
        assert_eq!(console.pending_input(), 2);
        assert_eq!(console.status_value(), 1);
        assert_eq!(console.rx_value(), b'h');
        assert_eq!(console.consume_rx(), Some(b'h'));
        assert_eq!(console.rx_value(), b'i');
        console.consume_rx();
        assert_eq!(console.pending_input(), 0);
        assert_eq!(console.status_value(), 0);
        assert_eq!(console.consume_rx(), None);
    }

    #[test]
    fn transmit_log_accumulates_until_taken() {
        let mut console = Console::new();
        console.transmit(b'o');
        console.transmit(b'k');
        assert_eq!(console.output(), b"ok");
        assert_eq!(console.take_output(), b"ok".to_vec());
        assert!(console.output().is_empty());
    }
}
