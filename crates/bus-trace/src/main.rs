//! CLI entry point for the capture analysis binary.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

use bus_trace::{
    find_glitches, int_edges, read_capture, trace_fetches, trace_states, Capture, TimeWindow,
};
use i8008_bus as _;
#[cfg(test)]
use tempfile as _;
use thiserror as _;

const USAGE_TEXT: &str = "\
Usage: i8008-trace <command> <capture.csv> [options]

Commands:
  states    <capture> [--from <us>] [--to <us>]  State-by-state trace with bus values
  int-edges <capture>                            List INT rising edges
  glitches  <capture> [--from <us>] [--to <us>]  Find data-bus and CP_D_EN glitches
  fetches   <capture> [--max <n>]                Opcode fetches from the first T1I

Options:
  --from <us>   Ignore samples before this time (microseconds)
  --to <us>     Stop after this time (microseconds)
  --max <n>     Maximum fetches to list (default: 30)
  -h, --help    Show this help message

Exit status: 0 on success, 1 on usage or capture errors, 2 when glitches
finds anything.
";

const DEFAULT_MAX_FETCHES: usize = 30;

#[derive(Debug, PartialEq)]
enum Command {
    States(WindowArgs),
    IntEdges(PathBuf),
    Glitches(WindowArgs),
    Fetches(FetchArgs),
}

#[derive(Debug, PartialEq)]
struct WindowArgs {
    input: PathBuf,
    window: TimeWindow,
}

#[derive(Debug, PartialEq, Eq)]
struct FetchArgs {
    input: PathBuf,
    max: usize,
}

#[derive(Debug)]
enum ParseResult {
    Command(Command),
    Help,
}

#[derive(Debug, Default)]
struct RawArgs {
    input: Option<PathBuf>,
    from: Option<f64>,
    to: Option<f64>,
    max: Option<usize>,
}

fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let first = args.next().ok_or_else(|| "missing command".to_string())?;

    if first == "--help" || first == "-h" {
        return Ok(ParseResult::Help);
    }

    let command = first.to_string_lossy().to_string();
    let (allow_window, allow_max) = match command.as_str() {
        "states" | "glitches" => (true, false),
        "int-edges" => (false, false),
        "fetches" => (false, true),
        other => return Err(format!("unknown command: {other}")),
    };
    let raw = parse_options(args, allow_window, allow_max)?;
    let input = raw.input.ok_or_else(|| "missing capture path".to_string())?;
    let window = TimeWindow {
        start_us: raw.from,
        end_us: raw.to,
    };

    let command = match command.as_str() {
        "states" => Command::States(WindowArgs { input, window }),
        "glitches" => Command::Glitches(WindowArgs { input, window }),
        "fetches" => Command::Fetches(FetchArgs {
            input,
            max: raw.max.unwrap_or(DEFAULT_MAX_FETCHES),
        }),
        _ => Command::IntEdges(input),
    };
    Ok(ParseResult::Command(command))
}

#[allow(clippy::while_let_on_iterator)]
fn parse_options(
    mut args: impl Iterator<Item = OsString>,
    allow_window: bool,
    allow_max: bool,
) -> Result<RawArgs, String> {
    let mut raw = RawArgs::default();

    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            return Err(USAGE_TEXT.to_string());
        }

        let flag = arg.to_string_lossy().to_string();
        match flag.as_str() {
            "--from" | "--to" if allow_window => {
                let value = args
                    .next()
                    .ok_or_else(|| format!("missing value for {flag}"))?;
                let value = value.to_string_lossy();
                let micros = value
                    .parse::<f64>()
                    .map_err(|_| format!("invalid time for {flag}: {value}"))?;
                if flag == "--from" {
                    raw.from = Some(micros);
                } else {
                    raw.to = Some(micros);
                }
            }
            "--max" if allow_max => {
                let value = args
                    .next()
                    .ok_or_else(|| "missing value for --max".to_string())?;
                let value = value.to_string_lossy();
                raw.max = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("invalid count for --max: {value}"))?,
                );
            }
            _ if flag.starts_with('-') => return Err(format!("unknown option: {flag}")),
            _ => {
                if raw.input.is_some() {
                    return Err("multiple capture paths provided".to_string());
                }
                raw.input = Some(PathBuf::from(arg));
            }
        }
    }

    Ok(raw)
}

fn load(input: &PathBuf) -> Result<Capture, i32> {
    read_capture(input).map_err(|e| {
        eprintln!("error: {e}");
        1
    })
}

fn hex_or_unknown(value: Option<u8>) -> String {
    value.map_or_else(|| "??".to_string(), |v| format!("{v:02X}"))
}

fn level(value: Option<bool>) -> char {
    match value {
        Some(true) => '1',
        Some(false) => '0',
        None => '?',
    }
}

fn run_states(args: &WindowArgs) -> Result<(), i32> {
    let capture = load(&args.input)?;
    let records = trace_states(&capture, args.window);
    let mut cycle = 0;
    for record in &records {
        if record.cycle != cycle {
            cycle = record.cycle;
            println!("--- Cycle #{cycle} ---");
        }
        let state = record.state.map_or("?", |state| state.mnemonic());
        let kind = record
            .cycle_type
            .map(|kind| format!("  type={}", kind.mnemonic()))
            .unwrap_or_default();
        println!(
            "{:6} {:10.2}us  {state:<7} D=0x{} INT={}{kind}",
            record.line,
            record.time_us,
            hex_or_unknown(record.data),
            level(record.int),
        );
    }
    println!("{} states", records.len());
    Ok(())
}

fn run_int_edges(input: &PathBuf) -> Result<(), i32> {
    let capture = load(input)?;
    let edges = int_edges(&capture);
    println!("Found {} INT rising edges:", edges.len());
    for (index, edge) in edges.iter().enumerate() {
        println!(
            "  Edge {}: Line {:5} @ {:8.2}us",
            index + 1,
            edge.line,
            edge.time_us
        );
    }
    Ok(())
}

fn run_glitches(args: &WindowArgs) -> Result<(), i32> {
    let capture = load(&args.input)?;
    let report = find_glitches(&capture, args.window);
    for (index, glitch) in report.data.iter().enumerate() {
        let state = glitch.state.map_or("?", |state| state.mnemonic());
        println!(
            "GLITCH #{} at ~{:.1}us: {state} lines {}-{}",
            index + 1,
            glitch.time_us,
            glitch.first_line,
            glitch.end_line
        );
        for (value, count) in &glitch.values {
            println!("    0x{value:02X} ({value:08b}) - {count} samples");
        }
    }
    for glitch in &report.enable {
        let state = glitch.state.map_or("?", |state| state.mnemonic());
        println!(
            "CP_D_EN GLITCH at {:.1}us (line {}): {} -> {} in {state}",
            glitch.time_us,
            glitch.line,
            level(glitch.from),
            level(glitch.to)
        );
    }
    println!(
        "{} samples, {} data glitches, {} enable glitches",
        report.samples,
        report.data.len(),
        report.enable.len()
    );
    if report.is_clean() {
        Ok(())
    } else {
        Err(2)
    }
}

fn run_fetches(args: &FetchArgs) -> Result<(), i32> {
    let capture = load(&args.input)?;
    let fetches = trace_fetches(&capture, args.max);
    for (index, fetch) in fetches.iter().enumerate() {
        let marker = if fetch.acknowledge { " (interrupt)" } else { "" };
        println!(
            "#{:2} @{:5}: Opcode=0x{:02X}{marker}",
            index + 1,
            fetch.line,
            fetch.opcode
        );
    }
    println!("Traced {} fetches", fetches.len());
    Ok(())
}

fn main() {
    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Command(command)) => {
            let result = match &command {
                Command::States(args) => run_states(args),
                Command::IntEdges(input) => run_int_edges(input),
                Command::Glitches(args) => run_glitches(args),
                Command::Fetches(args) => run_fetches(args),
            };
            match result {
                Ok(()) => 0,
                Err(code) => code,
            }
        }
        Err(error) => {
            if error.starts_with("Usage:") {
                println!("{error}");
            } else {
                eprintln!("error: {error}");
                eprintln!("{USAGE_TEXT}");
            }
            1
        }
    };

    std::process::exit(exit_code);
}
