use std::fs;
use std::process::ExitCode;

use clap::Parser as ClapParser;
use msbasic::config::Config;
use msbasic::interpreter::{Interpreter, RunOutcome};
use msbasic::io::StdIo;
use msbasic::repl::{render_error, Repl};

/// A faithful interpreter for Microsoft BASIC 1.1.
#[derive(ClapParser, Debug)]
#[command(name = "msbasic", version, about)]
struct Cli {
    /// BASIC program to load and run before entering the REPL.
    file: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,

    /// Render runtime errors in long form (`?TYPE MISMATCH`) instead of the
    /// terse two-letter form (`?TM ERROR`).
    #[arg(long)]
    verbose_errors: bool,
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    let _ = fern::Dispatch::new()
        .format(|out, message, record| out.finish(format_args!("[{} {}] {}", record.target(), record.level(), message)))
        .level(level)
        .chain(std::io::stderr())
        .apply();
}

/// Loads a program file line by line. Blank lines, lines starting with `#`,
/// and lines not starting (after leading spaces) with a digit are skipped
/// rather than fed to the tokenizer, so a file can carry a shebang line or
/// comments outside of numbered BASIC lines.
fn load_program(interp: &mut Interpreter, source: &str) -> Result<(), String> {
    for raw_line in source.split('\n') {
        let line = raw_line.trim_end_matches('\r');
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if !trimmed.starts_with(|c: char| c.is_ascii_digit()) {
            continue;
        }
        let digits_end = trimmed.find(|c: char| !c.is_ascii_digit()).unwrap_or(trimmed.len());
        let number: u16 = trimmed[..digits_end]
            .parse()
            .map_err(|_| format!("line number out of range: {}", &trimmed[..digits_end]))?;
        interp
            .store_line(number, &trimmed[digits_end..])
            .map_err(|e| format!("{number}: {}", e.long_message()))?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let mut interp = Interpreter::new(Config::default());

    if let Some(path) = &cli.file {
        let source = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("msbasic: cannot read {path}: {e}");
                return ExitCode::FAILURE;
            }
        };
        if let Err(msg) = load_program(&mut interp, &source) {
            eprintln!("msbasic: {msg}");
            return ExitCode::FAILURE;
        }
        log::info!("loaded {path}");
        let mut io = StdIo::new();
        if let RunOutcome::Error { error, line } = interp.run(&mut io, None) {
            print!("{}", render_error(error, line, cli.verbose_errors));
        }
    }

    let mut io = StdIo::new();
    let repl = Repl::new(cli.verbose_errors);
    repl.run_loop(&mut interp, &mut io);
    ExitCode::SUCCESS
}
