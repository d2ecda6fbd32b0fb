//! The REPL shell: direct-mode line storage, exit commands, and error
//! rendering (`spec.md` §6 "REPL commands", §7 "user-visible failure
//! behaviour").
//!
//! Grounded on the teacher's `main.rs` command loop: read a line, decide
//! what kind of thing it is, dispatch, print, repeat.

use crate::error::BasicError;
use crate::interpreter::{Interpreter, RunOutcome};
use crate::io::Io;

const EXIT_WORDS: &[&str] = &["QUIT", "EXIT", "BYE", "SYSTEM"];

pub fn is_exit_command(line: &str) -> bool {
    EXIT_WORDS.contains(&line.trim().to_ascii_uppercase().as_str())
}

/// Splits a line into (line number, rest) if it begins with a digit after
/// leading spaces; `None` means it's a direct-mode command.
fn leading_line_number(line: &str) -> Option<(u16, &str)> {
    let trimmed = line.trim_start();
    let digits_end = trimmed.find(|c: char| !c.is_ascii_digit()).unwrap_or(trimmed.len());
    if digits_end == 0 {
        return None;
    }
    let number: u16 = trimmed[..digits_end].parse().ok()?;
    Some((number, &trimmed[digits_end..]))
}

/// Verbose long-form vs short two-letter error rendering, per `spec.md` §7.
pub fn render_error(error: BasicError, line: Option<u16>, verbose: bool) -> String {
    let mut out = String::from("\n?");
    if verbose {
        out.push_str(&error.long_message());
    } else {
        out.push_str(error.short_code());
        out.push_str(" ERROR");
    }
    if let Some(n) = line {
        out.push_str(" IN ");
        out.push_str(&n.to_string());
    }
    out.push('\n');
    out
}

pub struct Repl {
    pub verbose_errors: bool,
}

impl Repl {
    pub fn new(verbose_errors: bool) -> Self {
        Repl { verbose_errors }
    }

    /// Runs the interactive loop until an exit command or end of input.
    pub fn run_loop(&self, interp: &mut Interpreter, io: &mut dyn Io) {
        loop {
            io.write_str("\nREADY.\n");
            io.flush();
            let Some(line) = io.read_line() else { break };
            if line.trim().is_empty() {
                continue;
            }
            if is_exit_command(&line) {
                break;
            }
            self.handle_line(interp, io, &line);
        }
    }

    fn handle_line(&self, interp: &mut Interpreter, io: &mut dyn Io, line: &str) {
        if let Some((number, rest)) = leading_line_number(line) {
            if let Err(e) = interp.store_line(number, rest) {
                io.write_str(&render_error(e, None, self.verbose_errors));
            }
            return;
        }
        let outcome = dispatch_direct(interp, io, line);
        self.report(io, outcome);
    }

    fn report(&self, io: &mut dyn Io, outcome: RunOutcome) {
        match outcome {
            RunOutcome::Ended => {}
            RunOutcome::Stopped(line) => {
                io.write_str(&format!("\nBREAK{}\n", line.map(|n| format!(" IN {n}")).unwrap_or_default()));
            }
            RunOutcome::Error { error, line } => {
                io.write_str(&render_error(error, line, self.verbose_errors));
            }
        }
    }
}

/// Recognises the handful of direct-mode-only commands (RUN/NEW/CLEAR/
/// LIST/CONT) before falling through to ordinary statement execution.
fn dispatch_direct(interp: &mut Interpreter, io: &mut dyn Io, line: &str) -> RunOutcome {
    let upper = line.trim().to_ascii_uppercase();
    if upper == "NEW" {
        interp.new_program();
        return RunOutcome::Ended;
    }
    if upper == "CLEAR" {
        interp.clear();
        return RunOutcome::Ended;
    }
    if upper == "CONT" {
        return interp.cont(io);
    }
    if upper == "LIST" {
        io.write_str(&interp.list(None, None));
        return RunOutcome::Ended;
    }
    if upper == "RUN" {
        return interp.run(io, None);
    }
    if let Some(rest) = upper.strip_prefix("RUN ") {
        if let Ok(n) = rest.trim().parse::<u16>() {
            return interp.run(io, Some(n));
        }
    }
    interp.execute_direct(line, io)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_all_exit_words_case_insensitively() {
        assert!(is_exit_command("quit"));
        assert!(is_exit_command("Bye"));
        assert!(is_exit_command("SYSTEM"));
        assert!(!is_exit_command("RUN"));
    }

    #[test]
    fn leading_line_number_splits_number_and_body() {
        let (n, rest) = leading_line_number("  10 PRINT X").unwrap();
        assert_eq!(n, 10);
        assert_eq!(rest.trim(), "PRINT X");
        assert!(leading_line_number("PRINT X").is_none());
    }

    #[test]
    fn error_rendering_short_form_includes_line() {
        let msg = render_error(BasicError::SyntaxError, Some(40), false);
        assert_eq!(msg, "\n?SN ERROR IN 40\n");
    }

    #[test]
    fn error_rendering_long_form_omits_line_when_direct() {
        let msg = render_error(BasicError::TypeMismatch, None, true);
        assert_eq!(msg, "\n?TYPE MISMATCH\n");
    }
}
