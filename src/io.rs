//! The terminal I/O abstraction `spec.md` §6 names as an external
//! collaborator: a trait fixing the interface, with a real stdin/stdout
//! implementation and an in-memory one for tests.
//!
//! Grounded on the teacher's `devices::Device` trait: a small interface the
//! core interpreter is generic over, so the same statement executor drives
//! both a live terminal and a scripted test harness.

use std::io::{self, BufRead, Write};

pub trait Io {
    /// Reads one line for INPUT (without the trailing newline), or `None`
    /// at end of input.
    fn read_line(&mut self) -> Option<String>;

    /// Reads a single byte for GET. The port's `GET` is specified (per
    /// `spec.md` §9 Open Questions) to buffer until newline like `getchar`,
    /// so implementations may satisfy this from the same line buffer as
    /// `read_line`.
    fn read_byte(&mut self) -> Option<u8>;

    fn write_str(&mut self, s: &str);

    fn flush(&mut self);
}

/// Real terminal I/O: line-buffered stdin, unbuffered-on-flush stdout.
pub struct StdIo {
    stdin: io::Stdin,
    stdout: io::Stdout,
    get_buffer: Vec<u8>,
}

impl StdIo {
    pub fn new() -> Self {
        StdIo { stdin: io::stdin(), stdout: io::stdout(), get_buffer: Vec::new() }
    }
}

impl Default for StdIo {
    fn default() -> Self {
        Self::new()
    }
}

impl Io for StdIo {
    fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.stdin.lock().read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => {
                if line.ends_with('\n') {
                    line.pop();
                    if line.ends_with('\r') {
                        line.pop();
                    }
                }
                Some(line)
            }
            Err(_) => None,
        }
    }

    fn read_byte(&mut self) -> Option<u8> {
        if self.get_buffer.is_empty() {
            let mut line = String::new();
            match self.stdin.lock().read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => {
                    self.get_buffer = line.into_bytes();
                    self.get_buffer.push(b'\n');
                }
                Err(_) => return None,
            }
        }
        if self.get_buffer.is_empty() {
            None
        } else {
            Some(self.get_buffer.remove(0))
        }
    }

    fn write_str(&mut self, s: &str) {
        let _ = self.stdout.write_all(s.as_bytes());
    }

    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }
}

/// An in-memory `Io` for tests: a queue of input lines (used by both
/// `INPUT` and `GET`) and a captured output buffer.
#[derive(Default)]
pub struct VecIo {
    pub input: std::collections::VecDeque<String>,
    pub output: String,
}

impl VecIo {
    pub fn new(lines: impl IntoIterator<Item = &'static str>) -> Self {
        VecIo { input: lines.into_iter().map(String::from).collect(), output: String::new() }
    }
}

impl Io for VecIo {
    fn read_line(&mut self) -> Option<String> {
        self.input.pop_front()
    }

    fn read_byte(&mut self) -> Option<u8> {
        let line = self.input.front_mut()?;
        if line.is_empty() {
            self.input.pop_front();
            Some(b'\n')
        } else {
            Some(line.remove(0) as u8)
        }
    }

    fn write_str(&mut self, s: &str) {
        self.output.push_str(s);
    }

    fn flush(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_io_reads_queued_lines_in_order() {
        let mut io = VecIo::new(["10", "20"]);
        assert_eq!(io.read_line(), Some("10".to_string()));
        assert_eq!(io.read_line(), Some("20".to_string()));
        assert_eq!(io.read_line(), None);
    }

    #[test]
    fn vec_io_captures_output() {
        let mut io = VecIo::default();
        io.write_str("HELLO");
        assert_eq!(io.output, "HELLO");
    }
}
