//! Number formatting (`spec.md` §4.5) and the column-tracking terminal
//! writer PRINT drives (`spec.md` §4.6).

use crate::io::Io;

/// Formats a double the way `STR$`/`PRINT` do: a leading sign, `0` for
/// zero, scientific notation outside `[1e-9, 1e10)`, a bare integer when
/// the value is a whole number in range, otherwise up to 9 significant
/// digits with trailing zeros trimmed.
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    let sign = if n < 0.0 { "-" } else { "" };
    let mag = n.abs();
    if mag >= 1e10 || mag < 1e-9 {
        return format!("{}{}", sign, scientific(mag));
    }
    if mag < 1e10 && mag.floor() == mag {
        return format!("{}{}", sign, mag as i64);
    }
    let digits = significant_digits(mag, 9);
    format!("{}{}", sign, digits)
}

/// `STR$` always includes the leading space/sign slot `spec.md` §4.5
/// describes; `PRINT` appends the trailing space itself.
pub fn str_dollar(n: f64) -> String {
    if n < 0.0 {
        format_number(n)
    } else {
        format!(" {}", format_number(n))
    }
}

fn scientific(mag: f64) -> String {
    let exp = mag.log10().floor() as i32;
    let mut mantissa = mag / 10f64.powi(exp);
    // Guard against log10 rounding landing just outside [1, 10).
    let mut exp = exp;
    if mantissa >= 10.0 {
        mantissa /= 10.0;
        exp += 1;
    } else if mantissa < 1.0 {
        mantissa *= 10.0;
        exp -= 1;
    }
    let mantissa_str = trim_trailing(&format!("{:.8}", mantissa));
    format!("{}E{}{}", mantissa_str, if exp >= 0 { "+" } else { "-" }, exp.abs())
}

fn significant_digits(mag: f64, sig: usize) -> String {
    let int_digits = if mag >= 1.0 { mag.log10().floor() as i32 + 1 } else { 0 };
    let decimals = (sig as i32 - int_digits).max(0) as usize;
    trim_trailing(&format!("{:.*}", decimals, mag))
}

fn trim_trailing(s: &str) -> String {
    if !s.contains('.') {
        return s.to_string();
    }
    let trimmed = s.trim_end_matches('0');
    let trimmed = trimmed.trim_end_matches('.');
    trimmed.to_string()
}

/// Tracks the current output column and implements PRINT's layout rules:
/// auto-wrap at `width`, comma separators pad to the next 14-column zone,
/// `TAB(n)` pads (or newlines-then-pads) to column `n`, `SPC(n)` emits `n`
/// spaces, and newlines emit `null_count` NULs for slow terminals.
pub struct Printer {
    pub width: usize,
    pub null_count: u8,
    column: usize,
}

pub const ZONE_WIDTH: usize = 14;

impl Printer {
    pub fn new(width: usize) -> Self {
        Printer { width, null_count: 0, column: 0 }
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn write(&mut self, io: &mut dyn Io, s: &str) {
        for ch in s.chars() {
            if ch == '\n' {
                self.newline(io);
            } else {
                io.write_str(&ch.to_string());
                self.column += 1;
                if self.column >= self.width {
                    self.newline(io);
                }
            }
        }
    }

    pub fn newline(&mut self, io: &mut dyn Io) {
        io.write_str("\n");
        for _ in 0..self.null_count {
            io.write_str("\0");
        }
        self.column = 0;
    }

    /// `,` separator: pad with spaces to the next multiple-of-14 zone.
    pub fn next_zone(&mut self, io: &mut dyn Io) {
        let target = (self.column / ZONE_WIDTH + 1) * ZONE_WIDTH;
        if target >= self.width {
            self.newline(io);
        } else {
            self.pad_to(io, target);
        }
    }

    /// `TAB(n)`: 0-based column target; newline first if already past it.
    pub fn tab(&mut self, io: &mut dyn Io, target: usize) {
        if self.column > target {
            self.newline(io);
        }
        self.pad_to(io, target);
    }

    /// `SPC(n)`: unconditionally emit `n` spaces (may wrap).
    pub fn spaces(&mut self, io: &mut dyn Io, n: usize) {
        for _ in 0..n {
            self.write(io, " ");
        }
    }

    fn pad_to(&mut self, io: &mut dyn Io, target: usize) {
        while self.column < target {
            self.write(io, " ");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::VecIo;

    #[test]
    fn zero_formats_as_bare_zero() {
        assert_eq!(format_number(0.0), "0");
    }

    #[test]
    fn integers_have_no_decimal_point() {
        assert_eq!(format_number(120.0), "120");
        assert_eq!(format_number(-45.0), "-45");
    }

    #[test]
    fn fractional_values_trim_trailing_zeros() {
        assert_eq!(format_number(3.5), "3.5");
        assert_eq!(format_number(0.1), ".1");
    }

    #[test]
    fn large_and_small_magnitudes_use_scientific_notation() {
        assert!(format_number(1e11).contains('E'));
        assert!(format_number(1e-12).contains('E'));
    }

    #[test]
    fn str_dollar_prefixes_a_space_for_nonnegative() {
        assert_eq!(str_dollar(5.0), " 5");
        assert_eq!(str_dollar(-5.0), "-5");
    }

    #[test]
    fn precedence_example_from_spec() {
        // PRINT 2+3*4^2-10/2 => 45 (caller adds the surrounding spaces).
        assert_eq!(format_number(45.0), "45");
    }

    #[test]
    fn comma_separator_pads_to_next_zone() {
        let mut printer = Printer::new(80);
        let mut io = VecIo::default();
        printer.write(&mut io, "AB");
        printer.next_zone(&mut io);
        assert_eq!(printer.column(), ZONE_WIDTH);
        assert_eq!(io.output, "AB            ");
    }

    #[test]
    fn tab_wraps_when_past_target() {
        let mut printer = Printer::new(80);
        let mut io = VecIo::default();
        printer.write(&mut io, "0123456789");
        printer.tab(&mut io, 5);
        assert_eq!(printer.column(), 5);
        assert!(io.output.ends_with('\n') == false);
        assert!(io.output.contains('\n'));
    }

    #[test]
    fn auto_wrap_at_width() {
        let mut printer = Printer::new(5);
        let mut io = VecIo::default();
        printer.write(&mut io, "ABCDE");
        assert_eq!(printer.column(), 0);
        assert_eq!(io.output, "ABCDE\n");
    }
}
