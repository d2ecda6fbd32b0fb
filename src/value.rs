//! Runtime values and variable-name normalisation.
//!
//! Mirrors the teacher's `fields.rs`: rather than scatter magic numbers and
//! raw tuples through the evaluator and executor, the handful of "rich"
//! types variables and values are built from live here, and the messier
//! parsing code that constructs them lives in `tokenizer.rs`/`eval.rs`.

use crate::strings::StringRef;
use std::fmt;

/// A two-character-normalised variable name plus its type flags.
///
/// Equality and hashing cover the whole tuple: `A`, `A%`, and `A$` are three
/// distinct variables, but only the first two significant letters of the
/// name matter (`SCORE` and `SCOREBOARD` collide).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarName {
    chars: [u8; 2],
    pub kind: VarKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarKind {
    Numeric,
    Integer,
    String,
}

impl VarName {
    /// Normalises an identifier: uppercases it, keeps the first two
    /// significant (letter/digit) characters, pads a one-character name
    /// with a space, and reads off the `$`/`%` suffix if present.
    pub fn normalize(ident: &str, is_string: bool, is_integer: bool) -> Self {
        let mut upper: Vec<u8> = ident.bytes().map(|b| b.to_ascii_uppercase()).collect();
        upper.truncate(2);
        let mut chars = [b' '; 2];
        for (i, &b) in upper.iter().enumerate() {
            chars[i] = b;
        }
        let kind = if is_string {
            VarKind::String
        } else if is_integer {
            VarKind::Integer
        } else {
            VarKind::Numeric
        };
        VarName { chars, kind }
    }

    pub fn is_string(&self) -> bool {
        self.kind == VarKind::String
    }
}

impl fmt::Display for VarName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = std::str::from_utf8(&self.chars).unwrap_or("??").trim_end();
        let suffix = match self.kind {
            VarKind::String => "$",
            VarKind::Integer => "%",
            VarKind::Numeric => "",
        };
        write!(f, "{}{}", s, suffix)
    }
}

/// A tagged runtime value: a double, or a string descriptor.
///
/// `spec.md` §3 notes the 32-bit integer subtype is only a hint for
/// `%`-suffixed variables; it is stored as a double in practice, so there is
/// no separate `Integer` variant here — `VarKind::Integer` on the name is
/// enough to remember the subtype for formatting/overflow checks.
#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    Str(StringRef),
}

impl Value {
    pub fn default_for(kind: VarKind) -> Self {
        match kind {
            VarKind::String => Value::Str(StringRef::empty()),
            VarKind::Numeric | VarKind::Integer => Value::Number(0.0),
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::Str(_))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Str(_) => None,
        }
    }
}

/// MS truth: false = 0.0, true = -1.0.
pub fn ms_bool(cond: bool) -> Value {
    Value::Number(if cond { -1.0 } else { 0.0 })
}

/// Truncates a double to the 32-bit signed integer MS BASIC uses for the
/// bitwise logical operators (`AND`/`OR`/`NOT`).
pub fn truncate_i32(n: f64) -> i32 {
    n as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_char_normalization_collides_past_second_letter() {
        let a = VarName::normalize("SCORE", false, false);
        let b = VarName::normalize("SCOREBOARD", false, false);
        assert_eq!(a, b);
    }

    #[test]
    fn suffix_distinguishes_otherwise_equal_names() {
        let plain = VarName::normalize("A", false, false);
        let string = VarName::normalize("A", true, false);
        let integer = VarName::normalize("A", false, true);
        assert_ne!(plain, string);
        assert_ne!(plain, integer);
        assert_ne!(string, integer);
    }

    #[test]
    fn single_char_name_is_space_padded() {
        let a = VarName::normalize("A", false, false);
        assert_eq!(a.to_string(), "A");
    }
}
