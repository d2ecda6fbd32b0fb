//! The interpreter's error taxonomy.
//!
//! Microsoft BASIC reports failures as a fixed two-letter short code plus a
//! long message (`?SYNTAX ERROR` vs `?SN ERROR`). `BasicError` carries both
//! so callers can pick whichever rendering the current verbosity wants
//! without re-deriving it from the variant.

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BasicError {
    #[error("NEXT WITHOUT FOR")]
    NextWithoutFor,
    #[error("SYNTAX ERROR")]
    SyntaxError,
    #[error("RETURN WITHOUT GOSUB")]
    ReturnWithoutGosub,
    #[error("OUT OF DATA")]
    OutOfData,
    #[error("ILLEGAL QUANTITY ERROR")]
    IllegalQuantity,
    #[error("OVERFLOW")]
    Overflow,
    #[error("OUT OF MEMORY")]
    OutOfMemory,
    #[error("UNDEFINED STATEMENT ERROR")]
    UndefinedStatement,
    #[error("BAD SUBSCRIPT ERROR")]
    BadSubscript,
    #[error("REDIM'D ARRAY ERROR")]
    Redimensioned,
    #[error("DIVISION BY ZERO")]
    DivisionByZero,
    #[error("ILLEGAL DIRECT ERROR")]
    IllegalDirect,
    #[error("TYPE MISMATCH")]
    TypeMismatch,
    #[error("STRING TOO LONG")]
    StringTooLong,
    #[error("FILE DATA ERROR")]
    FileData,
    #[error("STRING FORMULA TOO COMPLEX")]
    FormulaTooComplex,
    #[error("CAN'T CONTINUE")]
    CantContinue,
    #[error("UNDEFINED FUNCTION")]
    UndefinedFunction,
    #[error("BREAK")]
    Break,
}

impl BasicError {
    /// The fixed two-letter short code from the public error surface.
    pub fn short_code(&self) -> &'static str {
        use BasicError::*;
        match self {
            NextWithoutFor => "NF",
            SyntaxError => "SN",
            ReturnWithoutGosub => "RG",
            OutOfData => "OD",
            IllegalQuantity => "FC",
            Overflow => "OV",
            OutOfMemory => "OM",
            UndefinedStatement => "US",
            BadSubscript => "BS",
            Redimensioned => "DD",
            DivisionByZero => "/0",
            IllegalDirect => "ID",
            TypeMismatch => "TM",
            StringTooLong => "LS",
            FileData => "FD",
            FormulaTooComplex => "ST",
            CantContinue => "CN",
            UndefinedFunction => "UF",
            Break => "BR",
        }
    }

    /// The long-form message printed in verbose mode, e.g. `SYNTAX ERROR`.
    pub fn long_message(&self) -> String {
        self.to_string()
    }

    /// Whether CONT remains legal after this error (only BREAK and STOP,
    /// the latter never reaching here as an error at all).
    pub fn allows_cont(&self) -> bool {
        matches!(self, BasicError::Break)
    }
}

pub type BasicResult<T> = Result<T, BasicError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_codes_match_spec_table() {
        assert_eq!(BasicError::NextWithoutFor.short_code(), "NF");
        assert_eq!(BasicError::SyntaxError.short_code(), "SN");
        assert_eq!(BasicError::DivisionByZero.short_code(), "/0");
        assert_eq!(BasicError::Break.short_code(), "BR");
    }

    #[test]
    fn only_break_allows_cont() {
        assert!(BasicError::Break.allows_cont());
        assert!(!BasicError::SyntaxError.allows_cont());
        assert!(!BasicError::TypeMismatch.allows_cont());
    }
}
