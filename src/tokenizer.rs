//! Line crunching and listing (`spec.md` §4.1).
//!
//! Grounded on the teacher's `instructions.rs` opcode table: a fixed list of
//! (mnemonic, encoding) pairs consulted by both the assembler-ish matcher
//! and the disassembler. Here the "mnemonics" are BASIC reserved words and
//! the "encoding" is a single byte in 0x80..0xFF.

/// One reserved word and the single byte it crunches to. `spec.md` §6 lists
/// the exhaustive table; order here fixes their token byte assignment.
const KEYWORDS: &[&str] = &[
    // Statements
    "END", "FOR", "NEXT", "DATA", "INPUT", "DIM", "READ", "LET", "GOTO", "RUN",
    "IF", "RESTORE", "GOSUB", "RETURN", "REM", "STOP", "ON", "NULL", "WAIT",
    "LOAD", "SAVE", "VERIFY", "DEF", "POKE", "PRINT", "CONT", "LIST", "CLEAR",
    "GET", "NEW",
    // Auxiliary
    "TAB(", "TO", "FN", "SPC(", "THEN", "NOT", "STEP",
    // Operators
    "AND", "OR",
    // Functions
    "SGN", "INT", "ABS", "USR", "FRE", "POS", "SQR", "RND", "LOG", "EXP",
    "COS", "SIN", "TAN", "ATN", "PEEK", "LEN", "STR$", "VAL", "ASC", "CHR$",
    "LEFT$", "RIGHT$", "MID$",
];

pub const TOKEN_REM: u8 = token_for("REM");
pub const TOKEN_DATA: u8 = token_for("DATA");
pub const TOKEN_FN: u8 = token_for("FN");
pub const TOKEN_IF: u8 = token_for("IF");
pub const TOKEN_THEN: u8 = token_for("THEN");
pub const TOKEN_GOTO: u8 = token_for("GOTO");
pub const TOKEN_ELSE_NONE: u8 = 0; // BASIC 1.1 has no ELSE; kept absent deliberately.

const fn token_for(word: &str) -> u8 {
    let bytes = word.as_bytes();
    let mut i = 0;
    let mut found = 0u8;
    while i < KEYWORDS.len() {
        let k = KEYWORDS[i].as_bytes();
        if k.len() == bytes.len() {
            let mut j = 0;
            let mut eq = true;
            while j < k.len() {
                if k[j] != bytes[j] {
                    eq = false;
                    break;
                }
                j += 1;
            }
            if eq {
                found = 0x80 + i as u8;
            }
        }
        i += 1;
    }
    found
}

pub fn token_byte(word: &str) -> Option<u8> {
    KEYWORDS.iter().position(|k| *k == word).map(|i| 0x80 + i as u8)
}

pub fn keyword_for_token(tok: u8) -> Option<&'static str> {
    if tok < 0x80 {
        return None;
    }
    KEYWORDS.get((tok - 0x80) as usize).copied()
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric()
}

/// Crunches one source line (no trailing newline) into its tokenised body.
pub fn tokenize(line: &str) -> Vec<u8> {
    let src = line.as_bytes();
    let mut out = Vec::with_capacity(src.len());
    let mut i = 0;
    let mut in_string = false;
    let mut in_rem = false;
    let mut in_data = false;

    while i < src.len() {
        let b = src[i];

        if b == b'"' {
            in_string = !in_string;
            out.push(b);
            i += 1;
            continue;
        }
        if in_string || in_rem {
            out.push(b);
            i += 1;
            continue;
        }
        if in_data {
            if b == b':' {
                in_data = false;
            }
            out.push(b);
            i += 1;
            continue;
        }

        if let Some((word, tok)) = match_keyword(&src[i..]) {
            out.push(tok);
            i += word.len();
            if tok == TOKEN_REM {
                in_rem = true;
            } else if tok == TOKEN_DATA {
                in_data = true;
            }
            continue;
        }

        out.push(b.to_ascii_uppercase());
        i += 1;
    }
    out
}

/// Longest case-insensitive reserved-word match at the start of `rest`,
/// subject to the boundary rule in `spec.md` §4.1 step 4.
fn match_keyword(rest: &[u8]) -> Option<(&'static str, u8)> {
    let mut best: Option<(&'static str, u8)> = None;
    for (idx, &kw) in KEYWORDS.iter().enumerate() {
        let kb = kw.as_bytes();
        if rest.len() < kb.len() {
            continue;
        }
        if !rest[..kb.len()].eq_ignore_ascii_case(kb) {
            continue;
        }
        let boundary_exempt = kw.ends_with('(') || kw == "FN";
        if !boundary_exempt {
            if let Some(&next) = rest.get(kb.len()) {
                if is_ident_byte(next) {
                    continue;
                }
            }
        }
        if best.map(|(w, _)| kb.len() > w.len()).unwrap_or(true) {
            best = Some((kw, 0x80 + idx as u8));
        }
    }
    best
}

/// Renders a tokenised body back into source text.
pub fn detokenize(body: &[u8]) -> String {
    let mut out = String::with_capacity(body.len() * 2);
    let mut quoted = false;
    for &b in body {
        if b == b'"' {
            quoted = !quoted;
            out.push('"');
            continue;
        }
        if !quoted && b >= 0x80 {
            if let Some(word) = keyword_for_token(b) {
                out.push_str(word);
                continue;
            }
        }
        out.push(b as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crunches_statement_keywords_to_single_bytes() {
        let body = tokenize("10 PRINT X");
        // "10 " stays literal; PRINT -> one token byte; " X" stays literal.
        assert!(body.iter().any(|&b| b == token_byte("PRINT").unwrap()));
    }

    #[test]
    fn string_literal_contents_are_untouched() {
        let body = tokenize(r#"PRINT "FOR NEXT""#);
        let text = String::from_utf8(body.clone()).unwrap_or_default();
        // Inside quotes FOR/NEXT must not have crunched (no non-ASCII bytes
        // appear while inside the quoted region).
        assert!(body.iter().all(|&b| b < 0x80 || b == token_byte("PRINT").unwrap()));
        let _ = text;
    }

    #[test]
    fn rem_tail_is_left_uncrunched_and_uppercased_verbatim() {
        let body = tokenize("REM for next");
        assert_eq!(body[0], token_byte("REM").unwrap());
        // REM tail is copied byte for byte, not uppercased.
        assert_eq!(&body[1..], b" for next");
    }

    #[test]
    fn data_tail_stops_crunching_until_colon() {
        let body = tokenize("DATA FOR, NEXT: PRINT X");
        let colon_pos = body.iter().position(|&b| b == b':').unwrap();
        assert!(body[..colon_pos].iter().all(|&b| b < 0x80 || b == token_byte("DATA").unwrap()));
        assert!(body[colon_pos + 1..].contains(&token_byte("PRINT").unwrap()));
    }

    #[test]
    fn fn_is_accepted_without_a_boundary_check() {
        let body = tokenize("FNA(X)");
        assert_eq!(body[0], token_byte("FN").unwrap());
        assert_eq!(body[1], b'A');
    }

    #[test]
    fn boundary_check_rejects_prefix_match_inside_longer_identifier() {
        let body = tokenize("TONE=1");
        // TO is a keyword but TONE is one identifier; TO must not crunch.
        assert!(!body.contains(&token_byte("TO").unwrap()));
    }

    #[test]
    fn tab_paren_is_accepted_without_boundary_check() {
        let body = tokenize("PRINT TAB(5)");
        assert!(body.contains(&token_byte("TAB(").unwrap()));
    }

    #[test]
    fn detokenize_inverts_tokenize_modulo_case() {
        let body = tokenize("10 for i=1 to 10: print i: next i");
        let listed = detokenize(&body);
        assert_eq!(listed, "10 FOR I=1 TO 10: PRINT I: NEXT I");
    }

    #[test]
    fn operator_characters_pass_through_as_ascii() {
        let body = tokenize("X=1+2*3");
        for &b in b"=+*" {
            assert!(body.contains(&b));
        }
    }
}
