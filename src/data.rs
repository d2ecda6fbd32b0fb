//! The DATA reader: scans forward through program lines for DATA tokens
//! and parses comma-separated literals from them (`spec.md` §4.3 READ).
//!
//! Grounded on the teacher's `parser.rs` line-scanning helpers: a cursor
//! walked forward over a byte buffer with small lookahead, reused here to
//! hunt for the next unconsumed DATA item across line boundaries.

use crate::eval::EvalContext;
use crate::error::{BasicError, BasicResult};
use crate::program::{DataCursor, Program};
use crate::tokenizer::TOKEN_DATA;
use crate::value::Value;

/// Reads the next DATA value, advancing `cursor` past it. Scans forward
/// through program lines (skipping string literals so a quoted `DATA`
/// token inside a string can't false-trigger) when the current position
/// runs out of values.
pub fn read_one(ctx: &mut EvalContext, cursor: &mut DataCursor, program: &Program) -> BasicResult<Value> {
    loop {
        if let Some((line, offset)) = cursor.position {
            let body = program.get(line).ok_or(BasicError::OutOfData)?;
            if let Some((value, next_offset)) = try_parse_value(ctx, body, offset)? {
                cursor.position = Some((line, next_offset));
                return Ok(value);
            }
            // Exhausted this line's DATA tail; look for the next DATA token
            // strictly after it.
            cursor.position = None;
            cursor.scan_from = program.next_line_after(line);
            if cursor.scan_from.is_none() {
                return Err(BasicError::OutOfData);
            }
        }
        advance_to_next_data_statement(cursor, program)?;
    }
}

/// Positions `cursor` at the byte just after the next DATA token found at
/// or after the line recorded in `scan_from` (or the start of the program
/// if none). `scan_from` is an inclusive bound, so `RESTORE <line>` finds a
/// DATA statement that starts on `line` itself.
fn advance_to_next_data_statement(cursor: &mut DataCursor, program: &Program) -> BasicResult<()> {
    let start_from = cursor.scan_from;
    for (line_number, body) in program.iter() {
        if let Some(from) = start_from {
            if line_number < from {
                continue;
            }
        }
        if let Some(offset) = find_data_token(body) {
            cursor.position = Some((line_number, offset));
            cursor.scan_from = program.next_line_after(line_number);
            return Ok(());
        }
    }
    Err(BasicError::OutOfData)
}

fn find_data_token(body: &[u8]) -> Option<usize> {
    let mut in_string = false;
    let mut i = 0;
    while i < body.len() {
        let b = body[i];
        if b == b'"' {
            in_string = !in_string;
        } else if !in_string && b == TOKEN_DATA {
            return Some(i + 1);
        }
        i += 1;
    }
    None
}

/// Parses one comma-separated DATA item starting at `offset` in `body`.
/// Returns `None` (rather than erroring) when `offset` is already at the
/// end of the DATA tail (a trailing `:` or end of line), signalling the
/// caller to advance to the next DATA statement.
fn try_parse_value(ctx: &mut EvalContext, body: &[u8], offset: usize) -> BasicResult<Option<(Value, usize)>> {
    let mut i = offset;
    while body.get(i) == Some(&b' ') {
        i += 1;
    }
    match body.get(i) {
        None | Some(b':') => Ok(None),
        Some(b'"') => {
            let start = i + 1;
            let mut end = start;
            while body.get(end).is_some() && body[end] != b'"' {
                end += 1;
            }
            let bytes = body[start..end].to_vec();
            let mut next = if body.get(end) == Some(&b'"') { end + 1 } else { end };
            next = skip_item_separator(body, next);
            Ok(Some((Value::Str(ctx.heap.alloc(&bytes)?), next)))
        }
        Some(_) => {
            let start = i;
            let mut end = start;
            while body.get(end).is_some() && body[end] != b',' && body[end] != b':' {
                end += 1;
            }
            let raw = &body[start..end];
            let trimmed_end = raw.iter().rposition(|&b| b != b' ').map(|p| p + 1).unwrap_or(0);
            let text = String::from_utf8_lossy(&raw[..trimmed_end]);
            let next = skip_item_separator(body, end);
            if let Ok(n) = text.trim().parse::<f64>() {
                Ok(Some((Value::Number(n), next)))
            } else {
                Ok(Some((Value::Str(ctx.heap.alloc(text.as_bytes())?), next)))
            }
        }
    }
}

fn skip_item_separator(body: &[u8], mut i: usize) -> usize {
    while body.get(i) == Some(&b' ') {
        i += 1;
    }
    if body.get(i) == Some(&b',') {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::VecIo;
    use crate::numeric::RndState;
    use crate::strings::StringHeap;
    use crate::tokenizer::tokenize;
    use crate::variables::VariableTable;

    fn ctx_with<'a>(
        vars: &'a mut VariableTable,
        heap: &'a mut StringHeap,
        rnd: &'a mut RndState,
        memory: &'a mut [u8],
        io: &'a mut VecIo,
    ) -> EvalContext<'a> {
        EvalContext { vars, heap, rnd, memory, io, column: 0 }
    }

    #[test]
    fn read_scans_forward_across_lines_and_restore_rewinds() {
        let mut program = Program::new();
        program.store(10, tokenize("READ A,B,C"));
        program.store(60, tokenize("DATA 10,20,30"));

        let mut vars = VariableTable::new();
        let mut heap = StringHeap::new(4096);
        let mut rnd = RndState::new();
        let mut memory = vec![0u8; 64];
        let mut io = VecIo::default();
        let mut ctx = ctx_with(&mut vars, &mut heap, &mut rnd, &mut memory, &mut io);

        let mut cursor = DataCursor::default();
        let a = read_one(&mut ctx, &mut cursor, &program).unwrap();
        let b = read_one(&mut ctx, &mut cursor, &program).unwrap();
        let c = read_one(&mut ctx, &mut cursor, &program).unwrap();
        assert_eq!(a.as_number(), Some(10.0));
        assert_eq!(b.as_number(), Some(20.0));
        assert_eq!(c.as_number(), Some(30.0));
        assert_eq!(read_one(&mut ctx, &mut cursor, &program).unwrap_err(), BasicError::OutOfData);

        cursor.restore(None);
        let again = read_one(&mut ctx, &mut cursor, &program).unwrap();
        assert_eq!(again.as_number(), Some(10.0));
    }

    #[test]
    fn restore_to_a_line_is_inclusive_of_that_lines_own_data() {
        let mut program = Program::new();
        program.store(10, tokenize("DATA 1,2"));
        program.store(60, tokenize("DATA 10,20,30"));

        let mut vars = VariableTable::new();
        let mut heap = StringHeap::new(4096);
        let mut rnd = RndState::new();
        let mut memory = vec![0u8; 64];
        let mut io = VecIo::default();
        let mut ctx = ctx_with(&mut vars, &mut heap, &mut rnd, &mut memory, &mut io);

        let mut cursor = DataCursor::default();
        cursor.restore(Some(60));
        let first = read_one(&mut ctx, &mut cursor, &program).unwrap();
        assert_eq!(first.as_number(), Some(10.0));
    }

    #[test]
    fn quoted_data_keyword_inside_a_string_does_not_false_trigger() {
        let mut program = Program::new();
        program.store(10, tokenize(r#"DATA "contains DATA word", 5"#));
        let mut vars = VariableTable::new();
        let mut heap = StringHeap::new(4096);
        let mut rnd = RndState::new();
        let mut memory = vec![0u8; 64];
        let mut io = VecIo::default();
        let mut ctx = ctx_with(&mut vars, &mut heap, &mut rnd, &mut memory, &mut io);
        let mut cursor = DataCursor::default();
        let first = read_one(&mut ctx, &mut cursor, &program).unwrap();
        match first {
            Value::Str(s) => assert_eq!(s.to_string_lossy(ctx.heap), "contains DATA word"),
            Value::Number(_) => panic!("expected string"),
        }
        let second = read_one(&mut ctx, &mut cursor, &program).unwrap();
        assert_eq!(second.as_number(), Some(5.0));
    }
}
