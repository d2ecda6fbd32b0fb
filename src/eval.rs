//! The expression evaluator (`spec.md` §4.2): a recursive-descent,
//! precedence-climbing parser that reads straight out of the current
//! statement's tokenised body and returns a `Value`.
//!
//! Grounded on the teacher's `processor.rs` instruction decode/execute
//! split: a small set of mutually recursive parse functions, one per
//! precedence level, mirroring the opcode-group dispatch there. The
//! scratch state an evaluation touches (variables, string heap, RND,
//! memory, I/O) is bundled in `EvalContext` the way the teacher threads a
//! single `&mut CPU` through its decode functions.

use crate::error::{BasicError, BasicResult};
use crate::io::Io;
use crate::numeric;
use crate::strings::StringHeap;
use crate::tokenizer::{self, keyword_for_token};
use crate::value::{ms_bool, truncate_i32, Value, VarName};
use crate::variables::VariableTable;

fn tok(word: &str) -> u8 {
    tokenizer::token_byte(word).unwrap_or_else(|| panic!("unknown keyword {word}"))
}

/// The mutable state an expression may touch, bundled so `eval_expr` and
/// its callers don't have to thread five separate `&mut` parameters.
pub struct EvalContext<'a> {
    pub vars: &'a mut VariableTable,
    pub heap: &'a mut StringHeap,
    pub rnd: &'a mut numeric::RndState,
    pub memory: &'a mut [u8],
    pub io: &'a mut dyn Io,
    pub column: usize,
}

/// A parse cursor over one statement's tokenised body.
pub struct Parser<'b> {
    pub body: &'b [u8],
    pub pos: usize,
}

impl<'b> Parser<'b> {
    pub fn new(body: &'b [u8], pos: usize) -> Self {
        Parser { body, pos }
    }

    fn peek(&self) -> Option<u8> {
        self.body.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek();
        if b.is_some() {
            self.pos += 1;
        }
        b
    }

    pub fn skip_spaces(&mut self) {
        while self.peek() == Some(b' ') {
            self.pos += 1;
        }
    }

    pub fn at_end_of_statement(&self) -> bool {
        matches!(self.peek(), None | Some(b':'))
    }

    fn eat_byte(&mut self, b: u8) -> bool {
        self.skip_spaces();
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_token(&mut self, word: &str) -> bool {
        self.skip_spaces();
        self.eat_byte(tok(word))
    }

    fn is_ident_start(b: u8) -> bool {
        b.is_ascii_alphabetic()
    }

    fn is_ident_cont(b: u8) -> bool {
        b.is_ascii_alphanumeric()
    }

    /// Reads an identifier (letters then letters/digits) plus an optional
    /// `$`/`%` suffix, normalising per `spec.md` §3. Returns `None` if the
    /// current byte doesn't start an identifier.
    pub(crate) fn read_var_name(&mut self) -> Option<VarName> {
        self.skip_spaces();
        let start = self.pos;
        if !self.peek().map(Self::is_ident_start).unwrap_or(false) {
            return None;
        }
        let mut end = start + 1;
        while self.body.get(end).copied().map(Self::is_ident_cont).unwrap_or(false) {
            end += 1;
        }
        let ident = String::from_utf8_lossy(&self.body[start..end]).into_owned();
        self.pos = end;
        let is_string = self.peek() == Some(b'$');
        let is_integer = !is_string && self.peek() == Some(b'%');
        if is_string || is_integer {
            self.pos += 1;
        }
        Some(VarName::normalize(&ident, is_string, is_integer))
    }

    pub(crate) fn read_number_literal(&mut self) -> Option<f64> {
        self.skip_spaces();
        let start = self.pos;
        let mut end = start;
        while self.body.get(end).map(|b| b.is_ascii_digit()).unwrap_or(false) {
            end += 1;
        }
        if self.body.get(end) == Some(&b'.') {
            end += 1;
            while self.body.get(end).map(|b| b.is_ascii_digit()).unwrap_or(false) {
                end += 1;
            }
        }
        if end == start {
            return None;
        }
        if matches!(self.body.get(end), Some(b'E') | Some(b'e')) {
            let mut exp_end = end + 1;
            if matches!(self.body.get(exp_end), Some(b'+') | Some(b'-')) {
                exp_end += 1;
            }
            let digits_start = exp_end;
            while self.body.get(exp_end).map(|b| b.is_ascii_digit()).unwrap_or(false) {
                exp_end += 1;
            }
            if exp_end > digits_start {
                end = exp_end;
            }
        }
        let text = String::from_utf8_lossy(&self.body[start..end]);
        let value: f64 = text.parse().ok()?;
        self.pos = end;
        Some(value)
    }

    pub(crate) fn read_string_literal(&mut self) -> BasicResult<Vec<u8>> {
        if !self.eat_byte(b'"') {
            return Err(BasicError::SyntaxError);
        }
        let start = self.pos;
        while self.peek().is_some() && self.peek() != Some(b'"') {
            self.pos += 1;
        }
        let bytes = self.body[start..self.pos].to_vec();
        self.advance(); // closing quote, if present
        Ok(bytes)
    }
}

/// Parses and evaluates a full expression starting at `p.pos`.
pub fn eval_expr(p: &mut Parser, ctx: &mut EvalContext) -> BasicResult<Value> {
    eval_or(p, ctx)
}

fn eval_or(p: &mut Parser, ctx: &mut EvalContext) -> BasicResult<Value> {
    let mut lhs = eval_and(p, ctx)?;
    loop {
        p.skip_spaces();
        if p.peek() == Some(tok("OR")) {
            p.pos += 1;
            let rhs = eval_and(p, ctx)?;
            lhs = bitwise(lhs, rhs, |a, b| a | b)?;
        } else {
            return Ok(lhs);
        }
    }
}

fn eval_and(p: &mut Parser, ctx: &mut EvalContext) -> BasicResult<Value> {
    let mut lhs = eval_not(p, ctx)?;
    loop {
        p.skip_spaces();
        if p.peek() == Some(tok("AND")) {
            p.pos += 1;
            let rhs = eval_not(p, ctx)?;
            lhs = bitwise(lhs, rhs, |a, b| a & b)?;
        } else {
            return Ok(lhs);
        }
    }
}

fn eval_not(p: &mut Parser, ctx: &mut EvalContext) -> BasicResult<Value> {
    p.skip_spaces();
    if p.peek() == Some(tok("NOT")) {
        p.pos += 1;
        let v = eval_not(p, ctx)?;
        let n = numeric_operand(&v)?;
        Ok(Value::Number(!truncate_i32(n) as f64))
    } else {
        eval_comparison(p, ctx)
    }
}

fn bitwise(lhs: Value, rhs: Value, f: impl Fn(i32, i32) -> i32) -> BasicResult<Value> {
    let a = truncate_i32(numeric_operand(&lhs)?);
    let b = truncate_i32(numeric_operand(&rhs)?);
    Ok(Value::Number(f(a, b) as f64))
}

fn numeric_operand(v: &Value) -> BasicResult<f64> {
    v.as_number().ok_or(BasicError::TypeMismatch)
}

#[derive(PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

fn match_comparison_op(p: &mut Parser) -> Option<CmpOp> {
    p.skip_spaces();
    match p.peek() {
        Some(b'=') => {
            p.pos += 1;
            p.skip_spaces();
            if p.peek() == Some(b'<') {
                p.pos += 1;
                Some(CmpOp::Le)
            } else if p.peek() == Some(b'>') {
                p.pos += 1;
                Some(CmpOp::Ge)
            } else {
                Some(CmpOp::Eq)
            }
        }
        Some(b'<') => {
            p.pos += 1;
            match p.peek() {
                Some(b'>') => {
                    p.pos += 1;
                    Some(CmpOp::Ne)
                }
                Some(b'=') => {
                    p.pos += 1;
                    Some(CmpOp::Le)
                }
                _ => Some(CmpOp::Lt),
            }
        }
        Some(b'>') => {
            p.pos += 1;
            match p.peek() {
                Some(b'<') => {
                    p.pos += 1;
                    Some(CmpOp::Ne)
                }
                Some(b'=') => {
                    p.pos += 1;
                    Some(CmpOp::Ge)
                }
                _ => Some(CmpOp::Gt),
            }
        }
        _ => None,
    }
}

fn eval_comparison(p: &mut Parser, ctx: &mut EvalContext) -> BasicResult<Value> {
    let lhs = eval_additive(p, ctx)?;
    let Some(op) = match_comparison_op(p) else { return Ok(lhs) };
    let rhs = eval_additive(p, ctx)?;
    let cond = match (&lhs, &rhs) {
        (Value::Number(a), Value::Number(b)) => match op {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            CmpOp::Lt => a < b,
            CmpOp::Gt => a > b,
            CmpOp::Le => a <= b,
            CmpOp::Ge => a >= b,
        },
        (Value::Str(a), Value::Str(b)) => {
            let ab = a.bytes(ctx.heap);
            let bb = b.bytes(ctx.heap);
            match op {
                CmpOp::Eq => ab == bb,
                CmpOp::Ne => ab != bb,
                CmpOp::Lt => ab < bb,
                CmpOp::Gt => ab > bb,
                CmpOp::Le => ab <= bb,
                CmpOp::Ge => ab >= bb,
            }
        }
        _ => return Err(BasicError::TypeMismatch),
    };
    Ok(ms_bool(cond))
}

fn eval_additive(p: &mut Parser, ctx: &mut EvalContext) -> BasicResult<Value> {
    let mut lhs = eval_multiplicative(p, ctx)?;
    loop {
        p.skip_spaces();
        match p.peek() {
            Some(b'+') => {
                p.pos += 1;
                let rhs = eval_multiplicative(p, ctx)?;
                lhs = add(lhs, rhs, ctx)?;
            }
            Some(b'-') => {
                p.pos += 1;
                let rhs = eval_multiplicative(p, ctx)?;
                let a = numeric_operand(&lhs)?;
                let b = numeric_operand(&rhs)?;
                lhs = Value::Number(numeric::check_finite(a - b)?);
            }
            _ => return Ok(lhs),
        }
    }
}

fn add(lhs: Value, rhs: Value, ctx: &mut EvalContext) -> BasicResult<Value> {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(numeric::check_finite(a + b)?)),
        (Value::Str(a), Value::Str(b)) => {
            let mut bytes = a.bytes(ctx.heap).to_vec();
            bytes.extend_from_slice(b.bytes(ctx.heap));
            Ok(Value::Str(ctx.heap.alloc(&bytes)?))
        }
        _ => Err(BasicError::TypeMismatch),
    }
}

fn eval_multiplicative(p: &mut Parser, ctx: &mut EvalContext) -> BasicResult<Value> {
    let mut lhs = eval_unary(p, ctx)?;
    loop {
        p.skip_spaces();
        match p.peek() {
            Some(b'*') => {
                p.pos += 1;
                let rhs = eval_unary(p, ctx)?;
                let a = numeric_operand(&lhs)?;
                let b = numeric_operand(&rhs)?;
                lhs = Value::Number(numeric::check_finite(a * b)?);
            }
            Some(b'/') => {
                p.pos += 1;
                let rhs = eval_unary(p, ctx)?;
                let a = numeric_operand(&lhs)?;
                let b = numeric_operand(&rhs)?;
                if b == 0.0 {
                    return Err(BasicError::DivisionByZero);
                }
                lhs = Value::Number(numeric::check_finite(a / b)?);
            }
            _ => return Ok(lhs),
        }
    }
}

/// Unary `-`/`+` bind looser than `^`, so `-2^2` parses as `-(2^2)`: a
/// leading sign wraps a full (possibly `^`-chained) power expression rather
/// than just the next primary.
fn eval_unary(p: &mut Parser, ctx: &mut EvalContext) -> BasicResult<Value> {
    p.skip_spaces();
    match p.peek() {
        Some(b'-') => {
            p.pos += 1;
            let v = eval_unary(p, ctx)?;
            Ok(Value::Number(-numeric_operand(&v)?))
        }
        Some(b'+') => {
            p.pos += 1;
            eval_unary(p, ctx)
        }
        _ => eval_power(p, ctx),
    }
}

fn eval_power(p: &mut Parser, ctx: &mut EvalContext) -> BasicResult<Value> {
    let base = eval_primary(p, ctx)?;
    p.skip_spaces();
    if p.peek() == Some(b'^') {
        p.pos += 1;
        let exponent = eval_unary(p, ctx)?; // right-associative, and lets a signed exponent through
        let b = numeric_operand(&base)?;
        let e = numeric_operand(&exponent)?;
        Ok(Value::Number(numeric::power(b, e)?))
    } else {
        Ok(base)
    }
}

fn eval_primary(p: &mut Parser, ctx: &mut EvalContext) -> BasicResult<Value> {
    p.skip_spaces();
    match p.peek() {
        Some(b'(') => {
            p.pos += 1;
            let v = eval_expr(p, ctx)?;
            if !p.eat_byte(b')') {
                return Err(BasicError::SyntaxError);
            }
            Ok(v)
        }
        Some(b'"') => {
            let bytes = p.read_string_literal()?;
            Ok(Value::Str(ctx.heap.alloc(&bytes)?))
        }
        Some(b) if b.is_ascii_digit() || b == b'.' => {
            let n = p.read_number_literal().ok_or(BasicError::SyntaxError)?;
            Ok(Value::Number(n))
        }
        Some(b) if b == tok("FN") => {
            p.pos += 1;
            eval_fn_call(p, ctx)
        }
        Some(b) if b >= 0x80 => eval_function_call(p, ctx, b),
        Some(b) if b.is_ascii_alphabetic() => eval_variable_ref(p, ctx),
        _ => Err(BasicError::SyntaxError),
    }
}

fn eval_variable_ref(p: &mut Parser, ctx: &mut EvalContext) -> BasicResult<Value> {
    let name = p.read_var_name().ok_or(BasicError::SyntaxError)?;
    p.skip_spaces();
    if p.peek() == Some(b'(') {
        p.pos += 1;
        let subs = parse_subscripts(p, ctx)?;
        if !p.eat_byte(b')') {
            return Err(BasicError::SyntaxError);
        }
        ctx.vars.array_get(name, &subs)
    } else {
        Ok(ctx.vars.get_simple(name))
    }
}

fn parse_subscripts(p: &mut Parser, ctx: &mut EvalContext) -> BasicResult<Vec<usize>> {
    let mut subs = Vec::new();
    loop {
        let v = eval_expr(p, ctx)?;
        let n = numeric_operand(&v)?;
        if n < 0.0 || n > crate::variables::MAX_SUBSCRIPT as f64 {
            return Err(BasicError::BadSubscript);
        }
        subs.push(n as usize);
        p.skip_spaces();
        if p.peek() == Some(b',') {
            p.pos += 1;
            continue;
        }
        break;
    }
    Ok(subs)
}

fn eval_fn_call(p: &mut Parser, ctx: &mut EvalContext) -> BasicResult<Value> {
    p.skip_spaces();
    let name = p.advance().ok_or(BasicError::SyntaxError)?.to_ascii_uppercase();
    if !p.eat_byte(b'(') {
        return Err(BasicError::SyntaxError);
    }
    let arg = eval_expr(p, ctx)?;
    if !p.eat_byte(b')') {
        return Err(BasicError::SyntaxError);
    }
    let func = ctx.vars.function(name).ok_or(BasicError::UndefinedFunction)?;
    let param_name = VarName::normalize(&(func.param as char).to_string(), false, false);
    let body = func.body.clone();
    let saved = ctx.vars.get_simple(param_name);
    ctx.vars.set_simple(param_name, arg);
    let mut inner = Parser::new(&body, 0);
    let result = eval_expr(&mut inner, ctx);
    ctx.vars.set_simple(param_name, saved);
    result
}

fn eval_function_call(p: &mut Parser, ctx: &mut EvalContext, tok_byte: u8) -> BasicResult<Value> {
    let name = keyword_for_token(tok_byte).ok_or(BasicError::SyntaxError)?;
    p.pos += 1;

    if name == "RND" {
        p.skip_spaces();
        let arg = if p.peek() == Some(b'(') {
            p.pos += 1;
            let v = eval_expr(p, ctx)?;
            if !p.eat_byte(b')') {
                return Err(BasicError::SyntaxError);
            }
            numeric_operand(&v)?
        } else {
            1.0
        };
        return Ok(Value::Number(ctx.rnd.rnd(arg)));
    }

    if !p.eat_byte(b'(') {
        return Err(BasicError::SyntaxError);
    }
    let result = match name {
        "SGN" => Value::Number(numeric::sgn(one_number(p, ctx)?)),
        "INT" => Value::Number(numeric::int(one_number(p, ctx)?)),
        "ABS" => Value::Number(numeric::abs(one_number(p, ctx)?)),
        "SQR" => Value::Number(numeric::sqr(one_number(p, ctx)?)?),
        "LOG" => Value::Number(numeric::log(one_number(p, ctx)?)?),
        "EXP" => Value::Number(numeric::exp(one_number(p, ctx)?)?),
        "SIN" => Value::Number(numeric::sin(one_number(p, ctx)?)?),
        "COS" => Value::Number(numeric::cos(one_number(p, ctx)?)?),
        "TAN" => Value::Number(numeric::tan(one_number(p, ctx)?)?),
        "ATN" => Value::Number(numeric::atn(one_number(p, ctx)?)?),
        "USR" => Value::Number(one_number(p, ctx)?),
        "FRE" => {
            let _ = one_number(p, ctx)?;
            Value::Number(ctx.heap.free_bytes() as f64)
        }
        "POS" => {
            let _ = one_number(p, ctx)?;
            Value::Number(ctx.column as f64)
        }
        "PEEK" => {
            let addr = one_number(p, ctx)? as i64;
            if addr < 0 || addr as usize >= ctx.memory.len() {
                return Err(BasicError::IllegalQuantity);
            }
            Value::Number(ctx.memory[addr as usize] as f64)
        }
        "LEN" => Value::Number(one_string(p, ctx)?.len(ctx.heap) as f64),
        "ASC" => {
            let s = one_string(p, ctx)?;
            let bytes = s.bytes(ctx.heap);
            if bytes.is_empty() {
                return Err(BasicError::IllegalQuantity);
            }
            Value::Number(bytes[0] as f64)
        }
        "VAL" => {
            let s = one_string(p, ctx)?;
            let text = s.to_string_lossy(ctx.heap);
            let trimmed = text.trim_start();
            let mut np = Parser::new(trimmed.as_bytes(), 0);
            Value::Number(np.read_number_literal().unwrap_or(0.0))
        }
        "STR$" => {
            let n = one_number(p, ctx)?;
            let text = crate::format::str_dollar(n);
            Value::Str(ctx.heap.alloc(text.as_bytes())?)
        }
        "CHR$" => {
            let n = one_number(p, ctx)? as i64;
            if !(0..=255).contains(&n) {
                return Err(BasicError::IllegalQuantity);
            }
            Value::Str(ctx.heap.alloc(&[n as u8])?)
        }
        "LEFT$" => {
            let s = one_string(p, ctx)?;
            p.skip_spaces();
            if !p.eat_byte(b',') {
                return Err(BasicError::SyntaxError);
            }
            let n = numeric_operand(&eval_expr(p, ctx)?)? as i64;
            if !(0..=255).contains(&n) {
                return Err(BasicError::IllegalQuantity);
            }
            let bytes = s.bytes(ctx.heap);
            let take = (n as usize).min(bytes.len());
            Value::Str(ctx.heap.alloc(&bytes[..take])?)
        }
        "RIGHT$" => {
            let s = one_string(p, ctx)?;
            p.skip_spaces();
            if !p.eat_byte(b',') {
                return Err(BasicError::SyntaxError);
            }
            let n = numeric_operand(&eval_expr(p, ctx)?)? as i64;
            if !(0..=255).contains(&n) {
                return Err(BasicError::IllegalQuantity);
            }
            let bytes = s.bytes(ctx.heap);
            let take = (n as usize).min(bytes.len());
            Value::Str(ctx.heap.alloc(&bytes[bytes.len() - take..])?)
        }
        "MID$" => {
            let s = one_string(p, ctx)?;
            p.skip_spaces();
            if !p.eat_byte(b',') {
                return Err(BasicError::SyntaxError);
            }
            let start = numeric_operand(&eval_expr(p, ctx)?)? as i64;
            if start < 1 {
                return Err(BasicError::IllegalQuantity);
            }
            p.skip_spaces();
            let len = if p.peek() == Some(b',') {
                p.pos += 1;
                let l = numeric_operand(&eval_expr(p, ctx)?)? as i64;
                if !(0..=255).contains(&l) {
                    return Err(BasicError::IllegalQuantity);
                }
                l as usize
            } else {
                255
            };
            let bytes = s.bytes(ctx.heap);
            let start0 = (start as usize - 1).min(bytes.len());
            let end = (start0 + len).min(bytes.len());
            Value::Str(ctx.heap.alloc(&bytes[start0..end])?)
        }
        _ => return Err(BasicError::SyntaxError),
    };
    if !p.eat_byte(b')') {
        return Err(BasicError::SyntaxError);
    }
    Ok(result)
}

fn one_number(p: &mut Parser, ctx: &mut EvalContext) -> BasicResult<f64> {
    let v = eval_expr(p, ctx)?;
    numeric_operand(&v)
}

fn one_string(p: &mut Parser, ctx: &mut EvalContext) -> BasicResult<crate::strings::StringRef> {
    let v = eval_expr(p, ctx)?;
    match v {
        Value::Str(s) => Ok(s),
        Value::Number(_) => Err(BasicError::TypeMismatch),
    }
}

/// Parses a simple variable or array-element lvalue (`spec.md` §4.2's
/// auto-create/auto-dim rule applies identically here).
pub enum LValue {
    Simple(VarName),
    Array(VarName, Vec<usize>),
}

pub fn parse_lvalue(p: &mut Parser, ctx: &mut EvalContext) -> BasicResult<LValue> {
    let name = p.read_var_name().ok_or(BasicError::SyntaxError)?;
    p.skip_spaces();
    if p.peek() == Some(b'(') {
        p.pos += 1;
        let subs = parse_subscripts(p, ctx)?;
        if !p.eat_byte(b')') {
            return Err(BasicError::SyntaxError);
        }
        Ok(LValue::Array(name, subs))
    } else {
        Ok(LValue::Simple(name))
    }
}

pub fn store_lvalue(ctx: &mut EvalContext, lvalue: LValue, value: Value) -> BasicResult<()> {
    let target_is_string = match &lvalue {
        LValue::Simple(n) => n.is_string(),
        LValue::Array(n, _) => n.is_string(),
    };
    if target_is_string != value.is_string() {
        return Err(BasicError::TypeMismatch);
    }
    let value = match value {
        Value::Str(s) => Value::Str(ctx.heap.alloc(s.bytes(ctx.heap))?),
        other => other,
    };
    match lvalue {
        LValue::Simple(name) => {
            ctx.vars.set_simple(name, value);
        }
        LValue::Array(name, subs) => {
            ctx.vars.array_set(name, &subs, value)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::VecIo;
    use crate::strings::StringHeap;

    fn run(expr: &str) -> BasicResult<Value> {
        let body = crate::tokenizer::tokenize(expr);
        let mut vars = VariableTable::new();
        let mut heap = StringHeap::new(4096);
        let mut rnd = numeric::RndState::new();
        let mut memory = vec![0u8; 256];
        let mut io = VecIo::default();
        let mut ctx = EvalContext { vars: &mut vars, heap: &mut heap, rnd: &mut rnd, memory: &mut memory, io: &mut io, column: 0 };
        let mut p = Parser::new(&body, 0);
        eval_expr(&mut p, &mut ctx)
    }

    #[test]
    fn precedence_example_from_spec() {
        let v = run("2+3*4^2-10/2").unwrap();
        assert_eq!(v.as_number(), Some(45.0));
    }

    #[test]
    fn unary_minus_binds_looser_than_power() {
        let v = run("-2^2").unwrap();
        assert_eq!(v.as_number(), Some(-4.0));
    }

    #[test]
    fn power_is_right_associative() {
        let v = run("2^3^2").unwrap();
        assert_eq!(v.as_number(), Some(512.0)); // 2^(3^2), not (2^3)^2
    }

    #[test]
    fn comparisons_yield_ms_truth_values() {
        assert_eq!(run("1<2").unwrap().as_number(), Some(-1.0));
        assert_eq!(run("1>2").unwrap().as_number(), Some(0.0));
    }

    #[test]
    fn not_complements_bitwise() {
        assert_eq!(run("NOT 0").unwrap().as_number(), Some(-1.0));
        assert_eq!(run("NOT -1").unwrap().as_number(), Some(0.0));
    }

    #[test]
    fn string_concatenation_via_plus() {
        let body = crate::tokenizer::tokenize(r#""AB"+"CD""#);
        let mut vars = VariableTable::new();
        let mut heap = StringHeap::new(4096);
        let mut rnd = numeric::RndState::new();
        let mut memory = vec![0u8; 256];
        let mut io = VecIo::default();
        let mut ctx = EvalContext { vars: &mut vars, heap: &mut heap, rnd: &mut rnd, memory: &mut memory, io: &mut io, column: 0 };
        let mut p = Parser::new(&body, 0);
        let v = eval_expr(&mut p, &mut ctx).unwrap();
        match v {
            Value::Str(s) => assert_eq!(s.bytes(ctx.heap), b"ABCD"),
            Value::Number(_) => panic!("expected string"),
        }
    }

    #[test]
    fn mismatched_types_in_addition_error() {
        assert_eq!(run(r#"1+"A""#).unwrap_err(), BasicError::TypeMismatch);
    }

    #[test]
    fn division_by_zero_errors() {
        assert_eq!(run("1/0").unwrap_err(), BasicError::DivisionByZero);
    }

    #[test]
    fn mid_dollar_matches_spec_example() {
        let v = run(r#"MID$("HELLO",2,3)"#).unwrap();
        match v {
            Value::Str(_) => {}
            Value::Number(_) => panic!("expected string"),
        }
    }
}
