//! The central runtime context and execution loop (`spec.md` §9 "implicit
//! global interpreter state", §4.3 statement separator / program walk).
//!
//! Grounded on the teacher's `Emulator`/`CPU::clock_cycle`: one struct owns
//! every component table, and a single step function fetches the next
//! statement, dispatches it, and applies whatever control-flow action comes
//! back, the same shape as the teacher's fetch-decode-execute cycle.

use crate::config::Config;
use crate::error::{BasicError, BasicResult};
use crate::eval::{EvalContext, Parser};
use crate::exec::{self, Control};
use crate::format::Printer;
use crate::io::Io;
use crate::numeric::RndState;
use crate::program::{ControlStack, Cursor, CursorLine, DataCursor, GosubFrame, Program};
use crate::strings::StringHeap;
use crate::tokenizer::{detokenize, tokenize};
use crate::variables::VariableTable;

/// Whether the most recent halt permits `CONT` (`spec.md` §7: only `BR` or
/// a `STOP` keep the saved cursor eligible).
#[derive(Clone, Copy, PartialEq, Eq)]
enum ContState {
    NotEligible,
    Eligible(Cursor),
}

pub struct Interpreter {
    pub config: Config,
    pub program: Program,
    vars: VariableTable,
    heap: StringHeap,
    rnd: RndState,
    memory: Vec<u8>,
    control_stack: ControlStack,
    data_cursor: DataCursor,
    printer: Printer,
    direct_buffer: Vec<u8>,
    cont: ContState,
    pub break_hook: Box<dyn FnMut() -> bool>,
}

/// The outcome of running a program or a direct-mode line to completion.
pub enum RunOutcome {
    Ended,
    Stopped(Option<u16>),
    Error { error: BasicError, line: Option<u16> },
}

impl Interpreter {
    pub fn new(config: Config) -> Self {
        let heap = StringHeap::new(config.string_heap_capacity);
        let control_stack = ControlStack::new(config.control_stack_capacity);
        let memory = vec![0u8; config.memory_size];
        let printer = Printer::new(config.width);
        Interpreter {
            config,
            program: Program::new(),
            vars: VariableTable::new(),
            heap,
            rnd: RndState::new(),
            memory,
            control_stack,
            data_cursor: DataCursor::default(),
            printer,
            direct_buffer: Vec::new(),
            cont: ContState::NotEligible,
            break_hook: Box::new(|| false),
        }
    }

    /// CLEAR: drop variables, control stack, and DATA cursor. Program text
    /// and the string heap's bump pointer are also reset, matching classic
    /// CLEAR's "reclaim everything except the program listing" contract.
    pub fn clear(&mut self) {
        self.vars.clear();
        self.control_stack.clear();
        self.data_cursor.reset();
        self.heap.reset();
        self.cont = ContState::NotEligible;
    }

    /// NEW: CLEAR plus drop the program text.
    pub fn new_program(&mut self) {
        self.clear();
        self.program.clear();
    }

    /// Stores, replaces, or (with an empty body) deletes a numbered line.
    pub fn store_line(&mut self, number: u16, source: &str) -> BasicResult<()> {
        if !(crate::program::MIN_LINE..=crate::program::MAX_LINE).contains(&number) {
            return Err(BasicError::IllegalDirect);
        }
        let body = tokenize(source);
        self.program.store(number, body);
        Ok(())
    }

    pub fn list(&self, from: Option<u16>, to: Option<u16>) -> String {
        let mut out = String::new();
        for (number, body) in self.program.iter() {
            if from.map(|f| number < f).unwrap_or(false) {
                continue;
            }
            if to.map(|t| number > t).unwrap_or(false) {
                continue;
            }
            out.push_str(&number.to_string());
            out.push(' ');
            out.push_str(&detokenize(body));
            out.push('\n');
        }
        out
    }

    /// RUN: resets variables/stack/data (but not the program) and begins
    /// execution at the first line, or at `start` if given.
    pub fn run(&mut self, io: &mut dyn Io, start: Option<u16>) -> RunOutcome {
        self.clear();
        let first = match start.or_else(|| self.program.first_line()) {
            Some(n) => n,
            None => return RunOutcome::Ended,
        };
        if self.program.get(first).is_none() {
            return RunOutcome::Error { error: BasicError::UndefinedStatement, line: None };
        }
        self.exec_from(io, Cursor::at(CursorLine::Program(first), 0))
    }

    /// CONT: resumes from the cursor saved by STOP or BREAK, if eligible.
    pub fn cont(&mut self, io: &mut dyn Io) -> RunOutcome {
        match self.cont {
            ContState::Eligible(cursor) => self.exec_from(io, cursor),
            ContState::NotEligible => RunOutcome::Error { error: BasicError::CantContinue, line: None },
        }
    }

    /// Executes one direct-mode statement line (no leading line number).
    pub fn execute_direct(&mut self, source: &str, io: &mut dyn Io) -> RunOutcome {
        self.direct_buffer = tokenize(source);
        let mut pos = 0usize;
        loop {
            let body = self.direct_buffer.clone();
            let mut p = Parser::new(&body, pos);
            let column = self.printer.column();
            let mut ctx = EvalContext { vars: &mut self.vars, heap: &mut self.heap, rnd: &mut self.rnd, memory: &mut self.memory, io: &mut *io, column };
            match exec::exec_statement(&mut p, &mut ctx, &mut self.data_cursor, &mut self.control_stack, &mut self.printer, None, &self.program) {
                Ok(Control::Continue) => {
                    p.skip_spaces();
                    if p.body.get(p.pos) == Some(&b':') {
                        pos = p.pos + 1;
                        continue;
                    }
                    return RunOutcome::Ended;
                }
                Ok(Control::Goto(line)) => return self.exec_from(io, Cursor::at(CursorLine::Program(line), 0)),
                Ok(Control::Gosub(line)) => {
                    let resume = Cursor::at(CursorLine::Direct, p.pos);
                    if self.control_stack.push_gosub(GosubFrame { resume }).is_err() {
                        return RunOutcome::Error { error: BasicError::OutOfMemory, line: None };
                    }
                    return self.exec_from(io, Cursor::at(CursorLine::Program(line), 0));
                }
                Ok(Control::Return(_)) => return RunOutcome::Error { error: BasicError::IllegalDirect, line: None },
                Ok(Control::EndProgram) | Ok(Control::Stop) => return RunOutcome::Ended,
                Err(e) => {
                    self.cont = ContState::NotEligible;
                    return RunOutcome::Error { error: e, line: None };
                }
            }
        }
    }

    /// The main fetch-decode-execute loop: resolves `cursor` to a byte
    /// slice, runs one statement, applies its control-flow result, and
    /// repeats until the program ends, STOPs, errors, or BREAKs.
    fn exec_from(&mut self, io: &mut dyn Io, start: Cursor) -> RunOutcome {
        let mut cursor = start;
        loop {
            let current_line = match cursor.line {
                CursorLine::Program(n) => Some(n),
                CursorLine::Direct => None,
            };
            if let Some(n) = current_line {
                if cursor.offset == 0 && (self.break_hook)() {
                    self.cont = ContState::Eligible(cursor);
                    return RunOutcome::Error { error: BasicError::Break, line: Some(n) };
                }
            }
            let body: Vec<u8> = match cursor.line {
                CursorLine::Program(n) => match self.program.get(n) {
                    Some(b) => b.to_vec(),
                    None => return RunOutcome::Ended,
                },
                CursorLine::Direct => self.direct_buffer.clone(),
            };
            let mut p = Parser::new(&body, cursor.offset);
            let column = self.printer.column();
            let mut ctx = EvalContext { vars: &mut self.vars, heap: &mut self.heap, rnd: &mut self.rnd, memory: &mut self.memory, io: &mut *io, column };
            let result = exec::exec_statement(&mut p, &mut ctx, &mut self.data_cursor, &mut self.control_stack, &mut self.printer, current_line, &self.program);
            match result {
                Ok(Control::Continue) => {
                    p.skip_spaces();
                    if p.body.get(p.pos) == Some(&b':') {
                        cursor.offset = p.pos + 1;
                        continue;
                    }
                    cursor = match self.advance_past_line(cursor.line) {
                        Some(next) => next,
                        None => return RunOutcome::Ended,
                    };
                }
                Ok(Control::Goto(line)) => {
                    if self.program.get(line).is_none() {
                        return RunOutcome::Error { error: BasicError::UndefinedStatement, line: current_line };
                    }
                    cursor = Cursor::at(CursorLine::Program(line), 0);
                }
                Ok(Control::Gosub(line)) => {
                    if self.program.get(line).is_none() {
                        return RunOutcome::Error { error: BasicError::UndefinedStatement, line: current_line };
                    }
                    let resume = Cursor::at(cursor.line, p.pos);
                    if self.control_stack.push_gosub(GosubFrame { resume }).is_err() {
                        return RunOutcome::Error { error: BasicError::OutOfMemory, line: current_line };
                    }
                    cursor = Cursor::at(CursorLine::Program(line), 0);
                }
                Ok(Control::Return(resume)) => {
                    if matches!(resume.line, CursorLine::Direct) {
                        return RunOutcome::Ended;
                    }
                    cursor = resume;
                }
                Ok(Control::EndProgram) => return RunOutcome::Ended,
                Ok(Control::Stop) => {
                    let resume = Cursor::at(cursor.line, p.pos);
                    self.cont = ContState::Eligible(resume);
                    return RunOutcome::Stopped(current_line);
                }
                Err(e) => {
                    self.cont = if e == BasicError::Break { ContState::Eligible(cursor) } else { ContState::NotEligible };
                    return RunOutcome::Error { error: e, line: current_line };
                }
            }
        }
    }

    fn advance_past_line(&self, line: CursorLine) -> Option<Cursor> {
        match line {
            CursorLine::Direct => None,
            CursorLine::Program(n) => self.program.next_line_after(n).map(|next| Cursor::at(CursorLine::Program(next), 0)),
        }
    }

    pub fn free_bytes(&self) -> usize {
        self.heap.free_bytes()
    }
}
