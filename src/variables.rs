//! Variable table, array table, and user-defined function table (`spec.md`
//! §3, §4.1 "Variable table" row).
//!
//! Grounded on the teacher's `memory.rs` handle-indirection pattern
//! (`MemoryHandle` into a `Bus`): here the "handle" is a `VarName` and the
//! backing stores are hash maps rather than a flat address space, since
//! `spec.md` §3 explicitly permits a hash map provided iteration order is
//! irrelevant.

use crate::error::{BasicError, BasicResult};
use crate::value::{Value, VarKind, VarName};
use std::collections::HashMap;

pub const MAX_SUBSCRIPT: usize = 32767;
pub const AUTO_DIM_SIZE: usize = 11;
pub const MAX_DIMENSIONS: usize = 11;

/// A dimensioned array: row-major buffer plus the per-dimension extents
/// (`dims[i]` is the size, so valid indices are `0..dims[i]`).
pub struct ArrayEntry {
    pub dims: Vec<usize>,
    pub data: Vec<Value>,
}

impl ArrayEntry {
    fn new(dims: Vec<usize>, kind: VarKind) -> Self {
        let total: usize = dims.iter().product();
        let data = (0..total).map(|_| Value::default_for(kind)).collect();
        ArrayEntry { dims, data }
    }

    fn index_of(&self, subscripts: &[usize]) -> BasicResult<usize> {
        if subscripts.len() != self.dims.len() {
            return Err(BasicError::BadSubscript);
        }
        let mut idx = 0usize;
        for (sub, &dim) in subscripts.iter().zip(&self.dims) {
            if *sub >= dim {
                return Err(BasicError::BadSubscript);
            }
            idx = idx * dim + sub;
        }
        Ok(idx)
    }

    pub fn get(&self, subscripts: &[usize]) -> BasicResult<&Value> {
        let idx = self.index_of(subscripts)?;
        Ok(&self.data[idx])
    }

    pub fn set(&mut self, subscripts: &[usize], value: Value) -> BasicResult<()> {
        let idx = self.index_of(subscripts)?;
        self.data[idx] = value;
        Ok(())
    }
}

/// A user function: single-letter name, single-letter parameter, and the
/// tokenised expression body copied out of its `DEF FN` line.
#[derive(Clone)]
pub struct UserFunction {
    pub param: u8,
    pub body: Vec<u8>,
}

#[derive(Default)]
pub struct VariableTable {
    simple: HashMap<VarName, Value>,
    arrays: HashMap<VarName, ArrayEntry>,
    functions: HashMap<u8, UserFunction>,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// CLEAR/NEW/RUN: drop all variable, array, and function state.
    pub fn clear(&mut self) {
        self.simple.clear();
        self.arrays.clear();
        self.functions.clear();
    }

    pub fn get_simple(&self, name: VarName) -> Value {
        self.simple.get(&name).cloned_or_default(name.kind)
    }

    pub fn set_simple(&mut self, name: VarName, value: Value) {
        self.simple.insert(name, value);
    }

    pub fn is_dimensioned(&self, name: VarName) -> bool {
        self.arrays.contains_key(&name)
    }

    /// DIM: allocate a fresh array. Errors if already dimensioned.
    pub fn dim(&mut self, name: VarName, sizes: Vec<usize>) -> BasicResult<()> {
        if sizes.is_empty() || sizes.len() > MAX_DIMENSIONS {
            return Err(BasicError::BadSubscript);
        }
        if self.arrays.contains_key(&name) {
            return Err(BasicError::Redimensioned);
        }
        self.arrays.insert(name, ArrayEntry::new(sizes, name.kind));
        Ok(())
    }

    /// Auto-dim rule: a reference to an undeclared array creates a single
    /// dimension of size 11 (max subscript 10).
    fn auto_dim(&mut self, name: VarName) {
        self.arrays.entry(name).or_insert_with(|| ArrayEntry::new(vec![AUTO_DIM_SIZE], name.kind));
    }

    pub fn array_get(&mut self, name: VarName, subscripts: &[usize]) -> BasicResult<Value> {
        self.auto_dim(name);
        let array = self.arrays.get(&name).expect("just auto-dimensioned");
        array.get(subscripts).map(|v| v.clone())
    }

    pub fn array_set(&mut self, name: VarName, subscripts: &[usize], value: Value) -> BasicResult<()> {
        self.auto_dim(name);
        let array = self.arrays.get_mut(&name).expect("just auto-dimensioned");
        array.set(subscripts, value)
    }

    pub fn define_function(&mut self, name: u8, param: u8, body: Vec<u8>) {
        self.functions.insert(name, UserFunction { param, body });
    }

    pub fn function(&self, name: u8) -> Option<&UserFunction> {
        self.functions.get(&name)
    }
}

/// Small helper so `HashMap::get(...).cloned()` reads naturally with a
/// per-kind default rather than an `Option` at every call site.
trait ClonedOrDefault {
    fn cloned_or_default(self, kind: VarKind) -> Value;
}

impl ClonedOrDefault for Option<&Value> {
    fn cloned_or_default(self, kind: VarKind) -> Value {
        match self {
            Some(v) => v.clone(),
            None => Value::default_for(kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undeclared_simple_variable_reads_as_zero() {
        let table = VariableTable::new();
        let name = VarName::normalize("X", false, false);
        assert_eq!(table.get_simple(name).as_number(), Some(0.0));
    }

    #[test]
    fn array_reference_auto_dims_to_size_eleven() {
        let mut table = VariableTable::new();
        let name = VarName::normalize("A", false, false);
        let v = table.array_get(name, &[10]).unwrap();
        assert_eq!(v.as_number(), Some(0.0));
        assert_eq!(table.array_get(name, &[11]).unwrap_err(), BasicError::BadSubscript);
    }

    #[test]
    fn dim_then_redim_is_an_error() {
        let mut table = VariableTable::new();
        let name = VarName::normalize("B", false, false);
        table.dim(name, vec![5]).unwrap();
        assert_eq!(table.dim(name, vec![5]).unwrap_err(), BasicError::Redimensioned);
    }

    #[test]
    fn set_then_get_roundtrips_through_the_array() {
        let mut table = VariableTable::new();
        let name = VarName::normalize("C", false, false);
        table.dim(name, vec![3, 3]).unwrap();
        table.array_set(name, &[1, 2], Value::Number(42.0)).unwrap();
        let v = table.array_get(name, &[1, 2]).unwrap();
        assert_eq!(v.as_number(), Some(42.0));
    }

    #[test]
    fn clear_drops_everything() {
        let mut table = VariableTable::new();
        let name = VarName::normalize("D", false, false);
        table.set_simple(name, Value::Number(1.0));
        table.dim(VarName::normalize("E", false, false), vec![2]).unwrap();
        table.define_function(b'F', b'X', vec![]);
        table.clear();
        assert_eq!(table.get_simple(name).as_number(), Some(0.0));
        assert!(!table.is_dimensioned(VarName::normalize("E", false, false)));
        assert!(table.function(b'F').is_none());
    }
}
