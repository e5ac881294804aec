//! The tagged `Value` sum type at the heart of the Vega value model.

use crate::array::Array;
use crate::result_obj::ResultObj;
use crate::string::VString;
use std::cell::RefCell;
use std::rc::Rc;

/// Opaque handle into the agent manager's arena (Design Notes §9: "keep
/// Agents in an arena and reference them by index"). Never dereferenced
/// by `vega-value` itself — only `vega-agent`/`vega-vm` know what to do
/// with one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AgentId(pub u32);

/// Opaque handle into the runtime's pending-future table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FutureId(pub u32);

/// A runtime value. Heap-backed variants (`Str`, `Array`, `Result`) carry
/// an `Rc` — cloning a `Value` is always O(1) and matches the spec's
/// "pushes retain, pops transfer ownership" discipline by construction.
#[derive(Debug, Clone)]
pub enum Value {
    /// The null value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A 64-bit signed integer.
    Int(i64),
    /// A 64-bit float.
    Float(f64),
    /// A shared, immutable string.
    Str(Rc<VString>),
    /// A shared, mutable array.
    Array(Rc<RefCell<Array>>),
    /// An agent handle (index into the agent manager's arena).
    Agent(AgentId),
    /// A future handle (index into the pending-future table).
    Future(FutureId),
    /// A boxed `Ok`/`Err` result.
    Result(Rc<ResultObj>),
    /// An index into the function table.
    Function(u32),
}

impl Value {
    /// Convenience constructor for a heap string.
    #[must_use]
    pub fn string(s: impl Into<Box<str>>) -> Self {
        Value::Str(VString::new(s))
    }

    /// Human-readable type name, used in error messages and `str`-ification.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Array(_) => "array",
            Value::Agent(_) => "agent",
            Value::Future(_) => "future",
            Value::Result(_) => "result",
            Value::Function(_) => "function",
        }
    }

    /// Truthiness used by `JUMP_IF`/`JUMP_IF_NOT`/`AND`/`OR`/`NOT`.
    ///
    /// `Null` and `false` are falsy; `0` and `0.0` are falsy; empty strings
    /// and empty arrays are falsy; everything else (including agents,
    /// futures, functions, and results) is truthy.
    #[must_use]
    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Array(a) => !a.borrow().is_empty(),
            Value::Agent(_) | Value::Future(_) | Value::Function(_) | Value::Result(_) => true,
        }
    }

    /// Stringify a value for `PRINT`, tool-result text, and `str::from_int`.
    #[must_use]
    pub fn stringify(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Str(s) => s.as_str().to_string(),
            Value::Array(a) => {
                let items: Vec<String> = a.borrow().iter().map(Value::stringify).collect();
                format!("[{}]", items.join(", "))
            }
            Value::Agent(id) => format!("<agent #{}>", id.0),
            Value::Future(id) => format!("<future #{}>", id.0),
            Value::Result(r) => {
                if r.is_ok() {
                    format!("Ok({})", r.unwrap().stringify())
                } else {
                    format!("Err({})", r.unwrap().stringify())
                }
            }
            Value::Function(idx) => format!("<function #{idx}>"),
        }
    }

    /// Numeric value as `f64`, for cross-type float promotion in
    /// arithmetic/comparison opcodes. `None` for non-numeric values.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_rules() {
        assert!(!Value::Null.truthy());
        assert!(!Value::Int(0).truthy());
        assert!(Value::Int(1).truthy());
        assert!(!Value::Float(0.0).truthy());
        assert!(!Value::string("").truthy());
        assert!(Value::string("x").truthy());
        assert!(Value::Function(0).truthy());
    }

    #[test]
    fn stringify_matches_spec_examples() {
        assert_eq!(Value::Int(14).stringify(), "14");
        assert_eq!(Value::string("foobar").stringify(), "foobar");
    }

    #[test]
    fn clone_is_cheap_refcount_bump() {
        let arr = Array::new(0);
        let v = Value::Array(Rc::clone(&arr));
        let v2 = v.clone();
        drop(v);
        drop(v2);
        drop(arr);
    }
}
