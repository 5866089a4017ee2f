//! Environments
//!
//! An environment is a list of `(name . value)` pairs; lookup walks from
//! the head and the first match wins, which makes shadowing implicit.
//! Lexical scope is shared structure: a closure's captured environment is
//! simply a tail of some older list.

use crate::error::{LiraError, Result};
use crate::interp::Interp;
use crate::value::{Tag, Value};

impl Interp {
    /// The value bound to `v` in environment `e`.
    pub fn assoc(&self, v: Value, mut e: Value) -> Result<Value> {
        while e.tag() == Tag::Cons && self.car(self.car(e)?)? != v {
            e = self.cdr(e)?;
        }
        if e.tag() == Tag::Cons {
            self.cdr(self.car(e)?)
        } else {
            Err(LiraError::UnboundSymbol)
        }
    }

    /// The innermost `(name . value)` entry pair for `v` in `e`, for
    /// callers that mutate the binding in place.
    pub(crate) fn binding(&self, v: Value, mut e: Value) -> Result<Value> {
        while e.tag() == Tag::Cons && self.car(self.car(e)?)? != v {
            e = self.cdr(e)?;
        }
        if e.tag() == Tag::Cons {
            self.car(e)
        } else {
            Err(LiraError::UnboundSymbol)
        }
    }

    /// Bind `v` to `x` in the global environment. Always prepends; an
    /// existing binding is shadowed, never overwritten.
    pub fn define(&mut self, v: Value, x: Value) -> Result<()> {
        self.env = self.pair(v, x, self.env)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_head_to_tail() {
        let mut it = Interp::new();
        let x = it.atom(b"x").unwrap();
        it.define(x, Value::number(1.0)).unwrap();
        it.define(x, Value::number(2.0)).unwrap();
        let v = it.assoc(x, it.global_env()).unwrap();
        assert_eq!(v.as_number(), Some(2.0));
    }

    #[test]
    fn missing_name_is_unbound() {
        let mut it = Interp::new();
        let ghost = it.atom(b"ghost").unwrap();
        assert_eq!(
            it.assoc(ghost, it.global_env()),
            Err(LiraError::UnboundSymbol)
        );
    }
}
