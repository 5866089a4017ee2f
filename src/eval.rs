//! Evaluator
//!
//! `eval` drives a loop over `step`. Tail positions never recurse:
//! special forms flagged TAILCALL return the next expression instead of
//! its value, and a closure call swaps in the closure's body and extended
//! environment, so arbitrarily deep tail recursion runs in constant
//! native stack.
//!
//! Four stack slots protect the loop's temporaries across collections:
//! the callee, the environment being extended, the substituted
//! expression, and the substituted environment. Pair ordinals survive a
//! collection untouched, but atom ordinals move when the heap compacts,
//! so any atom held across an allocating call is parked in a slot and
//! re-read afterwards.

use std::io::Write;

use crate::error::{LiraError, Result};
use crate::interp::Interp;
use crate::value::{Tag, Value};

impl Interp {
    /// Evaluate `x` in environment `e`. With tracing enabled, every step
    /// prints `depth: expr => value` to the output sink.
    pub fn eval(&mut self, x: Value, e: Value) -> Result<Value> {
        if self.tr == 0 {
            return self.step(x, e);
        }
        let y = self.step(x, e)?;
        let mut line = Vec::new();
        line.extend_from_slice(format!("{:4}: ", self.n_cells - self.sp).as_bytes());
        self.write_value(x, &mut line);
        line.extend_from_slice(b" => ");
        self.write_value(y, &mut line);
        line.push(b'\n');
        let _ = self.out.write_all(&line);
        Ok(y)
    }

    fn step(&mut self, x: Value, e: Value) -> Result<Value> {
        let wm = self.sp;
        let r = self.step_loop(x, e);
        self.unwind(wm);
        r
    }

    fn step_loop(&mut self, mut x: Value, mut e: Value) -> Result<Value> {
        let f = self.push(Value::NIL)?;
        let d = self.push(Value::NIL)?;
        let y = self.push(Value::NIL)?;
        let z = self.push(Value::NIL)?;
        loop {
            self.poll_interrupt()?;
            match x.tag() {
                Tag::Atom => {
                    x = self.assoc(x, e)?;
                    break;
                }
                Tag::Cons => {}
                _ => break,
            }
            let fv = self.eval(self.car(x)?, e)?;
            self.set_slot(f, fv);
            x = self.cdr(x)?;
            match fv.tag() {
                Tag::Primitive => {
                    let p = &self.prims[fv.ord() as usize];
                    let (pf, mode) = (p.f, p.mode);
                    if !mode.is_special() {
                        x = self.evlis(x, e)?;
                    }
                    self.set_slot(z, e);
                    x = pf(self, x, z)?;
                    self.set_slot(y, x);
                    e = self.slot(z);
                    if mode.is_tailcall() {
                        continue;
                    }
                    break;
                }
                Tag::Closure => {
                    let mut scope = self.cdr(fv)?;
                    if scope.is_nil() {
                        scope = self.env;
                    }
                    self.set_slot(d, scope);
                    let mut v = self.car(self.car(fv)?)?;
                    while v.tag() == Tag::Cons && x.tag() == Tag::Cons {
                        let arg = self.eval(self.car(x)?, e)?;
                        let nd = self.pair(self.car(v)?, arg, self.slot(d))?;
                        self.set_slot(d, nd);
                        v = self.cdr(v)?;
                        x = self.cdr(x)?;
                    }
                    if v.tag() == Tag::Cons {
                        // arguments continue past a dotted tail
                        let mut rest = self.eval(x, e)?;
                        self.set_slot(y, rest);
                        while v.tag() == Tag::Cons && rest.tag() == Tag::Cons {
                            let nd = self.pair(self.car(v)?, self.car(rest)?, self.slot(d))?;
                            self.set_slot(d, nd);
                            v = self.cdr(v)?;
                            rest = self.cdr(self.slot(y))?;
                            self.set_slot(y, rest);
                        }
                        if v.tag() == Tag::Cons {
                            return Err(LiraError::CannotApply);
                        }
                        x = rest;
                    } else {
                        self.set_slot(y, v);
                        if x.tag() == Tag::Cons {
                            x = self.evlis(x, e)?;
                        } else if !x.is_nil() {
                            x = self.eval(x, e)?;
                        }
                        v = self.slot(y);
                    }
                    if !v.is_nil() {
                        // rest parameter takes the remaining arguments
                        let nd = self.pair(v, x, self.slot(d))?;
                        self.set_slot(d, nd);
                    }
                    x = self.cdr(self.car(fv)?)?;
                    self.set_slot(y, x);
                    e = self.slot(d);
                    self.set_slot(z, e);
                }
                Tag::Macro => {
                    self.set_slot(d, self.env);
                    let mut v = self.car(fv)?;
                    while v.tag() == Tag::Cons && x.tag() == Tag::Cons {
                        let nd = self.pair(self.car(v)?, self.car(x)?, self.slot(d))?;
                        self.set_slot(d, nd);
                        v = self.cdr(v)?;
                        x = self.cdr(x)?;
                    }
                    if v.tag() == Tag::Cons {
                        return Err(LiraError::CannotApply);
                    }
                    if !v.is_nil() {
                        let nd = self.pair(v, x, self.slot(d))?;
                        self.set_slot(d, nd);
                    }
                    // the expansion continues evaluating in the caller's
                    // environment
                    x = self.eval(self.cdr(fv)?, self.slot(d))?;
                    self.set_slot(y, x);
                }
                _ => return Err(LiraError::CannotApply),
            }
        }
        Ok(x)
    }

    /// Evaluate every expression of list `t`, producing a fresh list of
    /// the values. A symbol tail after a dot evaluates to the tail of the
    /// new list.
    pub(crate) fn evlis(&mut self, mut t: Value, e: Value) -> Result<Value> {
        let head = self.push(Value::NIL)?;
        let mut tail: Option<u32> = None;
        while t.tag() == Tag::Cons {
            let v = self.eval(self.car(t)?, e)?;
            let p = self.cons(v, Value::NIL)?;
            match tail {
                None => self.set_slot(head, p),
                Some(c) => self.set_cell(c, p),
            }
            tail = Some(p.ord() + 1);
            t = self.cdr(t)?;
        }
        if t.tag() == Tag::Atom {
            let rest = self.assoc(t, e)?;
            match tail {
                None => self.set_slot(head, rest),
                Some(c) => self.set_cell(c, rest),
            }
        }
        Ok(self.pop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(it: &mut Interp, src: &str) -> String {
        let v = it.eval_str(src).unwrap().unwrap();
        it.print_str(v)
    }

    #[test]
    fn self_evaluating() {
        let mut it = Interp::new();
        assert_eq!(run(&mut it, "42"), "42");
        assert_eq!(run(&mut it, "()"), "()");
        assert_eq!(run(&mut it, "\"s\""), "\"s\"");
    }

    #[test]
    fn application() {
        let mut it = Interp::new();
        assert_eq!(run(&mut it, "(+ 1 2 3)"), "6");
        assert_eq!(run(&mut it, "((lambda (n) (* n n)) 7)"), "49");
    }

    #[test]
    fn unbound_symbol() {
        let mut it = Interp::new();
        assert_eq!(it.eval_str("nowhere"), Err(LiraError::UnboundSymbol));
    }

    #[test]
    fn cannot_apply_a_number() {
        let mut it = Interp::new();
        assert_eq!(it.eval_str("(1 2 3)"), Err(LiraError::CannotApply));
    }

    #[test]
    fn too_few_arguments() {
        let mut it = Interp::new();
        assert_eq!(
            it.eval_str("((lambda (a b) a) 1)"),
            Err(LiraError::CannotApply)
        );
    }

    #[test]
    fn rest_parameters() {
        let mut it = Interp::new();
        assert_eq!(run(&mut it, "((lambda args args) 1 2 3)"), "(1 2 3)");
        assert_eq!(run(&mut it, "((lambda (a . r) r) 1 2 3)"), "(2 3)");
        assert_eq!(run(&mut it, "((lambda (a . r) a) 1)"), "1");
        assert_eq!(run(&mut it, "((lambda (a . r) r) 1)"), "()");
    }

    #[test]
    fn the_stack_balances_across_eval() {
        let mut it = Interp::new();
        let wm = it.watermark();
        it.eval_str("((lambda (a b c) (+ a b c)) 1 2 3)").unwrap();
        assert_eq!(it.watermark(), wm);
    }

    #[test]
    fn evlis_with_symbol_tail() {
        let mut it = Interp::new();
        it.eval_str("(define xs '(2 3))").unwrap();
        // (1 . xs) evaluates the tail symbol to extend the argument list
        assert_eq!(run(&mut it, "(+ 1 . xs)"), "6");
    }
}
