//! Built-in primitives
//!
//! Every primitive has a name, a function and an evaluation mode.
//! NORMAL primitives receive their arguments already evaluated. SPECIAL
//! primitives receive the raw argument list plus the caller's environment
//! slot, which they may mutate (`define`, `setq`, the `let` family).
//! TAILCALL primitives return the next expression to evaluate instead of
//! a final value; the evaluator loop carries on with it, which is what
//! makes `if`, `cond`, `begin`, the `let` family and `eval` proper tail
//! calls.

use std::io::Write;
use std::ops::BitOr;

use crate::error::{LiraError, Result};
use crate::interp::{Interp, Slot};
use crate::value::{Tag, Value};

/// Evaluation-mode flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mode(u8);

impl Mode {
    /// arguments evaluated before the call
    pub const NORMAL: Mode = Mode(0);
    /// raw arguments and the caller's environment slot
    pub const SPECIAL: Mode = Mode(1);
    /// the result is re-entered into the evaluator loop
    pub const TAILCALL: Mode = Mode(2);

    pub fn is_special(self) -> bool {
        self.0 & Mode::SPECIAL.0 != 0
    }

    pub fn is_tailcall(self) -> bool {
        self.0 & Mode::TAILCALL.0 != 0
    }
}

impl BitOr for Mode {
    type Output = Mode;
    fn bitor(self, rhs: Mode) -> Mode {
        Mode(self.0 | rhs.0)
    }
}

/// A primitive implementation: the argument list (evaluated or raw per
/// the mode) and the caller's environment slot.
pub type PrimFn = fn(&mut Interp, Value, Slot) -> Result<Value>;

pub struct Primitive {
    pub name: Box<str>,
    pub f: PrimFn,
    pub mode: Mode,
}

impl Primitive {
    pub fn new(name: &str, mode: Mode, f: PrimFn) -> Primitive {
        Primitive {
            name: name.into(),
            f,
            mode,
        }
    }
}

/// The argument as a number, or `bad-arguments`.
fn want_num(x: Value) -> Result<f64> {
    x.as_number().ok_or(LiraError::BadArguments)
}

/// Evaluate the expressions of `t` in order; the value of the last one
/// (Nil for an empty list) is the result.
fn eval_seq(it: &mut Interp, mut t: Value, e: Value) -> Result<Value> {
    let mut x = Value::NIL;
    while t.tag() == Tag::Cons {
        x = it.eval(it.car(t)?, e)?;
        t = it.cdr(t)?;
    }
    Ok(x)
}

// (type x) => integer code of the kind of x
fn f_type(it: &mut Interp, t: Value, _e: Slot) -> Result<Value> {
    let x = it.car(t)?;
    Ok(Value::number(x.tag().code() as f64))
}

// (quote x) => x unevaluated; (eval x) => value of the value of x
// both return their first argument - the mode does the rest
fn f_ident(it: &mut Interp, t: Value, _e: Slot) -> Result<Value> {
    it.car(t)
}

fn f_cons(it: &mut Interp, t: Value, _e: Slot) -> Result<Value> {
    let x = it.car(t)?;
    let y = it.car(it.cdr(t)?)?;
    it.cons(x, y)
}

fn f_car(it: &mut Interp, t: Value, _e: Slot) -> Result<Value> {
    it.car(it.car(t)?)
}

fn f_cdr(it: &mut Interp, t: Value, _e: Slot) -> Result<Value> {
    it.cdr(it.car(t)?)
}

fn f_add(it: &mut Interp, mut t: Value, _e: Slot) -> Result<Value> {
    let mut n = want_num(it.car(t)?)?;
    loop {
        t = it.cdr(t)?;
        if t.is_nil() {
            return Ok(Value::number(n));
        }
        n += want_num(it.car(t)?)?;
    }
}

// unary minus negates
fn f_sub(it: &mut Interp, mut t: Value, _e: Slot) -> Result<Value> {
    let first = want_num(it.car(t)?)?;
    let mut n = if it.cdr(t)?.is_nil() { -first } else { first };
    loop {
        t = it.cdr(t)?;
        if t.is_nil() {
            return Ok(Value::number(n));
        }
        n -= want_num(it.car(t)?)?;
    }
}

fn f_mul(it: &mut Interp, mut t: Value, _e: Slot) -> Result<Value> {
    let mut n = want_num(it.car(t)?)?;
    loop {
        t = it.cdr(t)?;
        if t.is_nil() {
            return Ok(Value::number(n));
        }
        n *= want_num(it.car(t)?)?;
    }
}

// unary / reciprocates; division follows IEEE, so (/ 1 0) is inf
fn f_div(it: &mut Interp, mut t: Value, _e: Slot) -> Result<Value> {
    let first = want_num(it.car(t)?)?;
    let mut n = if it.cdr(t)?.is_nil() { 1.0 / first } else { first };
    loop {
        t = it.cdr(t)?;
        if t.is_nil() {
            return Ok(Value::number(n));
        }
        n /= want_num(it.car(t)?)?;
    }
}

// truncate toward zero within +-1e16; larger magnitudes pass through
fn f_int(it: &mut Interp, t: Value, _e: Slot) -> Result<Value> {
    let n = want_num(it.car(t)?)?;
    if n < 1e16 && n > -1e16 {
        Ok(Value::number((n as i64) as f64))
    } else {
        Ok(Value::number(n))
    }
}

// numbers by IEEE <, two atoms or two strings by bytes, anything else by
// the unsigned order of the encodings - a total order usable for sorting
fn f_lt(it: &mut Interp, t: Value, _e: Slot) -> Result<Value> {
    let x = it.car(t)?;
    let y = it.car(it.cdr(t)?)?;
    let lt = if x.tag() == y.tag() && x.is_text() {
        it.text_cmp(x.ord(), y.ord()) == std::cmp::Ordering::Less
    } else if let (Some(a), Some(b)) = (x.as_number(), y.as_number()) {
        a < b
    } else {
        x.to_bits() < y.to_bits()
    };
    Ok(it.bool_val(lt))
}

// bit equality, except strings compare by content
fn f_eq(it: &mut Interp, t: Value, _e: Slot) -> Result<Value> {
    let x = it.car(t)?;
    let y = it.car(it.cdr(t)?)?;
    let eq = if x.tag() == Tag::String && y.tag() == Tag::String {
        it.text_cmp(x.ord(), y.ord()) == std::cmp::Ordering::Equal
    } else {
        x == y
    };
    Ok(it.bool_val(eq))
}

fn f_not(it: &mut Interp, t: Value, _e: Slot) -> Result<Value> {
    let x = it.car(t)?;
    Ok(it.bool_val(x.is_nil()))
}

// short-circuit; the value is the first truthy operand
fn f_or(it: &mut Interp, mut t: Value, e: Slot) -> Result<Value> {
    let mut x = Value::NIL;
    while !t.is_nil() {
        x = it.eval(it.car(t)?, it.slot(e))?;
        if !x.is_nil() {
            break;
        }
        t = it.cdr(t)?;
    }
    Ok(x)
}

// short-circuit; the value is the last operand, or () on the first falsy
fn f_and(it: &mut Interp, mut t: Value, e: Slot) -> Result<Value> {
    let mut x = Value::NIL;
    while !t.is_nil() {
        x = it.eval(it.car(t)?, it.slot(e))?;
        if x.is_nil() {
            break;
        }
        t = it.cdr(t)?;
    }
    Ok(x)
}

// all but the last for effect; the last is returned for the tail
fn f_begin(it: &mut Interp, mut t: Value, e: Slot) -> Result<Value> {
    while it.more(t)? {
        it.eval(it.car(t)?, it.slot(e))?;
        t = it.cdr(t)?;
    }
    if t.is_nil() {
        Ok(Value::NIL)
    } else {
        it.car(t)
    }
}

fn f_while(it: &mut Interp, t: Value, e: Slot) -> Result<Value> {
    let mut x = Value::NIL;
    loop {
        let c = it.eval(it.car(t)?, it.slot(e))?;
        if c.is_nil() {
            return Ok(x);
        }
        let mut s = it.cdr(t)?;
        while s.tag() == Tag::Cons {
            x = it.eval(it.car(s)?, it.slot(e))?;
            s = it.cdr(s)?;
        }
    }
}

// clauses are (test body...); the body of the first truthy test wins
fn f_cond(it: &mut Interp, mut t: Value, e: Slot) -> Result<Value> {
    loop {
        if t.is_nil() {
            return Ok(Value::NIL);
        }
        let clause = it.car(t)?;
        let c = it.eval(it.car(clause)?, it.slot(e))?;
        if !c.is_nil() {
            return f_begin(it, it.cdr(clause)?, e);
        }
        t = it.cdr(t)?;
    }
}

// (if test then else...) - the else arm is a sequence
fn f_if(it: &mut Interp, t: Value, e: Slot) -> Result<Value> {
    let c = it.eval(it.car(t)?, it.slot(e))?;
    if c.is_nil() {
        let else_arm = it.cdr(it.cdr(t)?)?;
        f_begin(it, else_arm, e)
    } else {
        it.car(it.cdr(t)?)
    }
}

fn f_lambda(it: &mut Interp, t: Value, e: Slot) -> Result<Value> {
    let v = it.car(t)?;
    let x = it.car(it.cdr(t)?)?;
    it.closure(v, x, it.slot(e))
}

fn f_macro(it: &mut Interp, t: Value, _e: Slot) -> Result<Value> {
    let v = it.car(t)?;
    let x = it.car(it.cdr(t)?)?;
    it.macro_(v, x)
}

// prepends to the global environment and returns the name
fn f_define(it: &mut Interp, t: Value, e: Slot) -> Result<Value> {
    let x = it.eval(it.car(it.cdr(t)?)?, it.slot(e))?;
    // re-read the name after evaluation: the collector may have moved it
    let v = it.car(t)?;
    it.define(v, x)?;
    Ok(v)
}

fn f_assoc(it: &mut Interp, t: Value, _e: Slot) -> Result<Value> {
    let v = it.car(t)?;
    let e = it.car(it.cdr(t)?)?;
    it.assoc(v, e)
}

fn f_env(it: &mut Interp, _t: Value, e: Slot) -> Result<Value> {
    Ok(it.slot(e))
}

// every right-hand side sees the environment from before the let
fn f_let(it: &mut Interp, mut t: Value, e: Slot) -> Result<Value> {
    let outer = it.slot(e);
    while it.more(t)? {
        let clause = it.car(t)?;
        let x = eval_seq(it, it.cdr(clause)?, outer)?;
        let v = it.car(clause)?;
        let ne = it.pair(v, x, it.slot(e))?;
        it.set_slot(e, ne);
        t = it.cdr(t)?;
    }
    if t.is_nil() {
        Ok(Value::NIL)
    } else {
        it.car(t)
    }
}

// every right-hand side sees the bindings made so far
fn f_leta(it: &mut Interp, mut t: Value, e: Slot) -> Result<Value> {
    while it.more(t)? {
        let clause = it.car(t)?;
        let x = eval_seq(it, it.cdr(clause)?, it.slot(e))?;
        let v = it.car(clause)?;
        let ne = it.pair(v, x, it.slot(e))?;
        it.set_slot(e, ne);
        t = it.cdr(t)?;
    }
    if t.is_nil() {
        Ok(Value::NIL)
    } else {
        it.car(t)
    }
}

// pre-bind every name to (), then assign each initializer to its own
// binding, so every right-hand side can see every name
fn f_letrec(it: &mut Interp, t: Value, e: Slot) -> Result<Value> {
    let mut s = t;
    while it.more(s)? {
        let clause = it.car(s)?;
        let v = it.car(clause)?;
        let ne = it.pair(v, Value::NIL, it.slot(e))?;
        it.set_slot(e, ne);
        s = it.cdr(s)?;
    }
    let mut t = t;
    while it.more(t)? {
        let clause = it.car(t)?;
        let x = eval_seq(it, it.cdr(clause)?, it.slot(e))?;
        let v = it.car(clause)?;
        let entry = it.binding(v, it.slot(e))?;
        it.set_cell(entry.ord() + 1, x);
        t = it.cdr(t)?;
    }
    if t.is_nil() {
        Ok(Value::NIL)
    } else {
        it.car(t)
    }
}

// bind and assign one name at a time; each initializer sees itself and
// everything before it
fn f_letreca(it: &mut Interp, mut t: Value, e: Slot) -> Result<Value> {
    while it.more(t)? {
        let clause = it.car(t)?;
        let v = it.car(clause)?;
        let ne = it.pair(v, Value::NIL, it.slot(e))?;
        it.set_slot(e, ne);
        let x = eval_seq(it, it.cdr(clause)?, it.slot(e))?;
        let entry = it.car(it.slot(e))?;
        it.set_cell(entry.ord() + 1, x);
        t = it.cdr(t)?;
    }
    if t.is_nil() {
        Ok(Value::NIL)
    } else {
        it.car(t)
    }
}

// the right-hand side is evaluated first, then the innermost existing
// binding is mutated in place
fn f_setq(it: &mut Interp, t: Value, e: Slot) -> Result<Value> {
    let x = it.eval(it.car(it.cdr(t)?)?, it.slot(e))?;
    let v = it.car(t)?;
    let entry = it.binding(v, it.slot(e))?;
    it.set_cell(entry.ord() + 1, x);
    Ok(x)
}

fn f_setcar(it: &mut Interp, t: Value, _e: Slot) -> Result<Value> {
    let p = it.car(t)?;
    if p.tag() != Tag::Cons {
        return Err(LiraError::NotAPair);
    }
    let x = it.car(it.cdr(t)?)?;
    it.set_cell(p.ord(), x);
    Ok(x)
}

fn f_setcdr(it: &mut Interp, t: Value, _e: Slot) -> Result<Value> {
    let p = it.car(t)?;
    if p.tag() != Tag::Cons {
        return Err(LiraError::NotAPair);
    }
    let x = it.car(it.cdr(t)?)?;
    it.set_cell(p.ord() + 1, x);
    Ok(x)
}

fn f_print(it: &mut Interp, mut t: Value, _e: Slot) -> Result<Value> {
    let mut buf = Vec::new();
    while !t.is_nil() {
        it.write_value(it.car(t)?, &mut buf);
        t = it.cdr(t)?;
    }
    let _ = it.out.write_all(&buf);
    Ok(Value::NIL)
}

fn f_println(it: &mut Interp, t: Value, e: Slot) -> Result<Value> {
    f_print(it, t, e)?;
    let _ = it.out.write_all(b"\n");
    Ok(Value::NIL)
}

// like print, but string bytes go out raw
fn f_write(it: &mut Interp, mut t: Value, _e: Slot) -> Result<Value> {
    let mut buf = Vec::new();
    while !t.is_nil() {
        let x = it.car(t)?;
        if x.tag() == Tag::String {
            buf.extend_from_slice(&it.text_of(x).unwrap_or_default());
        } else {
            it.write_value(x, &mut buf);
        }
        t = it.cdr(t)?;
    }
    let _ = it.out.write_all(&buf);
    Ok(Value::NIL)
}

// concatenation: atoms and strings contribute their bytes, numbers their
// printed form, and a list contributes one byte per element
fn f_string(it: &mut Interp, mut t: Value, _e: Slot) -> Result<Value> {
    let mut bytes = Vec::new();
    while !t.is_nil() {
        let x = it.car(t)?;
        match x.tag() {
            Tag::Atom | Tag::String => bytes.extend_from_slice(&it.text_of(x).unwrap_or_default()),
            Tag::Cons => {
                let mut l = x;
                while l.tag() == Tag::Cons {
                    bytes.push(want_num(it.car(l)?)? as u8);
                    l = it.cdr(l)?;
                }
            }
            Tag::Number => it.write_value(x, &mut bytes),
            _ => {}
        }
        t = it.cdr(t)?;
    }
    it.string(&bytes)
}

// trace level, optionally scoped to one expression
fn f_trace(it: &mut Interp, t: Value, e: Slot) -> Result<Value> {
    let saved = it.tr;
    let level = if t.is_nil() { 1 } else { want_num(it.car(t)?)? as u32 };
    it.tr = level;
    if it.more(t)? {
        let r = it.eval(it.car(it.cdr(t)?)?, it.slot(e));
        it.tr = saved;
        r
    } else {
        Ok(Value::number(level as f64))
    }
}

// evaluate the argument; an error (other than quit) becomes (ERR . n)
// after the stack is unwound back to this frame
fn f_catch(it: &mut Interp, t: Value, e: Slot) -> Result<Value> {
    let saved = it.watermark();
    match it.eval(it.car(t)?, it.slot(e)) {
        Ok(x) => Ok(x),
        Err(LiraError::Quit) => Err(LiraError::Quit),
        Err(err) => {
            it.unwind(saved);
            let a = it.atom(b"ERR")?;
            it.cons(a, Value::number(err.code() as f64))
        }
    }
}

fn f_throw(it: &mut Interp, t: Value, _e: Slot) -> Result<Value> {
    let n = want_num(it.car(t)?)?;
    Err(LiraError::from_code(n as u32))
}

fn f_quit(_it: &mut Interp, _t: Value, _e: Slot) -> Result<Value> {
    Err(LiraError::Quit)
}

/// The core primitive table, bound into the global environment at
/// construction.
pub(crate) fn core_table() -> Vec<Primitive> {
    let n = Mode::NORMAL;
    let s = Mode::SPECIAL;
    let t = Mode::TAILCALL;
    vec![
        Primitive::new("type", n, f_type),
        Primitive::new("eval", n | t, f_ident),
        Primitive::new("quote", s, f_ident),
        Primitive::new("cons", n, f_cons),
        Primitive::new("car", n, f_car),
        Primitive::new("cdr", n, f_cdr),
        Primitive::new("+", n, f_add),
        Primitive::new("-", n, f_sub),
        Primitive::new("*", n, f_mul),
        Primitive::new("/", n, f_div),
        Primitive::new("int", n, f_int),
        Primitive::new("<", n, f_lt),
        Primitive::new("eq?", n, f_eq),
        Primitive::new("not", n, f_not),
        Primitive::new("or", s, f_or),
        Primitive::new("and", s, f_and),
        Primitive::new("begin", s | t, f_begin),
        Primitive::new("while", s, f_while),
        Primitive::new("cond", s | t, f_cond),
        Primitive::new("if", s | t, f_if),
        Primitive::new("lambda", s, f_lambda),
        Primitive::new("macro", s, f_macro),
        Primitive::new("define", s, f_define),
        Primitive::new("assoc", n, f_assoc),
        Primitive::new("env", n, f_env),
        Primitive::new("let", s | t, f_let),
        Primitive::new("let*", s | t, f_leta),
        Primitive::new("letrec", s | t, f_letrec),
        Primitive::new("letrec*", s | t, f_letreca),
        Primitive::new("setq", s, f_setq),
        Primitive::new("set-car!", n, f_setcar),
        Primitive::new("set-cdr!", n, f_setcdr),
        Primitive::new("print", n, f_print),
        Primitive::new("println", n, f_println),
        Primitive::new("write", n, f_write),
        Primitive::new("string", n, f_string),
        Primitive::new("trace", s, f_trace),
        Primitive::new("catch", s, f_catch),
        Primitive::new("throw", n, f_throw),
        Primitive::new("quit", n, f_quit),
    ]
}
