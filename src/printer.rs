//! Printer
//!
//! The symmetric half of the reader: numbers print with full round-trip
//! precision, strings with their escapes reversed, pairs as `(a b c)` or
//! `(a b . d)`. Primitives, closures and macros print as debugging
//! markers and are not expected to round-trip.

use crate::interp::Interp;
use crate::value::{Tag, Value};

impl Interp {
    /// Serialize `x` into `out` exactly as the reader would accept it
    /// (for the round-trippable kinds).
    pub fn write_value(&self, x: Value, out: &mut Vec<u8>) {
        match x.tag() {
            Tag::Nil => out.extend_from_slice(b"()"),
            Tag::Number => fmt_number(f64::from_bits(x.to_bits()), out),
            Tag::Primitive => {
                out.push(b'<');
                out.extend_from_slice(self.prims[x.ord() as usize].name.as_bytes());
                out.push(b'>');
            }
            Tag::Atom => {
                let o = x.ord();
                for k in 0..self.text_len(o) {
                    out.push(self.heap_u8(o + k));
                }
            }
            Tag::String => {
                out.push(b'"');
                let o = x.ord();
                for k in 0..self.text_len(o) {
                    escape_into(self.heap_u8(o + k), out);
                }
                out.push(b'"');
            }
            Tag::Cons => self.write_list(x, out),
            Tag::Closure => {
                out.push(b'{');
                out.extend_from_slice(x.ord().to_string().as_bytes());
                out.push(b'}');
            }
            Tag::Macro => {
                out.push(b'[');
                out.extend_from_slice(x.ord().to_string().as_bytes());
                out.push(b']');
            }
        }
    }

    fn write_list(&self, mut t: Value, out: &mut Vec<u8>) {
        out.push(b'(');
        loop {
            self.write_value(self.cell(t.ord()), out);
            t = self.cell(t.ord() + 1);
            match t.tag() {
                Tag::Nil => break,
                Tag::Cons => out.push(b' '),
                _ => {
                    out.extend_from_slice(b" . ");
                    self.write_value(t, out);
                    break;
                }
            }
        }
        out.push(b')');
    }

    /// `x` printed to a String; bytes outside UTF-8 are replaced.
    pub fn print_str(&self, x: Value) -> String {
        let mut out = Vec::new();
        self.write_value(x, &mut out);
        String::from_utf8_lossy(&out).into_owned()
    }
}

/// Shortest representation that parses back to the same double; `inf`,
/// `-inf` and `nan` are spelled the way the reader reads them, and
/// extreme magnitudes switch to exponent form instead of hundreds of
/// digits.
fn fmt_number(n: f64, out: &mut Vec<u8>) {
    if n.is_nan() {
        out.extend_from_slice(b"nan");
    } else if n == f64::INFINITY {
        out.extend_from_slice(b"inf");
    } else if n == f64::NEG_INFINITY {
        out.extend_from_slice(b"-inf");
    } else if n.abs() != 0.0 && !(1e-4..1e16).contains(&n.abs()) {
        out.extend_from_slice(format!("{:e}", n).as_bytes());
    } else {
        out.extend_from_slice(n.to_string().as_bytes());
    }
}

fn escape_into(b: u8, out: &mut Vec<u8>) {
    match b {
        7 => out.extend_from_slice(b"\\a"),
        8 => out.extend_from_slice(b"\\b"),
        9 => out.extend_from_slice(b"\\t"),
        10 => out.extend_from_slice(b"\\n"),
        11 => out.extend_from_slice(b"\\v"),
        12 => out.extend_from_slice(b"\\f"),
        13 => out.extend_from_slice(b"\\r"),
        b'"' => out.extend_from_slice(b"\\\""),
        b'\\' => out.extend_from_slice(b"\\\\"),
        b => out.push(b),
    }
}
