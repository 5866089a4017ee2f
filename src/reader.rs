//! S-expression reader
//!
//! A one-character-lookahead scanner over a byte source, feeding a
//! recursive parser that builds values directly in the interpreter's
//! memory. Lists under construction are protected on the stack and grown
//! by patching the cdr cell of the last pair, so a collection in the
//! middle of a long list is harmless.

use smallvec::SmallVec;

use crate::error::LiraError;
use crate::interp::Interp;
use crate::value::Value;

/// Why a read failed. `Incomplete` means the input ended mid-expression -
/// the REPL uses it to keep reading lines - while `Bad` is a real syntax
/// error. Either maps to the `syntax` error kind at the interpreter
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError {
    /// input ended in the middle of an expression
    Incomplete,
    /// malformed input
    Bad(&'static str),
    /// allocation failure while building the value
    Runtime(LiraError),
}

impl From<LiraError> for ReadError {
    fn from(e: LiraError) -> Self {
        ReadError::Runtime(e)
    }
}

impl From<ReadError> for LiraError {
    fn from(e: ReadError) -> Self {
        match e {
            ReadError::Incomplete | ReadError::Bad(_) => LiraError::Syntax,
            ReadError::Runtime(e) => e,
        }
    }
}

type Buf = SmallVec<[u8; 64]>;

enum Token {
    LParen,
    RParen,
    Quote,
    /// decoded string contents
    Str(Buf),
    /// a number, atom or dot, classified by the parser
    Text(Buf),
}

pub struct Reader<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(src: &'a [u8]) -> Self {
        Reader { src, pos: 0 }
    }

    fn see(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.see();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    /// Skip whitespace and `;` comments, then cut one token.
    /// `None` means the input is cleanly exhausted.
    fn scan(&mut self) -> Result<Option<Token>, ReadError> {
        loop {
            match self.see() {
                None => return Ok(None),
                Some(c) if c <= b' ' => {
                    self.bump();
                }
                Some(b';') => {
                    while let Some(c) = self.bump() {
                        if c == b'\n' {
                            break;
                        }
                    }
                }
                Some(_) => break,
            }
        }
        let tok = match self.see().unwrap() {
            b'(' => {
                self.bump();
                Token::LParen
            }
            b')' => {
                self.bump();
                Token::RParen
            }
            b'\'' => {
                self.bump();
                Token::Quote
            }
            b'"' => {
                self.bump();
                Token::Str(self.scan_string()?)
            }
            _ => {
                let mut buf = Buf::new();
                while let Some(c) = self.see() {
                    if c <= b' ' || matches!(c, b'(' | b')' | b'\'' | b'"') {
                        break;
                    }
                    buf.push(c);
                    self.bump();
                }
                Token::Text(buf)
            }
        };
        Ok(Some(tok))
    }

    /// Contents of a `"`-delimited string; the opening quote is already
    /// consumed. Strings do not span lines.
    fn scan_string(&mut self) -> Result<Buf, ReadError> {
        let mut out = Buf::new();
        loop {
            match self.see() {
                None => return Err(ReadError::Incomplete),
                Some(b'"') => {
                    self.bump();
                    return Ok(out);
                }
                Some(b'\n') => return Err(ReadError::Bad("missing \"")),
                Some(b'\\') => {
                    self.bump();
                    let c = self.see().ok_or(ReadError::Incomplete)?;
                    self.bump();
                    out.push(unescape(c));
                }
                Some(c) => {
                    self.bump();
                    out.push(c);
                }
            }
        }
    }

    /// Parse one expression, or `None` at clean end of input.
    pub fn read(&mut self, it: &mut Interp) -> Result<Option<Value>, ReadError> {
        match self.scan()? {
            None => Ok(None),
            Some(t) => self.parse(it, t).map(Some),
        }
    }

    fn read_required(&mut self, it: &mut Interp) -> Result<Value, ReadError> {
        match self.scan()? {
            None => Err(ReadError::Incomplete),
            Some(t) => self.parse(it, t),
        }
    }

    fn parse(&mut self, it: &mut Interp, t: Token) -> Result<Value, ReadError> {
        match t {
            Token::LParen => self.parse_list(it),
            Token::RParen => Err(ReadError::Bad("unexpected )")),
            Token::Quote => {
                let x = self.read_required(it)?;
                let t = it.cons(x, Value::NIL)?;
                // "quote" is interned at construction, so this lookup
                // cannot allocate and t stays valid
                let q = it.atom(b"quote")?;
                Ok(it.cons(q, t)?)
            }
            Token::Str(s) => Ok(it.string(&s)?),
            Token::Text(b) => match parse_number(&b) {
                Some(n) => Ok(Value::number(n)),
                None => Ok(it.atom(&b)?),
            },
        }
    }

    /// `(` is consumed; read elements until `)`, with `.` introducing an
    /// explicit tail.
    fn parse_list(&mut self, it: &mut Interp) -> Result<Value, ReadError> {
        let head = it.push(Value::NIL)?;
        // cdr cell of the last pair, patched as the list grows
        let mut tail: Option<u32> = None;
        loop {
            let t = match self.scan()? {
                None => return Err(ReadError::Incomplete),
                Some(t) => t,
            };
            match t {
                Token::RParen => break,
                Token::Text(ref b) if b.as_slice() == b"." => {
                    let x = self.read_required(it)?;
                    match tail {
                        None => it.set_slot(head, x),
                        Some(c) => it.set_cell(c, x),
                    }
                    match self.scan()? {
                        Some(Token::RParen) => break,
                        Some(_) => return Err(ReadError::Bad("expecting )")),
                        None => return Err(ReadError::Incomplete),
                    }
                }
                t => {
                    let x = self.parse(it, t)?;
                    let p = it.cons(x, Value::NIL)?;
                    match tail {
                        None => it.set_slot(head, p),
                        Some(c) => it.set_cell(c, p),
                    }
                    tail = Some(p.ord() + 1);
                }
            }
        }
        Ok(it.pop())
    }
}

fn unescape(c: u8) -> u8 {
    match c {
        b'a' => 7,
        b'b' => 8,
        b't' => 9,
        b'n' => 10,
        b'v' => 11,
        b'f' => 12,
        b'r' => 13,
        other => other,
    }
}

/// A token is a number when the whole of it parses as an IEEE double,
/// including `inf`, `-inf`, `nan` and hex integers.
fn parse_number(tok: &[u8]) -> Option<f64> {
    let s = std::str::from_utf8(tok).ok()?;
    let (sign, digits) = match *s.as_bytes().first()? {
        b'-' => (-1.0, &s[1..]),
        b'+' => (1.0, &s[1..]),
        _ => (1.0, s),
    };
    if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        let v = u64::from_str_radix(hex, 16).ok()?;
        return Some(sign * v as f64);
    }
    s.parse::<f64>().ok()
}
