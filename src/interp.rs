//! The interpreter instance
//!
//! All interpreter state - the cell array, the pair-pool free list, the
//! atom/string heap, the stack, the global environment and the primitive
//! table - lives in one `Interp` value. Two instances are fully
//! independent; nothing is process-global.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use rustc_hash::FxHashMap;

use crate::error::{LiraError, Result};
use crate::prim::{core_table, Mode, PrimFn, Primitive};
use crate::reader::Reader;
use crate::value::{Value, TAG_PRIM};

/// Default pair-pool size in cells (two cells per pair).
pub const DEFAULT_POOL: u32 = 8192;

/// Default cell count shared by the atom/string heap and the stack.
pub const DEFAULT_HEAP_STACK: u32 = 2048;

/// Width in bytes of the cell-reference field that prefixes every heap
/// entry; used by the compacting collector.
pub(crate) const REF_BYTES: u32 = 4;

/// Which mark implementation the collector runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkKind {
    /// recurses on car, iterates on cdr; native stack depth is O(depth)
    Recursive,
    /// pointer reversal; O(1) native stack
    PointerReversal,
}

/// Handle to a protected stack cell, returned by [`Interp::push`].
///
/// The cell stays valid until the stack is popped or unwound past it;
/// writing through a stale slot corrupts the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot(pub(crate) u32);

pub struct Interp {
    /// the single backing array: pool cells, then heap bytes, then stack
    pub(crate) cells: Box<[u64]>,
    /// P: number of cells in the pair pool
    pub(crate) pool_cells: u32,
    /// N = P + S: total cells
    pub(crate) n_cells: u32,
    /// head of the pair free list (cell index), 0 when empty
    pub(crate) fp: u32,
    /// heap pointer: first free byte above the live heap entries
    pub(crate) hp: u32,
    /// stack pointer: lowest occupied stack cell, N when empty
    pub(crate) sp: u32,
    /// mark bits, one per pair slot
    pub(crate) used: Box<[u32]>,
    pub(crate) mark_kind: MarkKind,
    /// the global environment list
    pub(crate) env: Value,
    /// the `#t` atom. Interned first, so it occupies the bottom heap
    /// entry, is permanently live through the global environment, and
    /// therefore never moves during compaction.
    pub(crate) tru: Value,
    pub(crate) prims: Vec<Primitive>,
    /// trace level: 0 off, nonzero prints every evaluation step
    pub(crate) tr: u32,
    pub(crate) out: Box<dyn Write>,
    pub(crate) interrupt: Option<&'static AtomicBool>,
}

/// Configures and constructs an [`Interp`].
///
/// Extension primitives registered here are appended to the core table;
/// registering a core name replaces that entry in place, so embedders can
/// override built-ins.
pub struct Builder {
    pool: u32,
    heap_stack: u32,
    mark_kind: MarkKind,
    extras: Vec<Primitive>,
}

impl Builder {
    /// Pair-pool size in cells. Must be even; pairs use two cells each.
    pub fn pool(mut self, cells: u32) -> Self {
        self.pool = cells;
        self
    }

    /// Cell count shared by the heap (growing up) and the stack
    /// (growing down).
    pub fn heap_stack(mut self, cells: u32) -> Self {
        self.heap_stack = cells;
        self
    }

    pub fn mark_kind(mut self, kind: MarkKind) -> Self {
        self.mark_kind = kind;
        self
    }

    /// Register an extension primitive.
    pub fn primitive(mut self, name: &str, mode: Mode, f: PrimFn) -> Self {
        self.extras.push(Primitive::new(name, mode, f));
        self
    }

    /// Build the interpreter: clear the pool, intern `#t`, and bind every
    /// primitive into the global environment.
    pub fn build(self) -> Result<Interp> {
        assert!(self.pool >= 4 && self.pool % 2 == 0, "pool must be even");
        assert!(self.heap_stack >= 64, "heap/stack too small");
        let n = self
            .pool
            .checked_add(self.heap_stack)
            .filter(|n| *n <= u32::MAX / 8)
            .expect("heap byte offsets must fit in 32 bits");

        let mut prims = core_table();
        let mut index: FxHashMap<Box<str>, usize> = prims
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name.clone(), i))
            .collect();
        for p in self.extras {
            match index.get(&p.name) {
                Some(&i) => prims[i] = p,
                None => {
                    index.insert(p.name.clone(), prims.len());
                    prims.push(p);
                }
            }
        }

        let pairs = self.pool / 2;
        let mut it = Interp {
            cells: vec![0u64; n as usize].into_boxed_slice(),
            pool_cells: self.pool,
            n_cells: n,
            fp: 0,
            hp: 8 * self.pool,
            sp: n,
            used: vec![0u32; ((pairs + 31) / 32) as usize].into_boxed_slice(),
            mark_kind: self.mark_kind,
            env: Value::NIL,
            tru: Value::NIL,
            prims,
            tr: 0,
            out: Box::new(io::stdout()),
            interrupt: None,
        };
        it.sweep();
        it.tru = it.atom(b"#t")?;
        it.env = it.pair(it.tru, it.tru, Value::NIL)?;
        let names: Vec<Vec<u8>> = it.prims.iter().map(|p| p.name.bytes().collect()).collect();
        for (i, name) in names.iter().enumerate() {
            let a = it.atom(name)?;
            it.env = it.pair(a, Value::pack(TAG_PRIM, i as u32), it.env)?;
        }
        Ok(it)
    }
}

impl Interp {
    /// An interpreter with the default pool and heap/stack sizes.
    ///
    /// Construction failures are fatal by design; use [`Interp::builder`]
    /// to observe them as a `Result`.
    pub fn new() -> Interp {
        Self::builder().build().expect("interpreter construction")
    }

    pub fn builder() -> Builder {
        Builder {
            pool: DEFAULT_POOL,
            heap_stack: DEFAULT_HEAP_STACK,
            mark_kind: MarkKind::PointerReversal,
            extras: Vec::new(),
        }
    }

    /// The current global environment list.
    pub fn global_env(&self) -> Value {
        self.env
    }

    /// The `#t` atom.
    pub fn t(&self) -> Value {
        self.tru
    }

    /// `#t` or `()` for a host boolean.
    pub fn bool_val(&self, b: bool) -> Value {
        if b {
            self.tru
        } else {
            Value::NIL
        }
    }

    /// Redirect `print`/`write` and trace output.
    pub fn set_out(&mut self, out: Box<dyn Write>) {
        self.out = out;
    }

    /// Install the flag an external interrupt source sets. The evaluator
    /// polls and clears it at the top of every step iteration - never
    /// inside the collector - and raises the `break` error.
    pub fn set_interrupt_source(&mut self, flag: &'static AtomicBool) {
        self.interrupt = Some(flag);
    }

    pub(crate) fn poll_interrupt(&self) -> Result<()> {
        if let Some(flag) = self.interrupt {
            if flag.swap(false, Ordering::Relaxed) {
                return Err(LiraError::Break);
            }
        }
        Ok(())
    }

    pub fn set_mark_kind(&mut self, kind: MarkKind) {
        self.mark_kind = kind;
    }

    /// Parse one expression from `src`, or `None` when it holds no more
    /// than whitespace and comments. The returned value is unprotected;
    /// push it before the next allocation.
    pub fn read_str(&mut self, src: &str) -> Result<Option<Value>> {
        let wm = self.sp;
        let mut r = Reader::new(src.as_bytes());
        match r.read(self) {
            Ok(v) => Ok(v),
            Err(e) => {
                self.unwind(wm);
                Err(e.into())
            }
        }
    }

    /// Read and evaluate every form in `src` against the global
    /// environment; the value of the last form is returned, `None` when
    /// `src` holds no forms. The stack is restored to its entry watermark.
    pub fn eval_str(&mut self, src: &str) -> Result<Option<Value>> {
        self.eval_source(src.as_bytes())
    }

    /// Byte-source variant of [`Interp::eval_str`].
    pub fn eval_source(&mut self, src: &[u8]) -> Result<Option<Value>> {
        let wm = self.sp;
        let res = self.eval_source_inner(src);
        self.unwind(wm);
        res
    }

    fn eval_source_inner(&mut self, src: &[u8]) -> Result<Option<Value>> {
        let mut reader = Reader::new(src);
        let expr = self.push(Value::NIL)?;
        let last = self.push(Value::NIL)?;
        let mut any = false;
        loop {
            match reader.read(self) {
                Ok(None) => break,
                Ok(Some(v)) => {
                    self.set_slot(expr, v);
                    let r = self.eval(v, self.env)?;
                    self.set_slot(last, r);
                    any = true;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(if any { Some(self.slot(last)) } else { None })
    }
}

impl Default for Interp {
    fn default() -> Self {
        Self::new()
    }
}
