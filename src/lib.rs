//! # Lira - a region-allocated Lisp interpreter
//!
//! Lira is a small Lisp whose runtime lives in a single fixed-size memory
//! region, partitioned at construction into a cons-pair pool, an
//! atom/string heap and a value stack. Pairs are reclaimed by a
//! mark-sweep collector (with a non-recursive pointer-reversal mark
//! variant), atoms and strings by a compacting collector. The evaluator
//! has proper tail calls, lexical closures, macros and recoverable
//! errors.
//!
//! ## Quick start
//!
//! ```
//! use lira::Interp;
//!
//! let mut it = Interp::new();
//! let v = it.eval_str("(+ 1 2 3)").unwrap().unwrap();
//! assert_eq!(it.print_str(v), "6");
//!
//! it.eval_str("(define sq (lambda (n) (* n n)))").unwrap();
//! let v = it.eval_str("(sq 7)").unwrap().unwrap();
//! assert_eq!(it.print_str(v), "49");
//! ```
//!
//! ## Architecture
//!
//! - **value** - NaN-boxed 64-bit values: a tag in the high bits of a
//!   quiet NaN, an ordinal in the low bits; numbers are just doubles
//! - **memory** - the cell array, pair-pool free list, byte-addressed
//!   heap and downward-growing root stack
//! - **gc** - mark-sweep of the pool plus relink-then-move compaction of
//!   the heap
//! - **reader** / **printer** - S-expression text in and out
//! - **eval** - the tail-call-optimized step loop
//! - **prim** - the primitive table with NORMAL/SPECIAL/TAILCALL modes
//!
//! Embedders can size the region, register extension primitives and
//! drive the interpreter through [`Interp`]; see [`Interp::builder`].

pub mod env;
pub mod error;
pub mod eval;
pub mod gc;
pub mod interp;
pub mod memory;
pub mod prim;
pub mod printer;
pub mod reader;
pub mod repl;
pub mod value;

pub use error::{LiraError, Result};
pub use interp::{Builder, Interp, MarkKind, Slot};
pub use prim::{Mode, PrimFn, Primitive};
pub use reader::{ReadError, Reader};
pub use value::{Tag, Value};
