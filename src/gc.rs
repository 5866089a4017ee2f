//! Garbage collection
//!
//! Two stages. Stage one is a mark-sweep over the pair pool: the root set
//! is the global environment plus every cell on the stack; reachable
//! pairs are marked in a bit vector and everything else is rethreaded
//! onto the free list. Stage two compacts the atom/string heap: each
//! entry's reference field collects a linked list of the cells that point
//! at it (threaded through the cells' own ordinals, so no extra memory is
//! needed), then live entries are slid down and every referrer is patched
//! to the new offset.
//!
//! Two mark implementations are provided. The recursive one is the
//! obvious traversal. The pointer-reversal one reverses car/cdr pointers
//! as it descends and restores them on the way back up, using the parity
//! of the cell index to tell "came down through car" from "came down
//! through cdr"; it needs no native stack at all, so a collection can
//! succeed even under deep list nesting. Both produce identical mark
//! vectors and free lists.

use crate::error::{LiraError, Result};
use crate::interp::{Interp, MarkKind, REF_BYTES};
use crate::value::Value;

impl Interp {
    /// Collect. Returns the number of free cells in the pool, and fails
    /// with `out-of-memory` when nothing at all is free afterwards.
    pub fn gc(&mut self) -> Result<u32> {
        for w in self.used.iter_mut() {
            *w = 0;
        }
        if self.env.is_pair_ref() {
            self.mark(self.env.ord());
        }
        for i in self.sp..self.n_cells {
            let v = self.cell(i);
            if v.is_pair_ref() {
                self.mark(v.ord());
            }
        }
        let free = self.sweep();
        self.compact();
        if free == 0 {
            Err(LiraError::OutOfMemory)
        } else {
            Ok(free)
        }
    }

    fn mark(&mut self, i: u32) {
        match self.mark_kind {
            MarkKind::Recursive => self.mark_recursive(i),
            MarkKind::PointerReversal => self.mark_reversal(i),
        }
    }

    /// Recursive mark: recurse on car, iterate on cdr.
    fn mark_recursive(&mut self, mut i: u32) {
        while !self.pair_used(i) {
            self.set_pair_used(i);
            let car = self.cell(i);
            if car.is_pair_ref() {
                self.mark_recursive(car.ord());
            }
            let cdr = self.cell(i + 1);
            if !cdr.is_pair_ref() {
                break;
            }
            i = cdr.ord();
        }
    }

    /// Pointer-reversal mark. `j` is the cell we came down through (the
    /// sentinel N at the root); descending stores `j` into the traversed
    /// cell's ordinal, ascending restores it. An even `i` is a car cell,
    /// an odd `i` a cdr cell.
    fn mark_reversal(&mut self, root: u32) {
        let n = self.n_cells;
        let mut i = root;
        let mut j = n;
        if self.pair_used(i) {
            return;
        }
        while j < n || i & 1 == 0 {
            loop {
                // go down, marking car pairs before cdr pairs
                self.set_pair_used(i);
                let car = self.cell(i);
                let k = if car.is_pair_ref() && !self.pair_used(car.ord()) {
                    car.ord()
                } else {
                    i += 1;
                    let cdr = self.cell(i);
                    if cdr.is_pair_ref() && !self.pair_used(cdr.ord()) {
                        cdr.ord()
                    } else {
                        break;
                    }
                };
                let v = self.cell(i);
                self.set_cell(i, Value::pack(v.raw_tag(), j));
                j = i;
                i = k;
            }
            while j < n {
                // go back up through the reversed pointers
                let k = i;
                i = j;
                let v = self.cell(i);
                j = v.ord();
                self.set_cell(i, Value::pack(v.raw_tag(), k & !1));
                if i & 1 == 0 {
                    // back in a car cell: descend into its cdr next
                    break;
                }
            }
        }
    }

    /// Rebuild the free list from unmarked pairs; returns the number of
    /// free cells. Pair 0 stays off the list as the terminator sentinel.
    pub(crate) fn sweep(&mut self) -> u32 {
        self.fp = 0;
        let mut free = 0;
        for p in (1..self.pool_cells / 2).rev() {
            if self.used[(p / 32) as usize] & (1 << (p % 32)) == 0 {
                self.set_cell(2 * p, Value::pack(crate::value::TAG_NIL, self.fp));
                self.fp = 2 * p;
                free += 2;
            }
        }
        free
    }

    /// Prepend cell `i` to the referrer list of the heap entry it points
    /// at, threading the previous head through the cell's own ordinal.
    fn link(&mut self, i: u32) {
        let entry = self.cell(i).ord() - REF_BYTES;
        let k = self.heap_ref(entry);
        self.set_heap_ref(entry, i);
        let v = self.cell(i);
        self.set_cell(i, Value::pack(v.raw_tag(), k));
    }

    /// Compact the heap: clear reference fields, link every live Atom or
    /// String cell to its entry, then slide live entries down and patch
    /// their referrers. Dead entries vanish; live bytes are unchanged.
    pub(crate) fn compact(&mut self) {
        let h = 8 * self.pool_cells;
        let n = self.n_cells;
        let mut i = h;
        while i < self.hp {
            self.set_heap_ref(i, n);
            i += self.text_len(i + REF_BYTES) + REF_BYTES + 1;
        }
        for c in 0..self.pool_cells {
            if self.pair_used(c) && self.cell(c).is_text() {
                self.link(c);
            }
        }
        for c in self.sp..self.n_cells {
            if self.cell(c).is_text() {
                self.link(c);
            }
        }
        let end = self.hp;
        let mut i = h;
        self.hp = h;
        while i < end {
            let head = self.heap_ref(i);
            let size = self.text_len(i + REF_BYTES) + REF_BYTES + 1;
            if head < n {
                let mut k = head;
                while k < n {
                    let v = self.cell(k);
                    k = {
                        let next = v.ord();
                        self.set_cell(k, Value::pack(v.raw_tag(), self.hp + REF_BYTES));
                        next
                    };
                }
                if self.hp < i {
                    for b in 0..size {
                        let byte = self.heap_u8(i + b);
                        self.set_heap_u8(self.hp + b, byte);
                    }
                }
                self.hp += size;
            }
            i += size;
        }
    }
}
