// Property tests: NaN-box roundtrips, print/read identity, interning
// insensitivity to order, and equivalence of the two mark
// implementations on arbitrary object graphs.

use lira::{Interp, MarkKind, Tag, Value};
use proptest::prelude::*;

// =========================================================================
// Strategies
// =========================================================================

/// An abstract tree that can be realized inside any interpreter and
/// compared structurally after a round trip.
#[derive(Debug, Clone)]
enum Form {
    Num(f64),
    Atom(String),
    Str(String),
    List(Vec<Form>, Option<Box<Form>>),
}

/// Atom spellings that cannot be mistaken for numbers or dots.
fn arb_atom_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9?!*<>=-]{0,11}"
        .prop_filter("number-like names read as numbers", |s| {
            !matches!(s.as_str(), "inf" | "nan")
        })
}

fn arb_string_contents() -> impl Strategy<Value = String> {
    // printable ASCII plus the escapable controls
    proptest::collection::vec(
        prop_oneof![
            10 => (0x20u8..0x7f).prop_map(|b| b as char),
            1 => prop_oneof![Just('\t'), Just('\n'), Just('\r'), Just('"'), Just('\\')],
        ],
        0..24,
    )
    .prop_map(|cs| cs.into_iter().collect())
}

fn arb_number() -> impl Strategy<Value = f64> {
    prop_oneof![
        10 => prop::num::f64::NORMAL,
        5 => (-1_000_000i64..1_000_000).prop_map(|n| n as f64),
        1 => Just(0.0),
        1 => Just(-0.0),
        1 => Just(f64::INFINITY),
        1 => Just(f64::NEG_INFINITY),
    ]
}

fn arb_form(depth: u32) -> BoxedStrategy<Form> {
    if depth == 0 {
        prop_oneof![
            4 => arb_number().prop_map(Form::Num),
            3 => arb_atom_name().prop_map(Form::Atom),
            3 => arb_string_contents().prop_map(Form::Str),
        ]
        .boxed()
    } else {
        let leaf = arb_form(0);
        let inner = arb_form(depth - 1);
        prop_oneof![
            6 => leaf.clone(),
            3 => (proptest::collection::vec(inner.clone(), 0..5))
                .prop_map(|items| Form::List(items, None)),
            1 => (proptest::collection::vec(inner, 1..4), leaf)
                .prop_map(|(items, tail)| Form::List(items, Some(Box::new(tail)))),
        ]
        .boxed()
    }
}

/// Build the form in the interpreter, protected on the stack.
fn realize(it: &mut Interp, f: &Form) -> Value {
    match f {
        Form::Num(n) => Value::number(*n),
        Form::Atom(s) => it.atom(s.as_bytes()).unwrap(),
        Form::Str(s) => it.string(s.as_bytes()).unwrap(),
        Form::List(items, tail) => {
            let tail_v = match tail {
                Some(t) => realize(it, t),
                None => Value::NIL,
            };
            let slot = it.push(tail_v).unwrap();
            for item in items.iter().rev() {
                let v = realize(it, item);
                let acc = it.slot(slot);
                let p = it.cons(v, acc).unwrap();
                it.set_slot(slot, p);
            }
            it.pop()
        }
    }
}

/// Structural equality: bit equality except strings, which compare by
/// content (fresh reads never share a string ordinal).
fn value_eq(it: &Interp, a: Value, b: Value) -> bool {
    if a.tag() != b.tag() {
        return false;
    }
    match a.tag() {
        Tag::String => it.text_of(a) == it.text_of(b),
        Tag::Cons => {
            value_eq(it, it.car(a).unwrap(), it.car(b).unwrap())
                && value_eq(it, it.cdr(a).unwrap(), it.cdr(b).unwrap())
        }
        _ => a == b,
    }
}

// =========================================================================
// NaN-boxing
// =========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn number_roundtrip(n in arb_number()) {
        let v = Value::number(n);
        prop_assert_eq!(v.tag(), Tag::Number);
        prop_assert_eq!(v.as_number().unwrap().to_bits(), n.to_bits());
    }

    #[test]
    fn ordinal_roundtrip(ord in 0u32..=u32::MAX) {
        use lira::value::{TAG_ATOM, TAG_CONS, TAG_STRG};
        for tag in [TAG_ATOM, TAG_STRG, TAG_CONS] {
            let v = Value::pack(tag, ord);
            prop_assert_eq!(v.ord(), ord);
            prop_assert_eq!(v.as_number(), None);
            prop_assert!(!v.is_nil());
        }
    }

    #[test]
    fn tags_discriminate(ord in 0u32..1000) {
        use lira::value::{TAG_ATOM, TAG_CLOS, TAG_CONS, TAG_MACR, TAG_PRIM, TAG_STRG};
        let kinds = [
            (TAG_PRIM, Tag::Primitive),
            (TAG_ATOM, Tag::Atom),
            (TAG_STRG, Tag::String),
            (TAG_CONS, Tag::Cons),
            (TAG_CLOS, Tag::Closure),
            (TAG_MACR, Tag::Macro),
        ];
        for (raw, kind) in kinds {
            prop_assert_eq!(Value::pack(raw, ord).tag(), kind);
        }
    }
}

// =========================================================================
// Printer/reader round trip
// =========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn print_then_read_is_identity(form in arb_form(3)) {
        let mut it = Interp::new();
        let v = realize(&mut it, &form);
        let keep = it.push(v).unwrap();
        let text = it.print_str(v);
        let back = it.read_str(&text).unwrap().unwrap();
        let v = it.slot(keep);
        prop_assert!(
            value_eq(&it, v, back),
            "round trip through {:?} failed", text
        );
    }

    #[test]
    fn atom_interning_ignores_insertion_order(names in proptest::collection::vec(arb_atom_name(), 1..16)) {
        let mut it = Interp::new();
        let first: Vec<Value> = names.iter().map(|n| it.atom(n.as_bytes()).unwrap()).collect();
        let again: Vec<Value> = names.iter().rev().map(|n| it.atom(n.as_bytes()).unwrap()).collect();
        for (v, n) in first.iter().zip(names.iter()) {
            prop_assert_eq!(it.text_of(*v).unwrap(), n.as_bytes());
        }
        for (a, b) in first.iter().zip(again.iter().rev()) {
            prop_assert_eq!(a, b);
        }
    }
}

// =========================================================================
// Mark equivalence and idempotence
// =========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn mark_implementations_are_equivalent(form in arb_form(3), share in 0usize..4) {
        let mut snaps = Vec::new();
        for kind in [MarkKind::Recursive, MarkKind::PointerReversal] {
            let mut it = Interp::builder().mark_kind(kind).build().unwrap();
            let v = realize(&mut it, &form);
            let root = it.push(v).unwrap();
            // add aliasing so subtrees are reached twice
            let v = it.slot(root);
            for _ in 0..share {
                let aliased = it.cons(v, v).unwrap();
                let r = it.slot(root);
                let p = it.cons(aliased, r).unwrap();
                it.set_slot(root, p);
            }
            it.gc().unwrap();
            snaps.push((it.free_list(), it.marked_pairs(), it.heap_used()));
        }
        prop_assert_eq!(&snaps[0], &snaps[1]);
    }

    #[test]
    fn gc_without_allocation_is_idempotent(form in arb_form(2)) {
        let mut it = Interp::new();
        let v = realize(&mut it, &form);
        it.push(v).unwrap();
        it.gc().unwrap();
        let first = (it.free_list(), it.marked_pairs(), it.heap_used(), it.free_cells());
        it.gc().unwrap();
        let second = (it.free_list(), it.marked_pairs(), it.heap_used(), it.free_cells());
        prop_assert_eq!(first, second);
    }
}

// =========================================================================
// Evaluated round trips
// =========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn quoting_any_form_evaluates_to_it(form in arb_form(2)) {
        let mut it = Interp::new();
        let v = realize(&mut it, &form);
        let keep = it.push(v).unwrap();
        let text = format!("'{}", it.print_str(v));
        // strings at the head of a form would be applied, so only quote
        let r = it.eval_str(&text).unwrap().unwrap();
        let v = it.slot(keep);
        prop_assert!(value_eq(&it, v, r));
    }

    #[test]
    fn addition_matches_host_arithmetic(xs in proptest::collection::vec(-1000i64..1000, 1..8)) {
        let mut it = Interp::new();
        let body = xs.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(" ");
        let v = it.eval_str(&format!("(+ {})", body)).unwrap().unwrap();
        let expect: f64 = xs.iter().map(|n| *n as f64).sum();
        prop_assert_eq!(v.as_number(), Some(expect));
    }
}
