// Primitive contracts: equality, ordering, type codes, string
// construction and the mutation primitives.

use lira::{Interp, LiraError};

fn run(it: &mut Interp, src: &str) -> String {
    let v = it
        .eval_str(src)
        .unwrap_or_else(|e| panic!("{:?} evaluating {}", e, src))
        .expect("no value");
    it.print_str(v)
}

#[test]
fn eq_is_bit_equality() {
    let mut it = Interp::new();
    assert_eq!(run(&mut it, "(eq? 'foo 'foo)"), "#t");
    assert_eq!(run(&mut it, "(eq? 'foo 'bar)"), "()");
    assert_eq!(run(&mut it, "(eq? 1 1)"), "#t");
    assert_eq!(run(&mut it, "(eq? 1 2)"), "()");
    // numbers compare by bit pattern
    assert_eq!(run(&mut it, "(eq? 0.0 -0.0)"), "()");
    // two equal lists are different pairs
    assert_eq!(run(&mut it, "(eq? '(1) '(1))"), "()");
    assert_eq!(run(&mut it, "((lambda (x) (eq? x x)) '(1))"), "#t");
}

#[test]
fn eq_refines_strings_by_content() {
    let mut it = Interp::new();
    assert_eq!(run(&mut it, "(eq? \"abc\" \"abc\")"), "#t");
    assert_eq!(run(&mut it, "(eq? \"abc\" \"abd\")"), "()");
    // but an atom and a string with the same bytes stay different
    assert_eq!(run(&mut it, "(eq? 'abc \"abc\")"), "()");
}

#[test]
fn ordering() {
    let mut it = Interp::new();
    assert_eq!(run(&mut it, "(< 1 2)"), "#t");
    assert_eq!(run(&mut it, "(< 2 1)"), "()");
    assert_eq!(run(&mut it, "(< -inf inf)"), "#t");
    assert_eq!(run(&mut it, "(< \"abc\" \"abd\")"), "#t");
    assert_eq!(run(&mut it, "(< \"abd\" \"abc\")"), "()");
    assert_eq!(run(&mut it, "(< 'aa 'ab)"), "#t");
    assert_eq!(run(&mut it, "(< \"ab\" \"abc\")"), "#t");
    // mixed kinds fall back to a total order over the encodings
    assert_eq!(run(&mut it, "(< 'x \"x\")"), "#t");
}

#[test]
fn type_codes() {
    let mut it = Interp::new();
    assert_eq!(run(&mut it, "(type ())"), "-1");
    assert_eq!(run(&mut it, "(type 1.5)"), "0");
    assert_eq!(run(&mut it, "(type car)"), "1");
    assert_eq!(run(&mut it, "(type 'a)"), "2");
    assert_eq!(run(&mut it, "(type \"s\")"), "3");
    assert_eq!(run(&mut it, "(type '(1))"), "4");
    assert_eq!(run(&mut it, "(type (lambda (x) x))"), "6");
    assert_eq!(run(&mut it, "(type (macro (x) x))"), "7");
}

#[test]
fn string_concatenation() {
    let mut it = Interp::new();
    assert_eq!(
        run(&mut it, "(string 'hello \" \" \"world\")"),
        "\"hello world\""
    );
    assert_eq!(run(&mut it, "(string \"n=\" 42)"), "\"n=42\"");
    // a list contributes one byte per element
    assert_eq!(run(&mut it, "(string '(104 105))"), "\"hi\"");
    assert_eq!(run(&mut it, "(string)"), "\"\"");
}

#[test]
fn string_results_are_fresh() {
    let mut it = Interp::new();
    assert_eq!(run(&mut it, "(eq? (string 'ab) (string 'ab))"), "#t");
    assert_eq!(run(&mut it, "(type (string 'ab))"), "3");
}

#[test]
fn int_truncates_toward_zero() {
    let mut it = Interp::new();
    assert_eq!(run(&mut it, "(int 2.9)"), "2");
    assert_eq!(run(&mut it, "(int -2.9)"), "-2");
    assert_eq!(run(&mut it, "(int 5)"), "5");
    // out of the exact range, the value passes through
    assert_eq!(run(&mut it, "(int 1e300)"), "1e300");
    assert_eq!(run(&mut it, "(int inf)"), "inf");
}

#[test]
fn arithmetic_wants_numbers() {
    let mut it = Interp::new();
    assert_eq!(it.eval_str("(+ 1 'a)"), Err(LiraError::BadArguments));
    assert_eq!(it.eval_str("(* \"x\" 2)"), Err(LiraError::BadArguments));
    assert_eq!(it.eval_str("(throw 'x)"), Err(LiraError::BadArguments));
}

#[test]
fn ieee_division() {
    let mut it = Interp::new();
    assert_eq!(run(&mut it, "(/ 1 0)"), "inf");
    assert_eq!(run(&mut it, "(/ -1 0)"), "-inf");
    assert_eq!(run(&mut it, "(/ 0 0)"), "nan");
}

#[test]
fn pair_kind_is_strict() {
    let mut it = Interp::new();
    assert_eq!(it.eval_str("(car 5)"), Err(LiraError::NotAPair));
    assert_eq!(it.eval_str("(cdr \"s\")"), Err(LiraError::NotAPair));
    assert_eq!(it.eval_str("(set-car! 5 1)"), Err(LiraError::NotAPair));
    assert_eq!(it.eval_str("(set-cdr! 'a 1)"), Err(LiraError::NotAPair));
    // closures are pairs inside, but not for the mutators
    assert_eq!(
        it.eval_str("(set-car! (lambda (x) x) 1)"),
        Err(LiraError::NotAPair)
    );
}

#[test]
fn mutating_pairs_in_place() {
    let mut it = Interp::new();
    it.eval_str("(define p (cons 1 2))").unwrap();
    assert_eq!(run(&mut it, "(set-car! p 9)"), "9");
    assert_eq!(run(&mut it, "p"), "(9 . 2)");
    assert_eq!(run(&mut it, "(set-cdr! p ())"), "()");
    assert_eq!(run(&mut it, "p"), "(9)");
    // shared structure observes the mutation
    it.eval_str("(define q (cons 0 p))").unwrap();
    it.eval_str("(set-car! p 1)").unwrap();
    assert_eq!(run(&mut it, "q"), "(0 1)");
}

#[test]
fn print_and_write_reach_the_output_sink() {
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct Sink(Arc<Mutex<Vec<u8>>>);
    impl std::io::Write for Sink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let sink = Sink(Arc::new(Mutex::new(Vec::new())));
    let mut it = Interp::new();
    it.set_out(Box::new(sink.clone()));
    it.eval_str("(print \"a\" 'b 3)").unwrap();
    it.eval_str("(write \"a\" 'b)").unwrap();
    it.eval_str("(println)").unwrap();
    let got = sink.0.lock().unwrap().clone();
    assert_eq!(String::from_utf8_lossy(&got), "\"a\"b3ab\n");
}

#[test]
fn extension_primitives_participate_fully() {
    use lira::{Mode, Slot, Value};

    fn f_len(it: &mut Interp, t: Value, _e: Slot) -> Result<Value, LiraError> {
        let mut l = it.car(t)?;
        let mut n = 0.0;
        while !l.is_nil() {
            n += 1.0;
            l = it.cdr(l)?;
        }
        Ok(Value::number(n))
    }

    let mut it = Interp::builder()
        .primitive("length", Mode::NORMAL, f_len)
        .build()
        .unwrap();
    assert_eq!(run(&mut it, "(length '(a b c))"), "3");
    // visible in the environment and printable like any primitive
    assert_eq!(run(&mut it, "(type length)"), "1");
}
