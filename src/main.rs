use std::sync::atomic::{AtomicBool, Ordering};

use rustyline::error::ReadlineError;

use lira::reader::{ReadError, Reader};
use lira::repl::Repl;
use lira::{Interp, LiraError, Mode, Slot, Tag, Value};

/// Set by the SIGINT handler, polled by the evaluator at the top of
/// every step; a collection in progress never observes it.
static INTERRUPT: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigint(_: libc::c_int) {
    INTERRUPT.store(true, Ordering::Relaxed);
}

/// (read) - parse one expression from the next line of standard input.
fn prim_read(it: &mut Interp, _t: Value, _e: Slot) -> Result<Value, LiraError> {
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).is_err() {
        return Err(LiraError::Syntax);
    }
    Ok(it.read_str(&line)?.unwrap_or(Value::NIL))
}

/// (load name) - read a file and evaluate every form in it. Registered
/// through the extension registry; file I/O stays out of the core.
fn prim_load(it: &mut Interp, t: Value, _e: Slot) -> Result<Value, LiraError> {
    let x = it.car(t)?;
    if !matches!(x.tag(), Tag::Atom | Tag::String) {
        return Err(LiraError::BadArguments);
    }
    let path = String::from_utf8_lossy(&it.text_of(x).unwrap_or_default()).into_owned();
    let src = std::fs::read(&path).map_err(|_| LiraError::BadArguments)?;
    Ok(it.eval_source(&src)?.unwrap_or(Value::NIL))
}

/// Evaluate every form in `src`, printing each result. `Ok(false)` asks
/// the caller for more input to finish an expression. Forms are all
/// parsed (and protected) before the first one runs, so a continuation
/// line never re-runs the side effects of an earlier form.
fn run_source(it: &mut Interp, src: &str) -> Result<bool, LiraError> {
    let wm = it.watermark();
    let mut reader = Reader::new(src.as_bytes());
    let mut forms = Vec::new();
    loop {
        match reader.read(it) {
            Ok(None) => break,
            Ok(Some(v)) => match it.push(v) {
                Ok(slot) => forms.push(slot),
                Err(e) => {
                    it.unwind(wm);
                    eprintln!("ERR {} {}", e.code(), e);
                    return Ok(true);
                }
            },
            Err(ReadError::Incomplete) => {
                it.unwind(wm);
                return Ok(false);
            }
            Err(e) => {
                it.unwind(wm);
                let e = LiraError::from(e);
                eprintln!("ERR {} {}", e.code(), e);
                return Ok(true);
            }
        }
    }
    for slot in forms {
        match it.eval(it.slot(slot), it.global_env()) {
            Ok(v) => println!("{}", it.print_str(v)),
            Err(LiraError::Quit) => return Err(LiraError::Quit),
            Err(e) => {
                eprintln!("ERR {} {}", e.code(), e);
                break;
            }
        }
    }
    it.unwind(wm);
    Ok(true)
}

fn main() {
    let mut it = Interp::builder()
        .primitive("load", Mode::NORMAL, prim_load)
        .primitive("read", Mode::NORMAL, prim_read)
        .build()
        .expect("interpreter construction");
    it.set_interrupt_source(&INTERRUPT);
    unsafe {
        libc::signal(libc::SIGINT, on_sigint as libc::sighandler_t);
    }

    // an explicit startup file, or init.lisp when present
    let startup = std::env::args().nth(1).unwrap_or_else(|| "init.lisp".to_string());
    if let Ok(src) = std::fs::read(&startup) {
        match it.eval_source(&src) {
            Ok(_) => {}
            Err(LiraError::Quit) => return,
            Err(e) => eprintln!("ERR {} {} (loading {})", e.code(), e, startup),
        }
    }

    let mut repl = match Repl::new() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("readline: {}", e);
            std::process::exit(1);
        }
    };

    loop {
        it.unwind_all();
        let free = it.gc().unwrap_or(0);
        let prompt = format!("{}+{}>", free, it.free_cells());
        let mut input = match repl.read_line(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(_) => break,
        };
        // keep reading lines until the expression is complete
        loop {
            match run_source(&mut it, &input) {
                Ok(true) => break,
                Ok(false) => match repl.read_line("?") {
                    Ok(line) => {
                        input.push('\n');
                        input.push_str(&line);
                    }
                    Err(_) => break,
                },
                Err(_) => {
                    repl.add_history(&input);
                    repl.finalize();
                    println!("Bye!");
                    return;
                }
            }
        }
        repl.add_history(&input);
    }
    repl.finalize();
}
