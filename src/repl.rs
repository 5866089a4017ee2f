//! REPL line editing
//!
//! A thin wrapper over rustyline providing command history persisted to
//! disk. The actual read-eval-print loop lives in the binary.

use rustyline::{DefaultEditor, Result as RustylineResult};

const HISTORY_FILE: &str = ".lira_history";

/// REPL editor with readline support
pub struct Repl {
    editor: DefaultEditor,
}

impl Repl {
    pub fn new() -> RustylineResult<Self> {
        let mut editor = DefaultEditor::new()?;
        let _ = editor.load_history(&Self::history_file_path());
        Ok(Self { editor })
    }

    fn history_file_path() -> String {
        match std::env::var("HOME") {
            Ok(home) => format!("{}/{}", home, HISTORY_FILE),
            Err(_) => HISTORY_FILE.to_string(),
        }
    }

    /// Read a line from the user with readline support
    pub fn read_line(&mut self, prompt: &str) -> RustylineResult<String> {
        self.editor.readline(prompt)
    }

    pub fn add_history(&mut self, line: &str) {
        let _ = self.editor.add_history_entry(line);
    }

    /// Save history to disk
    pub fn finalize(&mut self) {
        let _ = self.editor.save_history(&Self::history_file_path());
    }
}
