use rustyline::{error::ReadlineError, DefaultEditor};

use crate::{
    diagnostics::{OleanderError, Result},
    session::{PushOutcome, Session},
};

const PROMPT: &str = ">> ";
const CONTINUATION: &str = ".. ";

/// Terminal front end over a session's incremental evaluator. The prompt
/// switches to `..` while a statement is still accumulating, and `:reset`
/// throws a half-entered statement away.
pub struct Repl {
    session: Session,
}

impl Repl {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut editor = DefaultEditor::new().map_err(readline_error)?;
        println!(
            "oleander {} (:quit to leave, :reset to discard pending input, :names to list bindings)",
            env!("CARGO_PKG_VERSION")
        );
        loop {
            let prompt = if self.session.has_pending() {
                CONTINUATION
            } else {
                PROMPT
            };
            match editor.readline(prompt) {
                Ok(line) => {
                    match line.trim() {
                        ":quit" | ":exit" => break,
                        ":reset" => {
                            self.session.reset_pending();
                            continue;
                        }
                        ":names" => {
                            let names = self.session.namespace().borrow().names();
                            println!("{}", names.join(" "));
                            continue;
                        }
                        "" if !self.session.has_pending() => continue,
                        _ => {}
                    }
                    editor.add_history_entry(&line).ok();
                    match self.session.push(&line) {
                        Ok(PushOutcome::Evaluated(value)) => {
                            if !value.is_unit() {
                                println!("{value}");
                            }
                        }
                        Ok(PushOutcome::Pending) => {}
                        Err(OleanderError::Diagnostic(diag)) => eprintln!("{diag}"),
                        Err(other) => eprintln!("error: {other}"),
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => return Err(readline_error(err)),
            }
        }
        Ok(())
    }
}

fn readline_error(err: ReadlineError) -> OleanderError {
    OleanderError::from(std::io::Error::new(std::io::ErrorKind::Other, err))
}
