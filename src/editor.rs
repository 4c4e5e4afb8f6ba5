use crate::{
    diagnostics::Result,
    session::{PushOutcome, Session},
    value::Value,
};

/// The text side of an embedding editor widget. The console never renders
/// anything; it only needs to read what the user has written and what they
/// currently have selected.
pub trait EditorSurface {
    fn document_text(&self) -> String;
    /// Empty when nothing is selected.
    fn selection_text(&self) -> String;
}

/// The two ways an editor can ask for execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Feed the text line by line through the incremental evaluator, as if
    /// it had been typed at a prompt.
    Statement,
    /// Compile the text as one program and run it only if it all compiles.
    Program,
}

/// Glue between an editor surface and a session: picks the text (selection
/// if non-empty, else the whole document) and dispatches it to the right
/// evaluator. No evaluation logic lives here.
pub struct ConsoleBridge {
    session: Session,
}

impl ConsoleBridge {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn handle(&mut self, trigger: Trigger, surface: &dyn EditorSurface) -> Result<Value> {
        let selection = surface.selection_text();
        let text = if selection.is_empty() {
            surface.document_text()
        } else {
            selection
        };
        match trigger {
            Trigger::Statement => {
                let mut last = Value::unit();
                for line in text.lines() {
                    if let PushOutcome::Evaluated(value) = self.session.push(line)? {
                        last = value;
                    }
                }
                Ok(last)
            }
            Trigger::Program => self.session.run_batch(&text),
        }
    }
}
