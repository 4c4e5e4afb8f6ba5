//! Oleander embeds a live-scripting console into a running application:
//! one persistent namespace per session, fed either line by line (shell
//! style) or as whole programs, with deterministic bootstrap from the
//! host's module registry and an optional startup script.

pub mod ast;
pub mod diagnostics;
pub mod editor;
pub mod lexer;
pub mod namespace;
pub mod parser;
pub mod repl;
pub mod runtime;
pub mod session;
pub mod stdlib;
pub mod value;

pub use diagnostics::{Diagnostic, DiagnosticKind, OleanderError, Result, SourceSpan};
pub use editor::{ConsoleBridge, EditorSurface, Trigger};
pub use repl::Repl;
pub use session::{
    ModuleRegistry, PushOutcome, Session, StaticRegistry, HOST_BINDING, SCRIPT_PATH_BINDING,
    STARTUP_ENV_VAR,
};
pub use value::Value;
