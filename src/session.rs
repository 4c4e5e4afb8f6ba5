use std::env;
use std::fs;
use std::path::PathBuf;

use log::{debug, warn};

use crate::{
    ast::Program,
    diagnostics::Result,
    namespace::{Namespace, NamespaceRef},
    parser::{self, ParseOutcome},
    runtime::Interpreter,
    value::Value,
};

/// Name the host API object is always bound under.
pub const HOST_BINDING: &str = "host";

/// Environment variable consulted for the optional startup script.
pub const STARTUP_ENV_VAR: &str = "OLEANDER_STARTUP";

/// Transient binding that tells a running startup script where it lives.
/// Present only while the script executes; never survives bootstrap.
pub const SCRIPT_PATH_BINDING: &str = "__script_path__";

/// A source of alias → module bindings discovered by the host, pulled into
/// the namespace once at session creation. An `Err` is treated as "registry
/// unavailable": it is logged and contributes zero bindings.
pub trait ModuleRegistry {
    fn modules(&self) -> Result<Vec<(String, Value)>>;
}

/// What a single incremental line produced.
#[derive(Debug)]
pub enum PushOutcome {
    /// The accumulated statement became complete and was executed.
    Evaluated(Value),
    /// The statement is not finished yet; more lines are expected.
    Pending,
}

/// One live interpreter session: a persistent namespace, an accumulation
/// buffer for line-at-a-time input, and the host API binding. Everything
/// runs synchronously on the caller's thread; a long-running statement
/// simply blocks, which is the accepted trade for an in-process console.
pub struct Session {
    interpreter: Interpreter,
    pending: String,
}

impl Session {
    /// Bootstrap with no module registry and the startup script taken from
    /// the process environment.
    pub fn new(host_api: Value) -> Self {
        Self::bootstrap(host_api, None, env::var(STARTUP_ENV_VAR).ok())
    }

    /// Bootstrap with a registry and the startup script taken from the
    /// process environment.
    pub fn with_registry(host_api: Value, registry: &dyn ModuleRegistry) -> Self {
        Self::bootstrap(host_api, Some(registry), env::var(STARTUP_ENV_VAR).ok())
    }

    /// Fully explicit bootstrap. The fixed order is the contract:
    /// auto-imports first, then the host API binding (so it wins any name
    /// collision with an imported alias), then the startup script (which,
    /// running last, may override anything). Bootstrap itself never fails;
    /// a broken registry or startup script is logged and skipped.
    pub fn bootstrap(
        host_api: Value,
        registry: Option<&dyn ModuleRegistry>,
        startup_path: Option<String>,
    ) -> Self {
        let mut session = Self {
            interpreter: Interpreter::new(),
            pending: String::new(),
        };
        if let Some(registry) = registry {
            session.auto_import(registry);
        }
        Namespace::bind(session.namespace(), HOST_BINDING, host_api);
        if let Some(raw_path) = startup_path {
            session.load_startup(&raw_path);
        }
        session
    }

    /// The session namespace. Shared by reference: mutations made by
    /// executed code are immediately visible through this handle.
    pub fn namespace(&self) -> &NamespaceRef {
        self.interpreter.namespace()
    }

    /// Convenience lookup against the session namespace.
    pub fn get(&self, name: &str) -> Option<Value> {
        Namespace::lookup(self.namespace(), name)
    }

    /// Feed one line of source. Lines accumulate until they form a
    /// complete statement, which then executes immediately; a malformed
    /// buffer is discarded and reported; a runtime failure propagates to
    /// the caller untouched (the buffer is cleared either way).
    pub fn push(&mut self, line: &str) -> Result<PushOutcome> {
        self.pending.push_str(line);
        self.pending.push('\n');
        match parser::compile_interactive(&self.pending) {
            ParseOutcome::Complete(program) => {
                self.pending.clear();
                let value = self.interpreter.run(&program)?;
                Ok(PushOutcome::Evaluated(value))
            }
            ParseOutcome::Pending => Ok(PushOutcome::Pending),
            ParseOutcome::Invalid(diagnostic) => {
                self.pending.clear();
                Err(diagnostic.into())
            }
        }
    }

    /// True while `push` is waiting for more lines.
    pub fn has_pending(&self) -> bool {
        !self.pending.trim().is_empty()
    }

    /// Discard a half-entered statement without executing it.
    pub fn reset_pending(&mut self) {
        self.pending.clear();
    }

    /// Compile-then-execute a whole block of source as one program.
    /// Compilation is atomic: a syntax error anywhere means nothing runs.
    /// Execution is not: statements run in order and side effects made
    /// before a runtime failure stay.
    pub fn run_batch(&mut self, source: &str) -> Result<Value> {
        let program = parser::compile(source)?;
        self.execute(&program)
    }

    /// Execute an already-compiled program against the session namespace.
    pub fn execute(&mut self, program: &Program) -> Result<Value> {
        self.interpreter.run(program)
    }

    fn auto_import(&mut self, registry: &dyn ModuleRegistry) {
        let bindings = match registry.modules() {
            Ok(bindings) => bindings,
            Err(err) => {
                warn!("module registry unavailable, importing nothing: {err}");
                return;
            }
        };
        // Registry order is the host's business; on duplicate aliases the
        // last write wins.
        for (alias, module) in bindings {
            Namespace::bind(self.namespace(), &alias, module);
        }
    }

    fn load_startup(&mut self, raw_path: &str) {
        let Some(path) = resolve_startup_path(raw_path) else {
            debug!("startup script `{raw_path}` not found, skipping");
            return;
        };
        let source = match fs::read_to_string(&path) {
            Ok(source) => source,
            Err(err) => {
                warn!("could not read startup script `{}`: {err}", path.display());
                return;
            }
        };
        let program = match parser::compile(&source) {
            Ok(program) => program,
            Err(diagnostic) => {
                warn!(
                    "startup script `{}` failed to compile: {diagnostic}",
                    path.display()
                );
                return;
            }
        };
        debug!("running startup script `{}`", path.display());
        self.namespace().borrow_mut().define(
            SCRIPT_PATH_BINDING,
            Value::string(path.to_string_lossy().into_owned()),
        );
        let result = self.execute(&program);
        // The marker must not outlive the script, whether or not it ran
        // to completion.
        self.namespace().borrow_mut().remove(SCRIPT_PATH_BINDING);
        if let Err(err) = result {
            warn!("startup script `{}` failed: {err}", path.display());
        }
    }
}

/// Expand a leading `~`, make the path absolute, and require an existing
/// regular file. `None` means "nothing to run", which is never an error.
fn resolve_startup_path(raw: &str) -> Option<PathBuf> {
    if raw.trim().is_empty() {
        return None;
    }
    let expanded = if let Some(rest) = raw.strip_prefix("~/") {
        dirs::home_dir()?.join(rest)
    } else if raw == "~" {
        dirs::home_dir()?
    } else {
        PathBuf::from(raw)
    };
    let resolved = fs::canonicalize(&expanded).ok()?;
    resolved.is_file().then_some(resolved)
}

/// Registry backed by a fixed list, for hosts whose module set is known
/// up front (and for tests).
pub struct StaticRegistry {
    bindings: Vec<(String, Value)>,
}

impl StaticRegistry {
    pub fn new(bindings: Vec<(String, Value)>) -> Self {
        Self { bindings }
    }
}

impl ModuleRegistry for StaticRegistry {
    fn modules(&self) -> Result<Vec<(String, Value)>> {
        Ok(self.bindings.clone())
    }
}
