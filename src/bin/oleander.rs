use std::{fs, path::PathBuf};

use clap::{Parser, Subcommand};
use indexmap::IndexMap;

use oleander::{OleanderError, Repl, Session, Value};

#[derive(Parser)]
#[command(author, version, about = "Oleander live-scripting console")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a script file through the batch path
    Run { script: PathBuf },
    /// Start an interactive session
    Repl,
    /// Evaluate a snippet and print its value
    Eval { source: String },
}

fn main() -> Result<(), OleanderError> {
    env_logger::init();
    match Args::parse().command.unwrap_or(Command::Repl) {
        Command::Run { script } => {
            let source = fs::read_to_string(&script)?;
            let mut session = Session::new(cli_host_api());
            session.run_batch(&source)?;
            Ok(())
        }
        Command::Repl => Repl::new(Session::new(cli_host_api())).run(),
        Command::Eval { source } => {
            let mut session = Session::new(cli_host_api());
            let value = session.run_batch(&source)?;
            if !value.is_unit() {
                println!("{value}");
            }
            Ok(())
        }
    }
}

/// The standalone binary has no embedding application, so the `host`
/// binding is a small description of the console itself.
fn cli_host_api() -> Value {
    let mut exports = IndexMap::new();
    exports.insert("name".into(), Value::string("oleander"));
    exports.insert(
        "version".into(),
        Value::string(env!("CARGO_PKG_VERSION")),
    );
    Value::module("host", exports)
}
