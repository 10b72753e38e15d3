use std::path::PathBuf;

use clap::{Parser, Subcommand};

use mallow::{ExecutionContext, Interpreter, MallowError, Repl};

#[derive(Parser)]
#[command(author, version, about = "Mallow Lisp interpreter")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a script file, binding any trailing arguments to *ARGV*
    Run {
        script: PathBuf,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Start an interactive REPL session
    Repl,
    /// Evaluate a single form and print the result
    Eval { source: String },
}

fn main() -> Result<(), MallowError> {
    let args = Args::parse();
    match args.command.unwrap_or(Command::Repl) {
        Command::Run { script, args } => run_script(script, args),
        Command::Repl => {
            let mut repl = Repl::new()?;
            repl.run()
        }
        Command::Eval { source } => {
            let mut interpreter = Interpreter::new()?;
            println!("{}", interpreter.rep(&source)?);
            Ok(())
        }
    }
}

fn run_script(path: PathBuf, argv: Vec<String>) -> Result<(), MallowError> {
    let mut interpreter = Interpreter::with_context(ExecutionContext { argv })?;
    interpreter.load_file(&path)?;
    Ok(())
}
