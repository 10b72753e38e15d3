use rustyline::{error::ReadlineError, DefaultEditor};

use crate::{
    diagnostics::{MallowError, Result},
    runtime::{ExecutionContext, Interpreter},
};

pub struct Repl {
    interpreter: Interpreter,
}

impl Repl {
    pub fn new() -> Result<Self> {
        Self::with_context(ExecutionContext::default())
    }

    pub fn with_context(context: ExecutionContext) -> Result<Self> {
        Ok(Self {
            interpreter: Interpreter::with_context(context)?,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        let mut editor = DefaultEditor::new().map_err(|err| {
            MallowError::from(std::io::Error::new(std::io::ErrorKind::Other, err))
        })?;
        loop {
            match editor.readline("user> ") {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed == ":quit" || trimmed == ":exit" {
                        break;
                    }
                    if trimmed.is_empty() {
                        continue;
                    }
                    editor.add_history_entry(trimmed).ok();
                    match self.interpreter.rep(trimmed) {
                        Ok(output) => println!("{output}"),
                        Err(err) if err.is_empty_input() => {}
                        Err(MallowError::Diagnostic(diag)) => {
                            eprintln!("{:?}: {}", diag.kind, diag.message);
                        }
                        Err(other) => eprintln!("error: {other}"),
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => {
                    return Err(MallowError::from(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        err,
                    )));
                }
            }
        }
        Ok(())
    }
}
