use rustyline::error::ReadlineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplError {
    #[error("readline error: {0}")]
    Readline(#[from] ReadlineError),
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),
}
