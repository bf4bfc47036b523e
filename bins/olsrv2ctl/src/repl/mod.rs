//! The REPL shell itself, grounded on `crates/vulcan-ctl/src/repl/mod.rs`'s
//! `Repl`/`Editor`-driven readline loop, extended to forward anything that
//! isn't a local command straight to the daemon's control socket.

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;

use rustyline::error::ReadlineError;
use rustyline::Editor;

mod command;
mod completer;
mod error;
mod helper;
mod hinter;
mod validator;

pub use command::*;
pub use completer::*;
pub use error::*;
pub use helper::*;
pub use hinter::*;
pub use validator::*;

pub struct Repl<'a> {
    commands: Vec<Command>,
    prompt: &'a str,
    stream: BufReader<UnixStream>,
    raw: UnixStream,
}

impl<'a> Repl<'a> {
    pub fn connect(prompt: &'a str, socket_path: &std::path::Path) -> Result<Self, ReplError> {
        let raw = UnixStream::connect(socket_path)?;
        let stream = BufReader::new(raw.try_clone()?);
        Ok(Self {
            commands: vec![],
            prompt,
            stream,
            raw,
        })
    }

    pub fn add_command(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn run(&mut self) -> Result<(), ReplError> {
        let names = self.commands.iter().map(|c| c.name().to_string()).collect();
        let mut editor = Editor::<ReplHelper>::new()?;
        editor.set_helper(Some(ReplHelper::new(names)));

        loop {
            match editor.readline(self.prompt) {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    editor.add_history_entry(line.as_str());
                    if self.process_input(&line)? {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                }
                Err(ReadlineError::Eof) => {
                    break;
                }
                Err(err) => {
                    println!("readline error: {err}");
                }
            }
        }
        Ok(())
    }

    /// Returns `Ok(true)` when the REPL should exit.
    fn process_input(&mut self, input: &str) -> Result<bool, ReplError> {
        let parts: Vec<String> = input.trim().split_whitespace().map(str::to_string).collect();
        let Some((first, rest)) = parts.split_first() else {
            return Ok(false);
        };

        if first == "quit" || first == "exit" {
            return Ok(true);
        }

        if let Some(command) = self.commands.iter().find(|c| c.name() == first) {
            match command.run(rest) {
                Ok(output) => println!("{output}"),
                Err(err) => println!("error: {err}"),
            }
            return Ok(false);
        }

        self.forward(input)?;
        Ok(false)
    }

    fn forward(&mut self, line: &str) -> Result<(), ReplError> {
        writeln!(self.raw, "{}", line.trim())?;
        loop {
            let mut buf = String::new();
            if self.stream.read_line(&mut buf)? == 0 {
                break;
            }
            if buf.trim_end() == "." {
                break;
            }
            print!("{buf}");
        }
        Ok(())
    }
}
