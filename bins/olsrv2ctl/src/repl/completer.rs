use rustyline::completion::Pair;
use rustyline::{Context, Result};

/// Completes on the fixed top-level command set; grounded on
/// `crates/vulcan-ctl/src/repl/completer.rs`'s `ReplCompleter`.
pub struct ReplCompleter {
    names: Vec<String>,
}

impl ReplCompleter {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn complete(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Result<(usize, Vec<Pair>)> {
        let prefix = &line[..pos];
        let pairs = self
            .names
            .iter()
            .filter(|n| n.starts_with(prefix))
            .map(|n| Pair {
                display: n.clone(),
                replacement: n.clone(),
            })
            .collect();
        Ok((0, pairs))
    }
}
