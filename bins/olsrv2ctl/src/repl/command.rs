//! A named REPL command with optional sub-commands. Grounded on
//! `bins/vulcan-ctl/src/repl/command.rs`'s `Command<F>` shape, but with
//! the run closure boxed (`Box<dyn Fn(...)>`) instead of stored as an
//! `impl Fn(...)` struct field, which the teacher's version is not valid
//! Rust for — `impl Trait` is only legal in argument/return position,
//! never a field type.

pub struct Command {
    name: String,
    sub_commands: Vec<Command>,
    run: Box<dyn Fn(&[String]) -> anyhow::Result<String>>,
}

impl Command {
    pub fn new(name: impl Into<String>, run: impl Fn(&[String]) -> anyhow::Result<String> + 'static) -> Self {
        Self {
            name: name.into(),
            sub_commands: Vec::new(),
            run: Box::new(run),
        }
    }

    pub fn with_sub_command(mut self, command: Command) -> Self {
        self.sub_commands.push(command);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dispatches to the matching sub-command if `args` starts with its
    /// name, otherwise runs this command directly.
    pub fn run(&self, args: &[String]) -> anyhow::Result<String> {
        if let Some((first, rest)) = args.split_first() {
            if let Some(sub) = self.sub_commands.iter().find(|c| c.name == *first) {
                return sub.run(rest);
            }
        }
        (self.run)(args)
    }
}
