mod repl;

use std::path::PathBuf;

use clap::Parser;
use repl::{Command, Repl};

#[derive(Parser)]
struct Cli {
    /// Path to the daemon's control socket
    #[arg(short, long, value_name = "PATH", default_value = "/run/olsrv2d.sock")]
    socket: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut repl = match Repl::connect(">> ", &cli.socket) {
        Ok(repl) => repl,
        Err(err) => {
            eprintln!("could not connect to {}: {err}", cli.socket.display());
            std::process::exit(1);
        }
    };

    repl.add_command(Command::new("help", |_| {
        Ok("status, neighbors, routes, topology, quit".to_string())
    }));

    repl.run()?;
    Ok(())
}
