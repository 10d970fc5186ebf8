use std::path::PathBuf;
use std::process::ExitCode;

use bptree::config::{ConfigError, TreeConfig};
use bptree::shell::{Response, Shell, ShellError};
use clap::Parser;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "bptree", version, about = "Build and inspect an in-memory B+ tree")]
struct Cli {
    /// Minimum degree `t` of the tree (overrides the config file)
    #[arg(short = 't', long)]
    order: Option<usize>,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Commands to run in order instead of starting the interactive shell,
    /// e.g. `bptree "insert 5 3 8" scan`
    commands: Vec<String>,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Shell(#[from] ShellError),

    #[error("Readline error: {0}")]
    Readline(#[from] ReadlineError),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = match &cli.config {
        Some(path) => TreeConfig::load(path)?,
        None => TreeConfig::default(),
    };
    if let Some(order) = cli.order {
        config.order = order;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .ok();

    let mut shell = Shell::new(config.build_tree()?);
    info!(order = config.order, "tree created");

    if cli.commands.is_empty() {
        repl(&mut shell)
    } else {
        for line in &cli.commands {
            match shell.execute_line(line)? {
                Response::Output(text) => println!("{}", text),
                Response::Exit => break,
            }
        }
        Ok(())
    }
}

fn repl(shell: &mut Shell) -> Result<(), CliError> {
    let mut editor = DefaultEditor::new()?;
    println!("B+ tree of order {} (type `help` for commands)", shell.tree().order());

    loop {
        let line = match editor.readline("bptree> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };

        if line.trim().is_empty() {
            continue;
        }
        if let Err(err) = editor.add_history_entry(line.as_str()) {
            warn!(%err, "could not record history");
        }

        match shell.execute_line(&line) {
            Ok(Response::Output(text)) => println!("{}", text),
            Ok(Response::Exit) => break,
            Err(err) => eprintln!("error: {}", err),
        }
    }

    Ok(())
}
