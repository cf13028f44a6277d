use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use litewalk::{config::Config, executor::Executor, types::error::DatabaseError};
use rustyline::{DefaultEditor, error::ReadlineError};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Read-only query tool for SQLite database files
#[derive(Parser, Debug)]
#[command(name = "litewalk", version)]
struct Args {
    /// Path to the database file
    database: PathBuf,

    /// Command to run (`.dbinfo`, `.tables`, `.schema` or a SELECT); starts
    /// an interactive shell when omitted
    command: Option<String>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Column separator for result rows
    #[arg(short, long)]
    separator: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn read_multiline_command(rl: &mut DefaultEditor) -> rustyline::Result<String> {
    let mut input = String::new();
    let mut prompt = "litewalk> ";

    loop {
        let line = rl.readline(prompt)?;
        let trimmed_line = line.trim_end();

        // A trailing backslash continues the command on the next line.
        if let Some(head) = trimmed_line.strip_suffix('\\') {
            input.push_str(head);
            input.push(' ');
            prompt = "       -> ";
        } else {
            input.push_str(trimmed_line);
            break;
        }
    }

    Ok(input)
}

fn run_command(
    executor: &mut Executor,
    command: &str,
    config: &Config,
) -> Result<(), DatabaseError> {
    let output = executor.run(command)?.render(config);
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

fn run_repl(executor: &mut Executor, config: &Config) -> Result<(), DatabaseError> {
    let mut rl = DefaultEditor::new().map_err(|e| DatabaseError::Config {
        details: format!("cannot start line editor: {e}"),
    })?;
    if let Some(history) = &config.history_file {
        if let Err(e) = rl.load_history(history) {
            debug!(error = %e, "no history loaded");
        }
    }

    loop {
        match read_multiline_command(&mut rl) {
            Ok(input) => {
                let command = input.trim();
                if command.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(command);
                if matches!(command, ".exit" | ".quit") {
                    break;
                }
                if let Err(e) = run_command(executor, command, config) {
                    eprintln!("Error: {e}");
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Error: {err}");
                break;
            }
        }
    }

    if let Some(history) = &config.history_file {
        if let Err(e) = rl.save_history(history) {
            debug!(error = %e, "history not saved");
        }
    }
    Ok(())
}

fn load_config(args: &Args) -> Result<Config, DatabaseError> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(separator) = &args.separator {
        config.column_separator = separator.clone();
    }
    Ok(config)
}

fn init_logging(args: &Args, config: &Config) {
    let default_level = if args.verbose { "debug" } else { config.log_level.as_str() };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> Result<(), DatabaseError> {
    let config = load_config(args)?;
    init_logging(args, &config);

    let mut executor = Executor::open(&args.database)?;
    match &args.command {
        Some(command) => run_command(&mut executor, command, &config),
        None => run_repl(&mut executor, &config),
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
