use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use dcec::{Config, Container, Diagnostic, Notation};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "dcec")]
#[command(about = "Cognitive event calculus statement parser")]
struct Cli {
    /// Log resolution steps to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Configuration file; `./dcec.toml` is used when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse one statement and print its tree.
    Parse {
        statement: String,
        #[arg(long, value_enum, default_value_t = Format::S)]
        format: Format,
        /// Prototype to declare first, e.g. `Boolean likes Agent Agent`.
        #[arg(long = "declare")]
        declarations: Vec<String>,
    },
    /// Check files holding one statement per line.
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the configured namespace.
    Namespace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    S,
    F,
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = cli.config.as_deref();
    let exit_code = match cli.command {
        Command::Parse {
            statement,
            format,
            declarations,
        } => run_parse(config, &statement, format, &declarations),
        Command::Check { files } => run_check(config, &files),
        Command::Namespace => run_namespace(config),
    };
    std::process::exit(exit_code);
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("DCEC_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();
}

fn load_container(config: Option<&Path>) -> Result<Container, Diagnostic> {
    Config::resolve(config)
        .and_then(|config| Container::from_config(&config))
        .map_err(Diagnostic::from)
}

fn run_parse(
    config: Option<&Path>,
    statement: &str,
    format: Format,
    declarations: &[String],
) -> i32 {
    let mut container = match load_container(config) {
        Ok(container) => container,
        Err(d) => {
            eprintln!("{d}");
            return 1;
        }
    };
    for prototype in declarations {
        if let Err(err) = container.declare(prototype) {
            eprintln!("{}", Diagnostic::from(err));
            return 1;
        }
    }

    let outcome = match container.add_statement(statement) {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("{}", Diagnostic::from(err));
            return 1;
        }
    };

    let notation = match format {
        Format::Json => {
            return match serde_json::to_string_pretty(&outcome) {
                Ok(json) => {
                    println!("{json}");
                    0
                }
                Err(err) => {
                    eprintln!("E-IO: failed to encode JSON: {err}");
                    1
                }
            };
        }
        Format::S => Notation::S,
        Format::F => Notation::F,
    };
    match outcome.tree.as_arg() {
        Some(tree) => println!("{}", container.render(&tree, notation)),
        None => println!("()"),
    }
    0
}

fn run_check(config: Option<&Path>, files: &[PathBuf]) -> i32 {
    let mut container = match load_container(config) {
        Ok(container) => container,
        Err(d) => {
            eprintln!("{d}");
            return 1;
        }
    };

    let mut failures = 0usize;
    let mut accepted = 0usize;
    for file in files {
        let src = match fs::read_to_string(file) {
            Ok(src) => src,
            Err(err) => {
                eprintln!("E-IO: failed to read {}: {}", file.display(), err);
                failures += 1;
                continue;
            }
        };

        for (idx, line) in src.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let result = match line.strip_prefix("declare ") {
                Some(prototype) => container.declare(prototype).map(|_| false),
                None => container
                    .add_statement(line)
                    .map(|outcome| !outcome.tree.is_empty()),
            };
            match result {
                Ok(true) => accepted += 1,
                Ok(false) => {}
                Err(err) => {
                    let location = format!("{}:{}", file.display(), idx + 1);
                    eprintln!("{}", Diagnostic::from(err).with_source(location));
                    failures += 1;
                }
            }
        }
    }

    if failures > 0 {
        return 1;
    }
    println!("ok ({accepted} statements)");
    0
}

fn run_namespace(config: Option<&Path>) -> i32 {
    match load_container(config) {
        Ok(container) => {
            print!("{}", container.namespace());
            0
        }
        Err(d) => {
            eprintln!("{d}");
            1
        }
    }
}
