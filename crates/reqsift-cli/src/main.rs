mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_FAILURE, EXIT_MANIFEST_ERROR, EXIT_SPECIFIER_ERROR};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "reqsift",
    version,
    about = "Split and normalize Python requirements listings"
)]
struct Cli {
    /// Path to a reqsift config file (default: ~/.config/reqsift/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Normalize every requirement of a manifest into dependency records.
    Deps {
        /// Path to the requirements file.
        #[arg(default_value = "requirements.txt")]
        manifest: PathBuf,
    },
    /// Show the global directives and the remaining requirement lines.
    Directives {
        /// Path to the requirements file.
        #[arg(default_value = "requirements.txt")]
        manifest: PathBuf,
    },
    /// Normalize requirement specifiers given on the command line.
    Normalize {
        /// Requirement specifiers, e.g. "requests>=2.31".
        #[arg(required = true)]
        specifiers: Vec<String>,
    },
    /// Show the raw per-line metadata of a manifest.
    Extra {
        /// Path to the requirements file.
        #[arg(default_value = "requirements.txt")]
        manifest: PathBuf,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("REQSIFT_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let json_output = cli.json;
    let config_path = cli.config.as_deref();

    let result = match cli.command {
        Commands::Deps { manifest } => commands::load_inspector(config_path)
            .and_then(|inspector| commands::deps::run(&inspector, &manifest, json_output)),
        Commands::Directives { manifest } => commands::load_inspector(config_path)
            .and_then(|inspector| commands::directives::run(&inspector, &manifest, json_output)),
        Commands::Normalize { specifiers } => commands::load_inspector(config_path)
            .and_then(|inspector| commands::normalize::run(&inspector, &specifiers, json_output)),
        Commands::Extra { manifest } => commands::load_inspector(config_path)
            .and_then(|inspector| commands::extra::run(&inspector, &manifest, json_output)),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("manifest error:")
                || msg.starts_with("failed to read manifest")
            {
                EXIT_MANIFEST_ERROR
            } else if msg.starts_with("invalid specifier") {
                EXIT_SPECIFIER_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}
