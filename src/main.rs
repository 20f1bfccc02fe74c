//! Paprika CLI entry point.

use clap::Parser;
use paprika::cli::commands;
use paprika::cli::{Cli, Commands};
use paprika::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    // Set up tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    // Resolve effective JSON mode: --json OR non-TTY stdout
    let json = cli.json || !std::io::IsTerminal::is_terminal(&std::io::stdout());

    match run(&cli, json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                eprintln!("{}", e.to_structured_json());
            } else if !cli.quiet {
                if let Some(hint) = e.hint() {
                    eprintln!("Error: {e}\n  Hint: {hint}");
                } else {
                    eprintln!("Error: {e}");
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info,tower_http=info"),
            2 => EnvFilter::new("debug,rusqlite=info,hyper=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli, json: bool) -> Result<(), Error> {
    let db = cli.db.as_ref();
    let config = cli.config.as_ref();

    match &cli.command {
        Commands::Init { force } => commands::init::execute(db, config, *force, json),
        Commands::Serve {
            bind,
            sync,
            delete_mode,
        } => commands::serve::execute(db, config, bind.as_deref(), sync, *delete_mode),
        Commands::Import {
            file,
            sync,
            dry_run,
        } => commands::import::execute(file, db, config, sync, *dry_run, json),
        Commands::Scan {
            dir,
            sync,
            apply,
            output,
        } => commands::scan::execute(dir, db, config, sync, *apply, output.as_deref(), json),
        Commands::List {
            include_deleted,
            limit,
        } => commands::list::execute(db, config, *include_deleted, *limit, json),
        Commands::Show { id } => commands::show::execute(db, config, *id, json),
        Commands::Version => commands::version::execute(json),
        Commands::Completions { shell } => commands::completions::execute(shell),
    }
}
