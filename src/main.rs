mod cli;

use recverify::{
    batch,
    config::{self, OutputFormat},
    output,
};
use rv_core::GapPolicy;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "recverify=trace,rv_timeline=trace,rv_core=debug".to_string()
        } else {
            "recverify=info,rv_timeline=info,rv_core=info".to_string()
        }
    });

    // Reports go to stdout, so logs stay on stderr.
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => exit_code(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            let code = e
                .downcast_ref::<rv_core::Error>()
                .map(rv_core::Error::exit_code)
                .unwrap_or(1);
            exit_code(code)
        }
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Reconcile {
            files,
            json,
            key,
            allow_gaps,
            workers,
        } => {
            let options = ReconcileOptions {
                json,
                key,
                allow_gaps,
                workers,
            };
            reconcile_files(&files, cli.config.as_deref(), options)
        }
        Commands::Inspect { file } => inspect_file(&file).map(|_| 0),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref()).map(|_| 0)
        }
        Commands::Version => {
            println!("recverify {}", env!("CARGO_PKG_VERSION"));
            Ok(0)
        }
    }
}

/// Command-line overrides for the `reconcile` command.
struct ReconcileOptions {
    json: bool,
    key: Option<cli::KeyArg>,
    allow_gaps: bool,
    workers: Option<usize>,
}

fn reconcile_files(
    files: &[PathBuf],
    config_path: Option<&Path>,
    options: ReconcileOptions,
) -> Result<i32> {
    let mut config = config::load_config_or_default(config_path)?;

    // CLI flags win over the config file
    if let Some(key) = options.key {
        config.reconcile.align_key = key.into();
    }
    if options.allow_gaps {
        config.reconcile.gap_policy = GapPolicy::Append;
    }
    if let Some(workers) = options.workers {
        if workers == 0 {
            anyhow::bail!("--workers cannot be 0");
        }
        config.batch.workers = Some(workers);
    }
    if options.json {
        config.output.format = OutputFormat::Json;
    }

    let report = batch::run_batch(
        files,
        &config.reconcile,
        config.batch.effective_workers(),
    )?;

    match config.output.format {
        OutputFormat::Json => println!("{}", output::render_json(&report, config.output.pretty)?),
        OutputFormat::Text => print!("{}", output::render_text(&report)),
    }

    if report.failed() > 0 {
        tracing::warn!("{} of {} job(s) failed", report.failed(), report.jobs.len());
    }

    Ok(report.exit_code())
}

fn inspect_file(file: &Path) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let parts = rv_timeline::load_parts_from_path(file)
        .with_context(|| format!("Failed to load checksum file: {:?}", file))?;

    print!("{}", output::render_inspect(&parts));
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    let reconcile = &config.reconcile;
    println!("  Align key: {:?}", reconcile.align_key);
    println!("  Gap policy: {:?}", reconcile.gap_policy);
    println!(
        "  Required streams: {}",
        reconcile
            .required_streams
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("  Tail exemption: {}", reconcile.tail_exemption);
    println!("  Workers: {}", config.batch.effective_workers());
    println!("  Output: {:?}", config.output.format);

    for warning in reconcile.validate() {
        println!("  warning: {}", warning);
    }

    Ok(())
}
