use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

// Import from noticecheck-core
use noticecheck_core::{
    filter_by_language, IdentityMap, RuleName, Severity, ValidationConfig, ValidationProcessor,
};

// Import CLI utilities
use noticecheck::{default_run_id, is_valid_run_id};

#[derive(Parser)]
#[command(name = "noticecheck")]
#[command(about = "Validate compiled client notice PDFs before encryption and bundling")]
struct Args {
    /// Compiled PDFs to validate (explicit list, not globbed)
    inputs: Vec<PathBuf>,

    /// Path to validation config file (YAML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Identity artifact mapping filenames to expected client ids
    #[arg(short, long)]
    artifact: Option<PathBuf>,

    /// Directory for the validation report
    #[arg(short, long, default_value = "output/metadata")]
    output_dir: PathBuf,

    /// Run identifier used in the report file name (default: current time)
    #[arg(long)]
    run_id: Option<String>,

    /// Only validate inputs named `<language>_...`; also names the report
    #[arg(short, long)]
    language: Option<String>,

    /// Override execution.jobs
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Override execution.document_timeout_secs
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Override a rule severity, e.g. `--rule exactly_two_pages=error`
    #[arg(long = "rule", value_name = "RULE=SEVERITY")]
    rules: Vec<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Print the default configuration as YAML and exit
    #[arg(long)]
    print_default_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.print_default_config {
        print!("{}", ValidationConfig::default().to_yaml()?);
        return Ok(());
    }

    println!("🦀 Noticecheck PDF Validator");

    let config = load_config(&args)?;
    if let Some(path) = &args.config {
        println!("📋 Loaded config from: {}", path.display());
    } else {
        println!("📋 Using default config");
    }
    debug!("Effective config:\n{}", config.to_yaml()?);

    let identity = match &args.artifact {
        Some(path) => {
            let map = IdentityMap::load_from_file(path)
                .with_context(|| format!("loading identity artifact {}", path.display()))?;
            println!("🪪 Loaded {} identity record(s) from: {}", map.len(), path.display());
            Some(map)
        }
        None => None,
    };

    let run_id = args.run_id.clone().unwrap_or_else(default_run_id);
    if !is_valid_run_id(&run_id) {
        bail!("invalid run id '{run_id}': use letters, digits, '-', '_' or '.'");
    }

    let inputs = match &args.language {
        Some(language) => filter_by_language(&args.inputs, language),
        None => args.inputs.clone(),
    };
    if inputs.is_empty() {
        println!("⚠️  No PDFs to validate");
    }

    let processor = ValidationProcessor::new_cli(config, identity, &args.output_dir)?;
    let run = processor
        .run(&run_id, args.language.as_deref(), &inputs)
        .await?;

    if let Some(path) = &run.report_path {
        println!("💾 Detailed validation results: {}", path.display());
    }

    if let Some(message) = run.outcome.message() {
        eprintln!("❌ {message}");
        std::process::exit(1);
    }

    println!("✅ Validation passed; pipeline may continue");
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Load the YAML config and apply command-line overrides
fn load_config(args: &Args) -> Result<ValidationConfig> {
    let mut config = ValidationConfig::load(args.config.as_deref())
        .context("loading validation config")?;

    if let Some(jobs) = args.jobs {
        config.execution.jobs = jobs;
    }
    if let Some(timeout) = args.timeout_secs {
        config.execution.document_timeout_secs = timeout;
    }
    for rule in &args.rules {
        let (name, severity) = rule
            .split_once('=')
            .with_context(|| format!("--rule expects RULE=SEVERITY, got '{rule}'"))?;
        let name: RuleName = name.parse()?;
        let severity: Severity = severity.parse()?;
        config.rules = config.rules.with(name, severity);
    }

    // Overrides go through the same checks as the file
    Ok(config.validated()?)
}
