use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use geo_to_hca::app::{App, BatchResult, ConvertOptions, LookupResult};
use geo_to_hca::config::{ConfigLoader, ResolvedConfig};
use geo_to_hca::domain::GeoAccession;
use geo_to_hca::error::GeoHcaError;
use geo_to_hca::eutils::EutilsHttpClient;
use geo_to_hca::geo::GeoHttpClient;
use geo_to_hca::output::{JsonOutput, OutputMode, StderrProgress};

#[derive(Parser)]
#[command(name = "geo-to-hca")]
#[command(about = "Convert GEO series metadata into the Human Cell Atlas ingest spreadsheet")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Build an HCA workbook for each GEO series")]
    Convert(ConvertArgs),
    #[command(about = "Show the SRA studies and run counts behind a GEO series")]
    Lookup(LookupArgs),
}

#[derive(Args)]
struct ConvertArgs {
    accessions: Vec<String>,

    #[arg(long)]
    output_dir: Option<Utf8PathBuf>,

    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    dry_run: bool,

    #[arg(long)]
    no_soft: bool,
}

#[derive(Args)]
struct LookupArgs {
    accession: String,

    #[arg(long)]
    config: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<GeoHcaError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &GeoHcaError) -> u8 {
    match error {
        GeoHcaError::InvalidGeoAccession(_)
        | GeoHcaError::InvalidStudyAccession(_)
        | GeoHcaError::MissingConfig
        | GeoHcaError::ConfigRead(_)
        | GeoHcaError::ConfigParse(_)
        | GeoHcaError::NoAccessions
        | GeoHcaError::NotFoundSra(_)
        | GeoHcaError::NoStudyAccession(_)
        | GeoHcaError::NoRunInfo(_) => 2,
        GeoHcaError::NcbiHttp(_)
        | GeoHcaError::NcbiStatus { .. }
        | GeoHcaError::StudyLookup { .. }
        | GeoHcaError::GeoHttp(_)
        | GeoHcaError::GeoStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    match cli.command {
        Command::Convert(args) => run_convert(args, output_mode),
        Command::Lookup(args) => run_lookup(args, output_mode),
    }
}

fn build_app(
    config: &ResolvedConfig,
) -> Result<App<EutilsHttpClient, GeoHttpClient>, GeoHcaError> {
    let eutils = EutilsHttpClient::new(config.eutils.clone())?;
    let geo = GeoHttpClient::new()?;
    Ok(App::new(eutils, geo))
}

fn run_convert(args: ConvertArgs, output_mode: OutputMode) -> miette::Result<()> {
    let ConvertArgs {
        accessions,
        output_dir,
        config,
        dry_run,
        no_soft,
    } = args;

    let resolved = ConfigLoader::resolve(config.as_deref(), accessions.is_empty())?;
    let accessions = if accessions.is_empty() {
        resolved.accessions.clone()
    } else {
        accessions
            .iter()
            .map(|value| value.parse())
            .collect::<Result<Vec<GeoAccession>, GeoHcaError>>()?
    };
    let options = ConvertOptions {
        output_dir: output_dir.unwrap_or_else(|| resolved.output_dir.clone()),
        dry_run,
        use_soft: !no_soft,
    };
    let app = build_app(&resolved)?;

    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.convert_all(&accessions, &options, &JsonOutput)?;
            JsonOutput::print_convert(&result).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            let result = app.convert_all(&accessions, &options, &StderrProgress)?;
            print_convert_summary(&result);
        }
    }
    Ok(())
}

fn run_lookup(args: LookupArgs, output_mode: OutputMode) -> miette::Result<()> {
    let accession: GeoAccession = args.accession.parse()?;
    let resolved = ConfigLoader::resolve(args.config.as_deref(), false)?;
    let app = build_app(&resolved)?;

    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.lookup(&accession, &JsonOutput)?;
            JsonOutput::print_lookup(&result).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            let result = app.lookup(&accession, &StderrProgress)?;
            print_lookup_summary(&result);
        }
    }
    Ok(())
}

fn print_convert_summary(result: &BatchResult) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!("{cyan}GEO to HCA summary{reset}");
    for item in &result.items {
        println!(
            "{green}{} -> {} ({} runs, {} experiments, {} biosamples){reset}",
            item.accession,
            item.study_accessions.join(", "),
            item.runs,
            item.experiments,
            item.biosamples
        );
        for tab in &item.tabs {
            println!("   {:<28} {:>5}", tab.name, tab.rows);
        }
        match &item.output_path {
            Some(path) => println!("{green}   written: {path}{reset}"),
            None => println!("{yellow}   dry run, nothing written{reset}"),
        }
        for warning in &item.warnings {
            println!("{yellow}   warning: {warning}{reset}");
        }
    }
}

fn print_lookup_summary(result: &LookupResult) {
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!("{cyan}{}{reset}", result.accession);
    for study in &result.studies {
        println!(
            "   {}: {} runs, {} experiments, {} biosamples",
            study.accession, study.runs, study.experiments, study.biosamples
        );
    }
    for warning in &result.warnings {
        println!("{yellow}   warning: {warning}{reset}");
    }
}
