use clap::{Parser, Subcommand};
use cuesheet_pipeline::output::OutputOptions;
use cuesheet_pipeline::pipeline::absolute_path;
use cuesheet_pipeline::{load_conversion, run_pipeline, PipelineOptions};
use cuesheet_validation::{
    build_report, parse_required_keys, render_text_report, write_report, ReportMode,
    ValidationOptions, DEFAULT_REQUIRED_GLOBAL_KEYS,
};
use std::path::PathBuf;

mod options;
use options::ConversionFlags;

#[derive(Parser, Debug)]
#[command(
    name = "cuesheet",
    about = "Convert localized subtitle and metadata sheets to JSON",
    version
)]
struct Args {
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Convert(ConvertArgs),
    Validate(CheckArgs),
    DryRun(CheckArgs),
}

#[derive(Parser, Debug)]
struct ConvertArgs {
    input: PathBuf,
    /// Output JSON path; may contain `{country}`.
    output: Option<PathBuf>,
    #[command(flatten)]
    conversion: ConversionFlags,
    #[arg(long)]
    split_by_country: bool,
    /// 1-based index into the discovered countries.
    #[arg(long)]
    country_column: Option<usize>,
    #[arg(long)]
    output_pattern: Option<String>,
    #[arg(long)]
    auto_output: bool,
    #[arg(long)]
    output_dir: Option<PathBuf>,
    #[arg(long)]
    sample: bool,
    #[arg(long)]
    no_generation_meta: bool,
    #[arg(long)]
    converter_version: Option<String>,
}

#[derive(Parser, Debug)]
struct CheckArgs {
    input: PathBuf,
    #[command(flatten)]
    conversion: ConversionFlags,
    #[arg(long)]
    validation_report: Option<PathBuf>,
    #[arg(long, default_value = DEFAULT_REQUIRED_GLOBAL_KEYS)]
    required_global_keys: String,
    #[arg(long)]
    missing_keys_warn: bool,
}

fn init_tracing(verbose: bool) {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if verbose {
            "cuesheet=debug,cuesheet_pipeline=debug,cuesheet_validation=debug".to_string()
        } else {
            "cuesheet=info,cuesheet_pipeline=info,cuesheet_validation=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    match args.command {
        Command::Convert(convert) => run_convert(convert),
        Command::Validate(check) => run_check(check, ReportMode::ValidateOnly),
        Command::DryRun(check) => run_check(check, ReportMode::DryRun),
    }
}

fn run_convert(args: ConvertArgs) {
    let convert = match args.conversion.resolve() {
        Ok(convert) => convert,
        Err(err) => {
            eprintln!("Config error: {err}");
            std::process::exit(1);
        }
    };
    let options = PipelineOptions {
        input_path: args.input,
        convert,
        output: OutputOptions {
            output: args.output,
            output_pattern: args.output_pattern,
            split_by_country: args.split_by_country,
            country_column: args.country_column,
            auto_output: args.auto_output,
            output_dir: args.output_dir,
            sample: args.sample,
        },
        generation_meta: !args.no_generation_meta,
        converter_version: args.converter_version,
    };

    match run_pipeline(options) {
        Ok(report) => {
            if !report.countries.is_empty() {
                println!(
                    "Discovered countries ({}): {:?}",
                    report.countries.len(),
                    report.countries
                );
            }
            println!(
                "Wrote {} files from {} (sha256={})",
                report.files_written.len(),
                report.input_path.display(),
                report.input_sha256
            );
            for path in report.files_written {
                println!("- {}", path.display());
            }
        }
        Err(err) => {
            eprintln!("Conversion error: {err}");
            std::process::exit(1);
        }
    }
}

fn run_check(args: CheckArgs, mode: ReportMode) {
    let convert = match args.conversion.resolve() {
        Ok(convert) => convert,
        Err(err) => {
            eprintln!("Config error: {err}");
            std::process::exit(1);
        }
    };
    let input = match absolute_path(&args.input) {
        Ok(input) => input,
        Err(err) => {
            eprintln!("Input error: {err}");
            std::process::exit(1);
        }
    };
    let output = match load_conversion(&input, &convert) {
        Ok(output) => output,
        Err(err) => {
            eprintln!("Conversion error: {err}");
            std::process::exit(1);
        }
    };

    let validation = ValidationOptions {
        required_global_keys: parse_required_keys(&args.required_global_keys),
        missing_keys_warn: args.missing_keys_warn,
    };
    let report = build_report(&input, mode, &output, &validation);
    print!("{}", render_text_report(&report));

    if let Some(path) = &args.validation_report {
        if let Err(err) = write_report(path, &report) {
            eprintln!("Failed to write validation report: {err}");
        }
    }
    if mode == ReportMode::ValidateOnly && report.has_errors() {
        std::process::exit(1);
    }
}
