use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use snp_processor::config::Settings;
use snp_processor::data::{
    difference_with, display_label, load_file, to_csv, write_csv, DifferenceKind, ParseResult,
};

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(
    name = "snp-processor",
    version,
    about = "Inspect, export and compare S1P / DAT measurement files"
)]
struct Cli {
    /// JSON settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level (RUST_LOG still takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print metadata and summary statistics of a file
    Summary {
        file: PathBuf,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Write the parsed dataset (with derived fields) as CSV
    Export { file: PathBuf, output: PathBuf },
    /// Resample two files onto their shared domain and subtract (A - B)
    Diff {
        a: PathBuf,
        b: PathBuf,
        /// S1P difference kind
        #[arg(long, value_enum, conflicts_with_all = ["x", "y"])]
        kind: Option<KindArg>,
        /// Domain field for a custom difference
        #[arg(long, requires = "y")]
        x: Option<String>,
        /// Value field for a custom difference
        #[arg(long, requires = "x")]
        y: Option<String>,
        /// Wrap a custom difference into [-180, 180) degrees
        #[arg(long, requires = "y")]
        wrap_phase: bool,
        /// CSV output path (stdout if omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Magnitude,
    Phase,
    Both,
}

impl From<KindArg> for DifferenceKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Magnitude => DifferenceKind::Magnitude,
            KindArg::Phase => DifferenceKind::Phase,
            KindArg::Both => DifferenceKind::Both,
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load_or_default(cli.config.as_deref()).context("loading settings")?;

    match cli.command {
        Command::Summary { file, json } => {
            let result = load(&file, &settings)?;
            if json {
                print_json_summary(&result)?;
            } else {
                print_text_summary(&result);
            }
        }
        Command::Export { file, output } => {
            let result = load(&file, &settings)?;
            to_csv(&result.dataset, &output)
                .with_context(|| format!("exporting to {}", output.display()))?;
        }
        Command::Diff {
            a,
            b,
            kind,
            x,
            y,
            wrap_phase,
            out,
        } => {
            let kind = match (x, y) {
                (Some(x_field), Some(y_field)) => DifferenceKind::Custom {
                    x_field,
                    y_field,
                    wrap_phase,
                },
                (None, None) => kind.unwrap_or(KindArg::Magnitude).into(),
                _ => bail!("--x and --y must be given together"),
            };

            let first = load(&a, &settings)?;
            let second = load(&b, &settings)?;
            let result = difference_with(&first.dataset, &second.dataset, &kind, &settings.difference)
                .with_context(|| {
                    format!("computing {} difference of {} and {}", kind.name(), a.display(), b.display())
                })?;

            eprintln!("{}", serde_json::to_string_pretty(result.metadata())?);
            match out {
                Some(path) => to_csv(&result.dataset, &path)
                    .with_context(|| format!("exporting to {}", path.display()))?,
                None => write_csv(&result.dataset, std::io::stdout().lock())
                    .context("writing CSV to stdout")?,
            }
        }
    }
    Ok(())
}

fn load(path: &Path, settings: &Settings) -> Result<ParseResult> {
    load_file(path, &settings.s1p).with_context(|| format!("loading {}", path.display()))
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_json_summary(result: &ParseResult) -> Result<()> {
    let value = serde_json::json!({
        "kind": result.kind,
        "metadata": result.metadata(),
        "summary": result.summary,
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn print_text_summary(result: &ParseResult) {
    println!("{} file, {} points", result.kind, result.summary.num_points);
    for (key, value) in result.metadata() {
        println!("  {key}: {value}");
    }
    if let Some(step) = result.summary.frequency_step_hz {
        println!("  uniform frequency step: {step} Hz");
    }

    println!();
    for stats in &result.summary.fields {
        let std = stats
            .std
            .map_or_else(|| "-".to_string(), |s| format!("{s:.6}"));
        println!(
            "{:<28} n={:<6} min={:<14.6} max={:<14.6} mean={:<14.6} std={std}",
            display_label(&stats.field),
            stats.count,
            stats.min,
            stats.max,
            stats.mean,
        );
    }
}
