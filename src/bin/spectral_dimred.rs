use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{error, info};
use spectral_dimred::affinity::DEFAULT_ALPHA;
use spectral_dimred::io::{CsvSink, CsvSource};
use spectral_dimred::{Pipeline, ReductionConfig, ReductionMethod, DEFAULT_COMPONENTS};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "spectral-dimred",
    version,
    about = "Reduce a headerless numeric CSV table to a few coordinates."
)]
struct Cli {
    /// Debug mode (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// PCA on the sample covariance matrix.
    Pca(TableArgs),
    /// PCA where every centered row is normalized to unit norm before accumulation.
    NormalizedPca(TableArgs),
    /// Classical MDS on pairwise distances raised to the power alpha.
    Mds {
        #[command(flatten)]
        table: TableArgs,
        /// Distance exponent; 1.0 is classical MDS.
        #[arg(default_value_t = DEFAULT_ALPHA)]
        alpha: f64,
    },
}

#[derive(Args, Debug)]
struct TableArgs {
    /// Input table, one observation per line, no header.
    input: PathBuf,
    /// Output table of reduced coordinates.
    output: PathBuf,
    /// Number of output components.
    #[arg(short = 'k', long, default_value_t = DEFAULT_COMPONENTS)]
    components: usize,
    /// Field delimiter for both input and output.
    #[arg(short, long, default_value_t = ',')]
    delimiter: char,
    /// Iteration cap for the eigensolver (0 = unbounded).
    #[arg(long)]
    max_iterations: Option<usize>,
}

fn main() {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(why) = run(cli.command) {
        error!("{:#}", why);
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<()> {
    let (table, method) = match command {
        Command::Pca(table) => (table, ReductionMethod::Pca),
        Command::NormalizedPca(table) => (table, ReductionMethod::NormalizedPca),
        Command::Mds { table, alpha } => (table, ReductionMethod::ExponentialMds { alpha }),
    };

    if !table.delimiter.is_ascii() {
        bail!("delimiter {:?} must be a single ASCII character", table.delimiter);
    }
    let delimiter = table.delimiter as u8;

    let mut builder = ReductionConfig::builder()
        .method(method)
        .n_components(table.components);
    if let Some(limit) = table.max_iterations {
        builder = builder.max_iterations(limit);
    }

    let source = CsvSource::new(&table.input).delimiter(delimiter);
    let mut sink = CsvSink::new(&table.output).delimiter(delimiter);

    let mut pipeline = Pipeline::new(builder.build());
    let reduction = pipeline
        .run(&source, &mut sink)
        .with_context(|| format!("{} of {} failed", method, table.input.display()))?;

    info!(
        "Cumulative explained variance ratio: {}",
        reduction.cumulative_explained_variance_ratio()
    );
    Ok(())
}
