use anyhow::Result;
use clap::{Parser, Subcommand};
use postcode_clusters::{ClusterError, ClusteringPipeline, LookupDataset, PipelineConfig, Resolve};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "postcode-clusters")]
#[command(about = "Group UK postcodes into geographic clusters and map them")]
struct Args {
    /// Directory of per-prefix postcode CSV files (default: $POSTCODE_DATA_DIR or data/Data/CSV)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Cluster a single-column CSV of postcodes
    Run {
        /// Input CSV (one postcode per row, no header)
        input: PathBuf,

        /// Number of groups (default: $POSTCODE_NUM_GROUPS or 8)
        #[arg(short, long)]
        groups: Option<usize>,

        /// Root directory for run artifacts (default: $POSTCODE_OUTPUT_DIR or output)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Centroid initialization seed
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Resolve postcodes to coordinates
    Lookup {
        #[arg(required = true)]
        postcodes: Vec<String>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<ClusterError>() {
                Some(ClusterError::InsufficientData { resolved, requested }) => eprintln!(
                    "Only {} postcodes could be located but {} groups were requested. \
                     Try fewer groups or check the invalid postcodes.",
                    resolved, requested
                ),
                Some(ClusterError::Load { .. }) => eprintln!("Error processing file: {}", e),
                _ => error!("{:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = PipelineConfig::from_env()?;
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }

    match args.command {
        Command::Run {
            input,
            groups,
            output_dir,
            seed,
        } => {
            if let Some(groups) = groups {
                config.num_groups = groups;
            }
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            if let Some(seed) = seed {
                config.seed = seed;
            }

            let pipeline = ClusteringPipeline::new(config)?;
            let output = pipeline.run(&input)?;
            let artifacts = output.write_artifacts(&pipeline.config().output_dir)?;

            info!("Run {} complete", output.run_id);
            println!(
                "{} postcodes grouped into {} groups, {} invalid. Results in {}",
                output.result.len(),
                pipeline.config().num_groups,
                output.invalid.len(),
                artifacts.dir.display()
            );
        }
        Command::Lookup { postcodes } => {
            let dataset = Arc::new(LookupDataset::open(&config.data_dir)?);
            let mut resolver = dataset.batch();
            for postcode in postcodes {
                match resolver.resolve(&postcode) {
                    Ok(entry) => println!(
                        "{}\t{:.6}\t{:.6}",
                        entry.postcode, entry.coordinate.latitude, entry.coordinate.longitude
                    ),
                    Err(miss) => println!("{}\tnot found ({})", miss.postcode, miss.reason),
                }
            }
        }
    }

    Ok(())
}
