use clap::{Args, Parser, Subcommand, ValueEnum};
use docrectify::Device;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod runner;

#[derive(Parser, Debug)]
#[command(name = "docrectify")]
#[command(about = "Dewarp and binarize photographed document pages ahead of OCR")]
#[command(version)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rectify photographed pages and save them as binarized PNGs
    Rectify(RectifyArgs),

    /// Merge a checkpoint saved under another naming scheme into a parameter file
    MergeParams(MergeParamsArgs),
}

#[derive(Args, Debug)]
pub struct RectifyArgs {
    /// Photographs to rectify
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Directory receiving processed_<name>.png files
    #[arg(long, env = "RECTIFY_OUTPUT_DIR", default_value = "output")]
    pub output_dir: PathBuf,

    /// Foreground mask model (.rten)
    #[arg(long, env = "RECTIFY_MASK_MODEL", default_value = "models/seg.rten")]
    pub mask_model: PathBuf,

    /// Backward-map model (.rten)
    #[arg(long, env = "RECTIFY_BACKWARD_MAP_MODEL", default_value = "models/bm.rten")]
    pub backward_map_model: PathBuf,

    /// Execution device ("cpu", "cuda" or "cuda:N")
    #[arg(long, env = "RECTIFY_DEVICE", default_value = "cpu")]
    pub device: Device,

    /// Number of images processed in parallel
    #[arg(long, env = "RECTIFY_JOBS", default_value = "1")]
    pub jobs: usize,

    /// Per-image time limit in seconds (0 disables it)
    #[arg(long, env = "RECTIFY_TIMEOUT_SECS", default_value = "0")]
    pub timeout_secs: u64,

    /// Run OCR on every rectified page
    #[arg(long, env = "RECTIFY_OCR")]
    pub ocr: bool,

    /// Name of the OCR results file inside the output directory
    #[arg(long, env = "RECTIFY_RESULTS_FILE", default_value = "ocr_results.txt")]
    pub results_file: String,
}

#[derive(Args, Debug)]
pub struct MergeParamsArgs {
    /// Checkpoint whose entries are merged in
    #[arg(long)]
    pub source: PathBuf,

    /// Parameter file receiving the entries
    #[arg(long)]
    pub into: PathBuf,

    /// Where the merged mapping is written
    #[arg(long)]
    pub output: PathBuf,

    /// Leading characters dropped from every checkpoint name
    #[arg(long, env = "RECTIFY_STRIP_PREFIX", default_value = "0")]
    pub strip_prefix: usize,

    /// Use the naming scheme of this predictor's checkpoints instead
    #[arg(long, value_enum, conflicts_with = "strip_prefix")]
    pub predictor: Option<PredictorKind>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictorKind {
    Mask,
    BackwardMap,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting docrectify v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Rectify(args) => {
            let config = config::Config::from(args);
            runner::run(config).await
        }
        Command::MergeParams(args) => runner::merge_params(args),
    }
}
