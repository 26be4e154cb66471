use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "chapterseg",
    version,
    about = "Chapter and subtopic segmentation for long structured documents"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Skeleton(SkeletonArgs),
    Structure(StructureArgs),
    Chunk(ChunkArgs),
    Segment(SegmentArgs),
    Repair(RepairArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct OracleArgs {
    #[arg(long, default_value = chapterseg::oracle::DEFAULT_BASE_URL)]
    pub oracle_base_url: String,

    #[arg(long, default_value = chapterseg::oracle::DEFAULT_MODEL)]
    pub oracle_model: String,

    #[arg(long, default_value = chapterseg::oracle::DEFAULT_API_KEY_ENV)]
    pub api_key_env: String,

    #[arg(long, default_value_t = 120)]
    pub timeout_secs: u64,

    #[arg(long, default_value_t = 20)]
    pub requests_per_minute: u32,

    #[arg(long, default_value_t = 3)]
    pub max_retries: u32,

    #[arg(long, default_value_t = 2000)]
    pub retry_delay_ms: u64,
}

#[derive(Args, Debug, Clone)]
pub struct SkeletonArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct StructureArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub subject: String,

    #[arg(long)]
    pub output: PathBuf,

    #[arg(long, default_value_t = 40_000)]
    pub max_sample_chars: usize,

    #[arg(long, default_value_t = 2)]
    pub max_attempts: u32,

    #[command(flatten)]
    pub oracle: OracleArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ChunkArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub hierarchy: PathBuf,

    #[arg(long, default_value = ".cache/chapterseg/chunks")]
    pub output_dir: PathBuf,

    #[arg(long, default_value_t = chapterseg::segment::DEFAULT_TITLE_SEARCH_MIN_LINE)]
    pub title_search_min_line: usize,

    #[arg(long)]
    pub max_chunk_chars: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct SegmentArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub hierarchy: PathBuf,

    #[arg(long)]
    pub subject: String,

    #[arg(long, default_value = ".cache/chapterseg/segments.sqlite")]
    pub db_path: PathBuf,

    #[arg(long)]
    pub report_path: Option<PathBuf>,

    #[arg(long, default_value_t = chapterseg::segment::DEFAULT_TITLE_SEARCH_MIN_LINE)]
    pub title_search_min_line: usize,

    #[arg(long, default_value_t = chapterseg::segment::DEFAULT_MIN_CONTENT_LENGTH)]
    pub min_content_length: usize,

    #[command(flatten)]
    pub oracle: OracleArgs,
}

#[derive(Args, Debug, Clone)]
pub struct RepairArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long = "record-marker")]
    pub record_markers: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".cache/chapterseg/segments.sqlite")]
    pub db_path: PathBuf,
}
