use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    #[clap(long = "coco-file", help = "Path to the COCO for Camera Traps export")]
    pub coco_file: PathBuf,
    #[clap(long = "output-dir", help = "Local directory to download images to (created if absent)")]
    pub output_dir: PathBuf,
    #[clap(short = 'w', long = "max-workers", help = "Upper bound on concurrent workers (default 50)")]
    pub max_workers: Option<usize>,

    #[clap(long, help = "Source bucket (overrides config)")]
    pub bucket: Option<String>,
    #[clap(long, help = "Store region (overrides config)")]
    pub region: Option<String>,
    #[clap(long, help = "Named AWS profile (overrides config)")]
    pub profile: Option<String>,
    #[clap(long = "endpoint-url", help = "Custom endpoint for S3-compatible stores")]
    pub endpoint_url: Option<String>,
    #[clap(long = "path-style", help = "Use path-style bucket addressing")]
    pub path_style: bool,
    #[clap(
        long = "source-dir",
        help = "Read objects from a local mirror (<dir>/<bucket>/<key>) instead of S3"
    )]
    pub source_dir: Option<PathBuf>,
    #[clap(long = "config", help = "Config file (default ~/.imgpull/config.json)")]
    pub config: Option<PathBuf>,

    #[clap(long = "retry-from", help = "Only fetch the keys listed in a previous failures file")]
    pub retry_from: Option<PathBuf>,
    #[clap(long = "failures-out", help = "Where to write the failures file (JSON Lines)")]
    pub failures_out: Option<PathBuf>,
    #[clap(long = "dry-run", help = "Load and size the run without downloading")]
    pub dry_run: bool,

    #[clap(long, help = "Also print a single-line JSON summary")]
    pub json: bool,
    #[clap(short, long, help = "No progress bar and no human summary")]
    pub quiet: bool,
    #[clap(short, long, help = "Debug logging, also written to ~/.imgpull/logs")]
    pub verbose: bool,
}
