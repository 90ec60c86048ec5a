use clap::{Parser, Subcommand, ValueEnum};
use rv_core::AlignKey;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "recverify")]
#[command(
    author,
    version,
    about = "Reconcile redundant live-recording captures into one verified timeline"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile one or more checksum files
    Reconcile {
        /// Checksum files, one reconciliation job each
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Segment value used to align successive captures
        #[arg(long, value_enum)]
        key: Option<KeyArg>,

        /// Place captures that share nothing with their predecessor after a gap
        /// instead of failing
        #[arg(long)]
        allow_gaps: bool,

        /// Number of files to reconcile in parallel
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Summarize the captures in a checksum file
    Inspect {
        /// Checksum file to inspect
        #[arg(required = true)]
        file: PathBuf,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KeyArg {
    /// Hash of the segment's leading keyframe
    Keyframe,
    /// Video and audio content hashes of the whole segment
    Segment,
}

impl From<KeyArg> for AlignKey {
    fn from(arg: KeyArg) -> Self {
        match arg {
            KeyArg::Keyframe => AlignKey::KeyframeHash,
            KeyArg::Segment => AlignKey::SegmentHash,
        }
    }
}
