//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod filter;
mod lookup;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use glob::glob;

use crate::config::{DebugVisualization, EdgeDetector, PredicationSource, Preset};

pub use filter::FilterArgs;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Expand frame arguments into a sorted list of files.
///
/// Each argument is either a file or a glob pattern such as `frames/*.png`.
/// A pattern matching nothing yields nothing.
pub fn expand_frames(patterns: &[String]) -> Vec<PathBuf> {
    let mut frames = Vec::new();
    for pattern in patterns {
        let path = PathBuf::from(pattern);
        if path.is_file() {
            frames.push(path);
            continue;
        }
        if let Ok(paths) = glob(pattern) {
            let mut matched: Vec<PathBuf> = paths.filter_map(Result::ok).collect();
            matched.sort();
            frames.extend(matched);
        }
    }
    frames
}

/// SMAA T2x - Temporal antialiasing for rendered frame sequences
#[derive(Parser)]
#[command(name = "smaa")]
#[command(about = "SMAA T2x - Temporal antialiasing for rendered frame sequences")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate the area and search lookup tables as PNG files
    Lookup {
        /// Directory to write area.png and search.png into
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Antialias a sequence of frames as one view
    Filter {
        /// Colour frames, as files or glob patterns, processed in sorted order
        #[arg(required = true)]
        frames: Vec<String>,

        /// Output directory; frames keep their file names
        #[arg(short, long)]
        out: PathBuf,

        /// Directory of depth frames matched by file name
        #[arg(long)]
        depth: Option<PathBuf>,

        /// Directory of velocity frames matched by file name
        #[arg(long)]
        velocity: Option<PathBuf>,

        /// Directory of world normal frames matched by file name
        #[arg(long)]
        normal: Option<PathBuf>,

        /// Directory of material signal frames matched by file name
        #[arg(long)]
        material: Option<PathBuf>,

        /// Area lookup table (generated when omitted)
        #[arg(long, requires = "search")]
        area: Option<PathBuf>,

        /// Search lookup table (generated when omitted)
        #[arg(long, requires = "area")]
        search: Option<PathBuf>,

        /// Settings file (default: smaa.toml found from the working directory)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Quality preset
        #[arg(long, value_enum)]
        preset: Option<Preset>,

        /// Edge detector source
        #[arg(long, value_enum)]
        edge_detector: Option<EdgeDetector>,

        /// Predication source
        #[arg(long, value_enum)]
        predication: Option<PredicationSource>,

        /// Velocity rejection strength (0-100)
        #[arg(long)]
        reprojection_weight: Option<f32>,

        /// Base weight given to the previous frame (0-1)
        #[arg(long)]
        history_bias: Option<f32>,

        /// Write an intermediate buffer instead of the final frame
        #[arg(long, value_enum)]
        visualize: Option<DebugVisualization>,

        /// Treat every Nth frame as a camera cut
        #[arg(long)]
        cut_every: Option<usize>,

        /// Pass frames through unchanged
        #[arg(long)]
        disable: bool,

        /// Print a JSON report of every frame instead of a summary line
        #[arg(long)]
        json: bool,
    },
}

/// Entry point for the CLI
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Lookup { out } => lookup::run_lookup(&out),
        Commands::Filter {
            frames,
            out,
            depth,
            velocity,
            normal,
            material,
            area,
            search,
            config,
            preset,
            edge_detector,
            predication,
            reprojection_weight,
            history_bias,
            visualize,
            cut_every,
            disable,
            json,
        } => filter::run_filter(&FilterArgs {
            frames,
            out,
            depth,
            velocity,
            normal,
            material,
            area,
            search,
            config,
            preset,
            edge_detector,
            predication,
            reprojection_weight,
            history_bias,
            visualize,
            cut_every,
            disable,
            json,
        }),
    }
}
