//! Frame sequence filtering command implementation

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::config::loader::{load_config, merge_cli_overrides, CliOverrides};
use crate::config::{DebugVisualization, EdgeDetector, PipelineConfig, PredicationSource, Preset};
use crate::error::SmaaError;
use crate::frame::{ColorImage, DepthImage, FrameInputs, VelocityImage};
use crate::history::ViewState;
use crate::lookup::LookupTextures;
use crate::output::{companion_path, load_color, load_depth, load_velocity, save_png, to_rgb8};
use crate::pipeline::{FrameOutcome, FrameRequest, SmaaPipeline};

use super::{expand_frames, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

/// Arguments of the filter command.
#[derive(Debug, Clone, Default)]
pub struct FilterArgs {
    pub frames: Vec<String>,
    pub out: PathBuf,
    pub depth: Option<PathBuf>,
    pub velocity: Option<PathBuf>,
    pub normal: Option<PathBuf>,
    pub material: Option<PathBuf>,
    pub area: Option<PathBuf>,
    pub search: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub preset: Option<Preset>,
    pub edge_detector: Option<EdgeDetector>,
    pub predication: Option<PredicationSource>,
    pub reprojection_weight: Option<f32>,
    pub history_bias: Option<f32>,
    pub visualize: Option<DebugVisualization>,
    pub cut_every: Option<usize>,
    pub disable: bool,
    pub json: bool,
}

/// Per-frame result printed with `--json`.
#[derive(Debug, Serialize)]
struct FrameReport {
    frame: PathBuf,
    output: PathBuf,
    outcome: String,
    jitter: Option<u8>,
}

/// Summary printed with `--json`.
#[derive(Debug, Serialize)]
struct FilterReport {
    frames: Vec<FrameReport>,
    passed_through: usize,
}

impl FilterArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            enabled: self.disable.then_some(false),
            preset: self.preset,
            edge_detector: self.edge_detector,
            predication: self.predication,
            reprojection_weight: self.reprojection_weight,
            temporal_history_bias: self.history_bias,
            visualize: self.visualize,
            ..Default::default()
        }
    }

    /// Frame `index` (0-based) starts a new shot.
    fn is_camera_cut(&self, index: usize) -> bool {
        match self.cut_every {
            Some(n) if n > 0 => index > 0 && index % n == 0,
            _ => false,
        }
    }
}

/// Buffers loaded for one frame.
struct FrameBuffers {
    color: ColorImage,
    depth: DepthImage,
    velocity: VelocityImage,
    normal: Option<ColorImage>,
    material: Option<ColorImage>,
}

impl FrameBuffers {
    /// Load a colour frame and its companions; a directory without the
    /// frame's companion gives flat depth and zero motion.
    ///
    /// Errors carry the path of the buffer that failed to load.
    fn load(frame: &Path, args: &FilterArgs) -> Result<Self, (PathBuf, SmaaError)> {
        let color = read(frame, load_color)?;
        let (width, height) = color.dimensions();

        let depth = match companion(frame, args.depth.as_deref()) {
            Some(path) => read(&path, load_depth)?,
            None => DepthImage::new(width, height),
        };
        let velocity = match companion(frame, args.velocity.as_deref()) {
            Some(path) => read(&path, load_velocity)?,
            None => VelocityImage::new(width, height),
        };
        let normal = match companion(frame, args.normal.as_deref()) {
            Some(path) => Some(read(&path, load_color)?),
            None => None,
        };
        let material = match companion(frame, args.material.as_deref()) {
            Some(path) => Some(read(&path, load_color)?),
            None => None,
        };

        Ok(Self { color, depth, velocity, normal, material })
    }

    fn inputs(&self) -> FrameInputs<'_> {
        let mut inputs = FrameInputs::new(&self.color, &self.depth, &self.velocity);
        if let Some(normal) = &self.normal {
            inputs = inputs.with_normal(normal);
        }
        if let Some(material) = &self.material {
            inputs = inputs.with_material(material);
        }
        inputs
    }
}

fn read<T>(
    path: &Path,
    load: fn(&Path) -> Result<T, SmaaError>,
) -> Result<T, (PathBuf, SmaaError)> {
    load(path).map_err(|e| (path.to_path_buf(), e))
}

fn companion(frame: &Path, dir: Option<&Path>) -> Option<PathBuf> {
    let path = companion_path(frame, dir?)?;
    if path.is_file() {
        Some(path)
    } else {
        log::debug!("no companion {} for {}", path.display(), frame.display());
        None
    }
}

fn load_lookups(args: &FilterArgs) -> Result<LookupTextures, SmaaError> {
    match (&args.area, &args.search) {
        (Some(area), Some(search)) => LookupTextures::load(area, search),
        _ => Ok(LookupTextures::generate()),
    }
}

fn load_settings(args: &FilterArgs) -> Result<PipelineConfig, String> {
    let mut settings = load_config(args.config.as_deref()).map_err(|e| e.to_string())?;
    merge_cli_overrides(&mut settings, &args.overrides());
    Ok(settings.resolve())
}

/// Run the filter command
pub fn run_filter(args: &FilterArgs) -> ExitCode {
    let frames = expand_frames(&args.frames);
    if frames.is_empty() {
        eprintln!("Error: No frames match {}", args.frames.join(" "));
        return ExitCode::from(EXIT_INVALID_ARGS);
    }

    let config = match load_settings(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let lookups = match load_lookups(args) {
        Ok(lookups) => lookups,
        Err(e) => {
            eprintln!("Error loading lookup tables: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let pipeline = SmaaPipeline::new(lookups);
    let mut view = ViewState::new();
    let mut reports = Vec::with_capacity(frames.len());
    let mut passed_through = 0;

    for (index, frame) in frames.iter().enumerate() {
        let buffers = match FrameBuffers::load(frame, args) {
            Ok(buffers) => buffers,
            Err((path, e)) => {
                eprintln!("Error reading {}: {}", path.display(), e);
                return ExitCode::from(EXIT_ERROR);
            }
        };

        let request = FrameRequest::new(buffers.inputs(), config)
            .with_camera_cut(args.is_camera_cut(index));
        let output = pipeline.run_frame(&request, Some(&mut view));
        if let FrameOutcome::PassThrough(reason) = output.outcome {
            log::info!("{} passed through: {:?}", frame.display(), reason);
            passed_through += 1;
        }

        let Some(name) = frame.file_name() else {
            continue;
        };
        let target = args.out.join(name);
        if let Err(e) = save_png(&to_rgb8(&output.image), &target) {
            eprintln!("Error writing {}: {}", target.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
        reports.push(FrameReport {
            frame: frame.clone(),
            output: target,
            outcome: format!("{:?}", output.outcome),
            jitter: output.jitter.map(|j| j.index),
        });
    }

    if args.json {
        let report = FilterReport { frames: reports, passed_through };
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
        return ExitCode::from(EXIT_SUCCESS);
    }

    println!(
        "Filtered {} frame(s) into {} ({} passed through)",
        frames.len(),
        args.out.display(),
        passed_through
    );
    ExitCode::from(EXIT_SUCCESS)
}
