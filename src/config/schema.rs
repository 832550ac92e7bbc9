//! Configuration schema types for `smaa.toml`
//!
//! Raw settings may come from a config file, CLI flags, or a host settings
//! store and are never trusted: [`RawSettings::resolve`] clamps every value
//! into its documented range and produces the [`PipelineConfig`] the stages
//! consume.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Quality preset.
///
/// Selects the base edge threshold and whether diagonal search and corner
/// detection take part in the blending weight stage:
///
/// | Preset | Threshold | Diagonals | Corners |
/// |--------|-----------|-----------|---------|
/// | `low` | 0.15 | no | no |
/// | `medium` | 0.10 | no | no |
/// | `high` | 0.10 | yes | yes |
/// | `ultra` | 0.05 | yes | yes |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Low,
    Medium,
    High,
    #[default]
    Ultra,
}

impl Preset {
    /// Base luma/colour edge threshold for this preset.
    pub fn threshold(&self) -> f32 {
        match self {
            Preset::Low => 0.15,
            Preset::Medium => 0.1,
            Preset::High => 0.1,
            Preset::Ultra => 0.05,
        }
    }

    /// Returns true if diagonal patterns are searched.
    pub fn diagonal_detection(&self) -> bool {
        matches!(self, Preset::High | Preset::Ultra)
    }

    /// Returns true if sharp corners are detected and kept.
    pub fn corner_detection(&self) -> bool {
        matches!(self, Preset::High | Preset::Ultra)
    }
}

/// Which signal the edge detection stage compares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EdgeDetector {
    /// Scene depth discontinuities
    Depth,
    /// Rec. 709 luma of the scene colour
    Luminance,
    /// Maximum per-channel colour difference
    Colour,
    /// World-space normal discontinuities
    #[default]
    Normal,
}

/// Secondary signal used to locally adjust the edge threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PredicationSource {
    #[default]
    None,
    Depth,
    WorldNormal,
    /// Specular / roughness / metallic material signal
    MaterialSignal,
}

impl PredicationSource {
    /// Returns true if predicated thresholding is active.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, PredicationSource::None)
    }
}

/// Intermediate buffer substituted for the final frame, for inspection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DebugVisualization {
    #[default]
    Off,
    /// Output the edge mask
    Edges,
    /// Output the blending weights
    BlendWeights,
}

impl DebugVisualization {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, DebugVisualization::Off)
    }
}

macro_rules! display_as_serde_name {
    ($ty:ty { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(<$ty>::$variant => write!(f, $name),)+
                }
            }
        }
    };
}

display_as_serde_name!(Preset { Low => "low", Medium => "medium", High => "high", Ultra => "ultra" });
display_as_serde_name!(EdgeDetector {
    Depth => "depth",
    Luminance => "luminance",
    Colour => "colour",
    Normal => "normal",
});
display_as_serde_name!(PredicationSource {
    None => "none",
    Depth => "depth",
    WorldNormal => "world-normal",
    MaterialSignal => "material-signal",
});
display_as_serde_name!(DebugVisualization {
    Off => "off",
    Edges => "edges",
    BlendWeights => "blend-weights",
});

/// An enum that can also be selected by its integer index.
///
/// Out-of-range indices clamp to the first or last variant.
pub trait IndexedChoice: Copy + 'static {
    const VARIANTS: &'static [Self];

    fn from_index(index: i64) -> Self {
        let last = Self::VARIANTS.len() as i64 - 1;
        Self::VARIANTS[index.clamp(0, last) as usize]
    }
}

impl IndexedChoice for Preset {
    const VARIANTS: &'static [Self] = &[Preset::Low, Preset::Medium, Preset::High, Preset::Ultra];
}

impl IndexedChoice for EdgeDetector {
    const VARIANTS: &'static [Self] =
        &[EdgeDetector::Depth, EdgeDetector::Luminance, EdgeDetector::Colour, EdgeDetector::Normal];
}

impl IndexedChoice for PredicationSource {
    const VARIANTS: &'static [Self] = &[
        PredicationSource::None,
        PredicationSource::Depth,
        PredicationSource::WorldNormal,
        PredicationSource::MaterialSignal,
    ];
}

/// A raw enum setting, written either by name (`"ultra"`) or index (`3`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Choice<T> {
    Named(T),
    Index(i64),
}

impl<T: IndexedChoice> Choice<T> {
    pub fn resolve(self) -> T {
        match self {
            Choice::Named(value) => value,
            Choice::Index(index) => T::from_index(index),
        }
    }
}

impl<T> From<T> for Choice<T> {
    fn from(value: T) -> Self {
        Choice::Named(value)
    }
}

/// Unvalidated SMAA settings, as stored in the `[smaa]` table of `smaa.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSettings {
    /// Master enable flag (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Quality preset, index 0-3 (default: ultra)
    #[serde(default = "default_preset")]
    pub preset: Choice<Preset>,

    /// Edge detector source, index 0-3 (default: normal)
    #[serde(default = "default_edge_detector")]
    pub edge_detector: Choice<EdgeDetector>,

    /// Predication source, index 0-3 (default: none)
    #[serde(default = "default_predication")]
    pub predication: Choice<PredicationSource>,

    /// Orthogonal search steps (two pixels per step) [0 - 112]
    #[serde(default = "default_max_search_steps")]
    pub max_search_steps: i64,

    /// Diagonal search steps [0 - 20]
    #[serde(default = "default_max_diagonal_search_steps")]
    pub max_diagonal_search_steps: i64,

    /// How much sharp corners are rounded, in percent [0 - 100]
    #[serde(default = "default_corner_rounding")]
    pub corner_rounding: i64,

    /// Local contrast adaptation factor [0 - 10]
    #[serde(default = "default_adaptation_factor")]
    pub adaptation_factor: f32,

    /// Velocity rejection strength [0 - 100]. Low values ghost, high values
    /// disable temporal supersampling under motion.
    #[serde(default = "default_reprojection_weight")]
    pub reprojection_weight: f32,

    /// Threshold used on the predication buffer [0 - 1]
    #[serde(default = "default_predication_threshold")]
    pub predication_threshold: f32,

    /// How much the global threshold is scaled when predicating [1 - 5]
    #[serde(default = "default_predication_scale")]
    pub predication_scale: f32,

    /// How much the threshold is locally decreased [0 - 1]
    #[serde(default = "default_predication_strength")]
    pub predication_strength: f32,

    /// Base weight given to the previous frame [0 - 1)
    #[serde(default = "default_temporal_history_bias")]
    pub temporal_history_bias: f32,

    /// Substitute an intermediate buffer for the final frame
    #[serde(default)]
    pub visualize: DebugVisualization,
}

fn default_true() -> bool {
    true
}

fn default_preset() -> Choice<Preset> {
    Choice::Named(Preset::Ultra)
}

fn default_edge_detector() -> Choice<EdgeDetector> {
    Choice::Named(EdgeDetector::Normal)
}

fn default_predication() -> Choice<PredicationSource> {
    Choice::Named(PredicationSource::None)
}

fn default_max_search_steps() -> i64 {
    8
}

fn default_max_diagonal_search_steps() -> i64 {
    16
}

fn default_corner_rounding() -> i64 {
    25
}

fn default_adaptation_factor() -> f32 {
    2.0
}

fn default_reprojection_weight() -> f32 {
    25.0
}

fn default_predication_threshold() -> f32 {
    0.04
}

fn default_predication_scale() -> f32 {
    2.0
}

fn default_predication_strength() -> f32 {
    0.4
}

fn default_temporal_history_bias() -> f32 {
    0.4
}

impl Default for RawSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            preset: default_preset(),
            edge_detector: default_edge_detector(),
            predication: default_predication(),
            max_search_steps: default_max_search_steps(),
            max_diagonal_search_steps: default_max_diagonal_search_steps(),
            corner_rounding: default_corner_rounding(),
            adaptation_factor: default_adaptation_factor(),
            reprojection_weight: default_reprojection_weight(),
            predication_threshold: default_predication_threshold(),
            predication_scale: default_predication_scale(),
            predication_strength: default_predication_strength(),
            temporal_history_bias: default_temporal_history_bias(),
            visualize: DebugVisualization::Off,
        }
    }
}

/// Largest history bias; the current frame always keeps some weight.
pub const MAX_TEMPORAL_HISTORY_BIAS: f32 = 1.0 - 1e-4;

/// Clamp a float setting; infinities clamp to the nearest bound and NaN
/// takes the default.
fn clamp_or_default(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(min, max)
    }
}

impl RawSettings {
    /// Clamp every value into its documented range.
    ///
    /// Pure and infallible: out-of-range input is silently clamped.
    ///
    /// # Examples
    ///
    /// ```
    /// use smaa_t2x::config::RawSettings;
    ///
    /// let raw = RawSettings { corner_rounding: 500, ..Default::default() };
    /// assert_eq!(raw.resolve().corner_rounding(), 100);
    /// ```
    pub fn resolve(&self) -> PipelineConfig {
        PipelineConfig {
            enabled: self.enabled,
            preset: self.preset.resolve(),
            edge_detector: self.edge_detector.resolve(),
            predication: self.predication.resolve(),
            max_search_steps: self.max_search_steps.clamp(0, 112) as u8,
            max_diagonal_search_steps: self.max_diagonal_search_steps.clamp(0, 20) as u8,
            corner_rounding: self.corner_rounding.clamp(0, 100) as u8,
            adaptation_factor: clamp_or_default(
                self.adaptation_factor,
                0.0,
                10.0,
                default_adaptation_factor(),
            ),
            reprojection_weight: clamp_or_default(
                self.reprojection_weight,
                0.0,
                100.0,
                default_reprojection_weight(),
            ),
            predication_threshold: clamp_or_default(
                self.predication_threshold,
                0.0,
                1.0,
                default_predication_threshold(),
            ),
            predication_scale: clamp_or_default(
                self.predication_scale,
                1.0,
                5.0,
                default_predication_scale(),
            ),
            predication_strength: clamp_or_default(
                self.predication_strength,
                0.0,
                1.0,
                default_predication_strength(),
            ),
            temporal_history_bias: clamp_or_default(
                self.temporal_history_bias,
                0.0,
                MAX_TEMPORAL_HISTORY_BIAS,
                default_temporal_history_bias(),
            ),
            visualize: self.visualize,
        }
    }
}

/// Resolved, range-checked settings consumed by the pipeline.
///
/// Only [`RawSettings::resolve`] constructs one, so stages never observe an
/// out-of-range value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    enabled: bool,
    preset: Preset,
    edge_detector: EdgeDetector,
    predication: PredicationSource,
    max_search_steps: u8,
    max_diagonal_search_steps: u8,
    corner_rounding: u8,
    adaptation_factor: f32,
    reprojection_weight: f32,
    predication_threshold: f32,
    predication_scale: f32,
    predication_strength: f32,
    temporal_history_bias: f32,
    visualize: DebugVisualization,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        RawSettings::default().resolve()
    }
}

impl PipelineConfig {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn preset(&self) -> Preset {
        self.preset
    }

    pub fn edge_detector(&self) -> EdgeDetector {
        self.edge_detector
    }

    pub fn predication(&self) -> PredicationSource {
        self.predication
    }

    /// Orthogonal search steps, each covering two pixels.
    pub fn max_search_steps(&self) -> u8 {
        self.max_search_steps
    }

    pub fn max_diagonal_search_steps(&self) -> u8 {
        self.max_diagonal_search_steps
    }

    /// Corner rounding in percent, 0-100.
    pub fn corner_rounding(&self) -> u8 {
        self.corner_rounding
    }

    /// Corner rounding as a fraction, 0-1.
    pub fn corner_rounding_norm(&self) -> f32 {
        self.corner_rounding as f32 * 0.01
    }

    pub fn adaptation_factor(&self) -> f32 {
        self.adaptation_factor
    }

    pub fn reprojection_weight(&self) -> f32 {
        self.reprojection_weight
    }

    pub fn predication_threshold(&self) -> f32 {
        self.predication_threshold
    }

    pub fn predication_scale(&self) -> f32 {
        self.predication_scale
    }

    pub fn predication_strength(&self) -> f32 {
        self.predication_strength
    }

    pub fn temporal_history_bias(&self) -> f32 {
        self.temporal_history_bias
    }

    pub fn visualize(&self) -> DebugVisualization {
        self.visualize
    }

    /// Base edge threshold of the selected preset.
    pub fn threshold(&self) -> f32 {
        self.preset.threshold()
    }
}

/// Root of `smaa.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmaaToml {
    #[serde(default)]
    pub smaa: RawSettings,
}
