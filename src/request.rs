//! User intent.
//!
//! `RawRequest` is what the command line (or an embedding application)
//! hands over: collection options arrive as lists of `(name, value)` pairs.
//! `Request` is the canonical form owned by the resolver, with those lists
//! folded into mappings.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::preview::{PreviewName, PreviewSet};

pub const DEFAULT_COLOR_SCALE: f32 = 0.37;
pub const DEFAULT_RGB_RESOLUTION: u32 = 1080;
pub const DEFAULT_MONO_RESOLUTION: u32 = 400;
pub const DEFAULT_STEREO_MEDIAN_SIZE: u32 = 7;
pub const DEFAULT_POE_QUALITY: u8 = 100;
pub const DEFAULT_COLOR_MAP: &str = "JET";

fn parse_keyword<T: Copy>(kind: &str, value: &str, table: &[(&str, T)]) -> Result<T> {
    table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(value.trim()))
        .map(|(_, v)| *v)
        .ok_or_else(|| {
            let expected: Vec<&str> = table.iter().map(|(name, _)| *name).collect();
            anyhow!(
                "invalid {} '{}' (expected one of: {})",
                kind,
                value,
                expected.join(", ")
            )
        })
}

// -------------------- Enumerations --------------------

/// Where frames come from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Camera,
    /// Local path or remote URL of a recording.
    File(String),
}

/// Physical sensor names, used both for the NN input choice and as keys of
/// per-camera options.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraName {
    Left,
    Right,
    Color,
}

impl CameraName {
    const TABLE: [(&'static str, CameraName); 3] = [
        ("left", CameraName::Left),
        ("right", CameraName::Right),
        ("color", CameraName::Color),
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CameraName::Left => "left",
            CameraName::Right => "right",
            CameraName::Color => "color",
        }
    }

    pub fn is_mono(self) -> bool {
        matches!(self, CameraName::Left | CameraName::Right)
    }
}

impl fmt::Display for CameraName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CameraName {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_keyword("camera", s, &Self::TABLE)
    }
}

/// Sensor image orientation override.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Orientation {
    Auto,
    Normal,
    HorizontalMirror,
    VerticalFlip,
    #[serde(rename = "ROTATE_180_DEG")]
    Rotate180Deg,
}

impl FromStr for Orientation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_keyword(
            "orientation",
            s,
            &[
                ("AUTO", Orientation::Auto),
                ("NORMAL", Orientation::Normal),
                ("HORIZONTAL_MIRROR", Orientation::HorizontalMirror),
                ("VERTICAL_FLIP", Orientation::VerticalFlip),
                ("ROTATE_180_DEG", Orientation::Rotate180Deg),
            ],
        )
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandwidthMode {
    #[default]
    Auto,
    Low,
    High,
}

impl FromStr for BandwidthMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_keyword(
            "bandwidth mode",
            s,
            &[
                ("auto", BandwidthMode::Auto),
                ("low", BandwidthMode::Low),
                ("high", BandwidthMode::High),
            ],
        )
    }
}

/// Preview front-end. `Qt` is the advanced GUI with the extended default
/// preview set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuiKind {
    #[default]
    Cv,
    Qt,
}

impl FromStr for GuiKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_keyword("gui", s, &[("cv", GuiKind::Cv), ("qt", GuiKind::Qt)])
    }
}

// -------------------- Raw request --------------------

/// Request as supplied by the caller, before canonicalisation.
#[derive(Clone, Debug, PartialEq)]
pub struct RawRequest {
    /// Video path or URL; `None` means live camera.
    pub video: Option<String>,
    pub camera: CameraName,
    pub disable_depth: bool,
    pub disable_neural_network: bool,
    pub no_debug: bool,
    pub camera_orientation: Vec<(CameraName, Orientation)>,
    /// `None` selects the default color scale.
    pub scale: Option<Vec<(PreviewName, f32)>>,
    /// Per-camera recording frame rate.
    pub encode: Vec<(CameraName, u32)>,
    pub show: Vec<PreviewName>,
    pub bandwidth: BandwidthMode,
    pub rgb_resolution: u32,
    pub mono_resolution: u32,
    pub stereo_median_size: u32,
    pub extended_disparity: bool,
    pub subpixel: bool,
    pub shaves: Option<u32>,
    pub gui: GuiKind,
    pub spatial_bounding_box: bool,
    pub poe_quality: u8,
    pub force_usb2: bool,
    pub cnn_model: Option<String>,
    pub cnn_path: Option<PathBuf>,
    pub cnn_input_size: Option<(u32, u32)>,
    pub count_label: Option<String>,
    pub color_map: String,
}

impl Default for RawRequest {
    fn default() -> Self {
        Self {
            video: None,
            camera: CameraName::Color,
            disable_depth: false,
            disable_neural_network: false,
            no_debug: false,
            camera_orientation: Vec::new(),
            scale: None,
            encode: Vec::new(),
            show: Vec::new(),
            bandwidth: BandwidthMode::Auto,
            rgb_resolution: DEFAULT_RGB_RESOLUTION,
            mono_resolution: DEFAULT_MONO_RESOLUTION,
            stereo_median_size: DEFAULT_STEREO_MEDIAN_SIZE,
            extended_disparity: false,
            subpixel: false,
            shaves: None,
            gui: GuiKind::Cv,
            spatial_bounding_box: false,
            poe_quality: DEFAULT_POE_QUALITY,
            force_usb2: false,
            cnn_model: None,
            cnn_path: None,
            cnn_input_size: None,
            count_label: None,
            color_map: DEFAULT_COLOR_MAP.to_string(),
        }
    }
}

// -------------------- Canonical request --------------------

/// Canonical request. Owned by `ConfigurationResolver`; only the resolver's
/// two passes mutate it.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub source: Source,
    pub camera_choice: CameraName,
    pub depth_requested: bool,
    pub neural_net_requested: bool,
    pub debug_requested: bool,
    pub orientation_overrides: BTreeMap<CameraName, Orientation>,
    pub scale_factors: BTreeMap<PreviewName, f32>,
    pub encode: BTreeMap<CameraName, u32>,
    pub preview_set: PreviewSet,
    pub bandwidth_mode: BandwidthMode,
    pub rgb_resolution: u32,
    pub mono_resolution: u32,
    pub stereo_median_size: u32,
    pub extended_disparity: bool,
    pub subpixel: bool,
    pub shave_count: Option<u32>,
    pub gui_kind: GuiKind,
    pub spatial_bounding_box: bool,
    pub poe_quality: u8,
    pub force_usb2: bool,
    pub cnn_model: Option<String>,
    pub cnn_path: Option<PathBuf>,
    pub cnn_input_size: Option<(u32, u32)>,
    pub count_label: Option<String>,
    pub color_map: String,
}

impl Request {
    /// Folds pair lists into mappings (last pair wins) and fills defaults.
    pub(crate) fn from_raw(raw: RawRequest) -> Self {
        let scale_factors = match raw.scale {
            Some(pairs) => pairs.into_iter().collect(),
            None => BTreeMap::from([(PreviewName::Color, DEFAULT_COLOR_SCALE)]),
        };
        Self {
            source: match raw.video {
                Some(video) => Source::File(video),
                None => Source::Camera,
            },
            camera_choice: raw.camera,
            depth_requested: !raw.disable_depth,
            neural_net_requested: !raw.disable_neural_network,
            debug_requested: !raw.no_debug,
            orientation_overrides: raw.camera_orientation.into_iter().collect(),
            scale_factors,
            encode: raw.encode.into_iter().collect(),
            preview_set: raw.show.into_iter().collect(),
            bandwidth_mode: raw.bandwidth,
            rgb_resolution: raw.rgb_resolution,
            mono_resolution: raw.mono_resolution,
            stereo_median_size: raw.stereo_median_size,
            extended_disparity: raw.extended_disparity,
            subpixel: raw.subpixel,
            shave_count: raw.shaves,
            gui_kind: raw.gui,
            spatial_bounding_box: raw.spatial_bounding_box,
            poe_quality: raw.poe_quality,
            force_usb2: raw.force_usb2,
            cnn_model: raw.cnn_model,
            cnn_path: raw.cnn_path,
            cnn_input_size: raw.cnn_input_size,
            count_label: raw.count_label,
            color_map: raw.color_map,
        }
    }
}
