//! Command line surface.
//!
//! Every option is typed and validated here, so `ConfigurationResolver`
//! never sees an unknown camera, preview or out-of-range value.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::AppConfig;
use crate::preview::PreviewName;
use crate::request::{
    BandwidthMode, CameraName, GuiKind, Orientation, RawRequest, DEFAULT_COLOR_MAP,
    DEFAULT_MONO_RESOLUTION, DEFAULT_POE_QUALITY, DEFAULT_RGB_RESOLUTION,
    DEFAULT_STEREO_MEDIAN_SIZE,
};

#[derive(Parser, Debug)]
#[command(
    name = "depth_setup",
    version,
    about = "Resolve depth camera runtime configuration"
)]
pub struct Args {
    /// Camera feeding the neural network.
    #[arg(long, default_value = "color")]
    pub camera: CameraName,
    #[arg(long)]
    pub disable_depth: bool,
    #[arg(long)]
    pub disable_neural_network: bool,
    #[arg(long)]
    pub no_debug: bool,
    /// Video file path or https URL to use instead of the camera.
    #[arg(long)]
    pub video: Option<String>,
    /// Previews to display, in order.
    #[arg(long, value_delimiter = ',')]
    pub show: Vec<PreviewName>,
    /// Orientation override as `camera,ORIENTATION` (repeatable).
    #[arg(long, value_parser = parse_orientation)]
    pub camera_orientation: Vec<(CameraName, Orientation)>,
    /// Preview scale as `preview,factor` with factor in (0, 1] (repeatable).
    #[arg(long, value_parser = parse_scale)]
    pub scale: Vec<(PreviewName, f32)>,
    /// Record a camera as `camera,fps` (repeatable).
    #[arg(long, value_parser = parse_encode)]
    pub encode: Vec<(CameraName, u32)>,
    /// auto, low or high. Defaults to the configured mode.
    #[arg(long)]
    pub bandwidth: Option<BandwidthMode>,
    #[arg(long, default_value_t = DEFAULT_RGB_RESOLUTION, value_parser = parse_rgb_resolution)]
    pub rgb_resolution: u32,
    #[arg(long, default_value_t = DEFAULT_MONO_RESOLUTION, value_parser = parse_mono_resolution)]
    pub mono_resolution: u32,
    /// Median filter kernel size (0 disables).
    #[arg(long, default_value_t = DEFAULT_STEREO_MEDIAN_SIZE, value_parser = parse_median_size)]
    pub stereo_median_size: u32,
    #[arg(long)]
    pub extended_disparity: bool,
    #[arg(long)]
    pub subpixel: bool,
    /// Number of shaves for the neural network (overrides the default table).
    #[arg(long)]
    pub shaves: Option<u32>,
    #[arg(long, default_value = "cv")]
    pub gui: GuiKind,
    #[arg(long)]
    pub spatial_bounding_box: bool,
    /// Video quality for network-attached devices.
    #[arg(long, default_value_t = DEFAULT_POE_QUALITY, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub poe_quality: u8,
    #[arg(long)]
    pub force_usb2: bool,
    /// Model name in the zoo.
    #[arg(long)]
    pub cnn_model: Option<String>,
    /// Path to a model directory outside the zoo.
    #[arg(long)]
    pub cnn_path: Option<PathBuf>,
    /// Network input size as `WIDTHxHEIGHT`.
    #[arg(long, value_parser = parse_input_size)]
    pub cnn_input_size: Option<(u32, u32)>,
    /// Label (or label index) to count in the frame.
    #[arg(long)]
    pub count_label: Option<String>,
    #[arg(long, default_value = DEFAULT_COLOR_MAP)]
    pub color_map: String,
    /// JSON snapshot of the device capabilities to reconcile against.
    #[arg(long)]
    pub device_caps: Option<PathBuf>,
    /// Print the models available in the zoo and exit.
    #[arg(long)]
    pub list_models: bool,
}

impl Args {
    pub fn to_raw_request(&self, cfg: &AppConfig) -> RawRequest {
        RawRequest {
            video: self.video.clone(),
            camera: self.camera,
            disable_depth: self.disable_depth,
            disable_neural_network: self.disable_neural_network,
            no_debug: self.no_debug,
            camera_orientation: self.camera_orientation.clone(),
            scale: (!self.scale.is_empty()).then(|| self.scale.clone()),
            encode: self.encode.clone(),
            show: self.show.clone(),
            bandwidth: self.bandwidth.unwrap_or(cfg.default_bandwidth),
            rgb_resolution: self.rgb_resolution,
            mono_resolution: self.mono_resolution,
            stereo_median_size: self.stereo_median_size,
            extended_disparity: self.extended_disparity,
            subpixel: self.subpixel,
            shaves: self.shaves,
            gui: self.gui,
            spatial_bounding_box: self.spatial_bounding_box,
            poe_quality: self.poe_quality,
            force_usb2: self.force_usb2,
            cnn_model: self.cnn_model.clone(),
            cnn_path: self.cnn_path.clone(),
            cnn_input_size: self.cnn_input_size,
            count_label: self.count_label.clone(),
            color_map: self.color_map.clone(),
        }
    }
}

fn split_pair<K, V>(value: &str) -> Result<(K, V)>
where
    K: FromStr<Err = anyhow::Error>,
    V: FromStr,
    V::Err: std::fmt::Display,
{
    let (key, val) = value
        .split_once(',')
        .ok_or_else(|| anyhow!("expected NAME,VALUE but got '{}'", value))?;
    let key = key.trim().parse::<K>()?;
    let val = val
        .trim()
        .parse::<V>()
        .map_err(|e| anyhow!("invalid value '{}': {}", val.trim(), e))?;
    Ok((key, val))
}

fn parse_orientation(value: &str) -> Result<(CameraName, Orientation), String> {
    split_pair(value).map_err(|e| e.to_string())
}

fn parse_encode(value: &str) -> Result<(CameraName, u32), String> {
    let (camera, fps): (CameraName, u32) = split_pair(value).map_err(|e| e.to_string())?;
    if fps == 0 {
        return Err(format!("fps for {} must be greater than zero", camera));
    }
    Ok((camera, fps))
}

fn parse_scale(value: &str) -> Result<(PreviewName, f32), String> {
    let (preview, factor): (PreviewName, f32) = split_pair(value).map_err(|e| e.to_string())?;
    if !(factor > 0.0 && factor <= 1.0) {
        return Err(format!(
            "scale for {} must be in (0, 1], got {}",
            preview, factor
        ));
    }
    Ok((preview, factor))
}

fn parse_one_of(value: &str, allowed: &[u32]) -> Result<u32, String> {
    value
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|v| allowed.contains(v))
        .ok_or_else(|| {
            let allowed: Vec<String> = allowed.iter().map(u32::to_string).collect();
            format!("expected one of {} but got '{}'", allowed.join(", "), value)
        })
}

fn parse_rgb_resolution(value: &str) -> Result<u32, String> {
    parse_one_of(value, &[1080, 2160, 3040])
}

fn parse_mono_resolution(value: &str) -> Result<u32, String> {
    parse_one_of(value, &[400, 720, 800])
}

fn parse_median_size(value: &str) -> Result<u32, String> {
    parse_one_of(value, &[0, 3, 5, 7])
}

fn parse_input_size(value: &str) -> Result<(u32, u32), String> {
    let parsed = value
        .split_once('x')
        .and_then(|(w, h)| Some((w.trim().parse::<u32>().ok()?, h.trim().parse::<u32>().ok()?)))
        .filter(|(w, h)| *w > 0 && *h > 0);
    parsed.ok_or_else(|| format!("expected WIDTHxHEIGHT but got '{}'", value))
}
