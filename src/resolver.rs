//! Configuration resolver.
//!
//! Owns the canonical `Request` and derives every operating parameter the
//! pipeline builder reads. Two passes mutate the request:
//!
//! 1. `normalize` runs at construction.
//! 2. `reconcile_with_device` runs once the device has been discovered and
//!    narrows the request to what the hardware supports.
//!
//! Everything else is a pure query over the current request.

use serde::Serialize;
use std::fmt;

use crate::device::DeviceCapabilities;
use crate::preview::PreviewName;
use crate::request::{BandwidthMode, CameraName, GuiKind, RawRequest, Request, Source};

pub const BASE_MAX_DISPARITY: u32 = 95;
pub const EXTENDED_DISPARITY_FACTOR: u32 = 2;
pub const SUBPIXEL_DISPARITY_FACTOR: u32 = 32;
/// Video quality used for non-USB links.
pub const REDUCED_POE_QUALITY: u8 = 50;
pub const PREVIEW_SIZE: (u32, u32) = (576, 320);

const HOST_SHAVES: u32 = 8;
const HIGH_RES_SHAVES: u32 = 5;
const DEFAULT_SHAVES: u32 = 6;

/// Stream feeding the neural network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ModelSource {
    Host,
    Color,
    Left,
    Right,
    RectifiedLeft,
    RectifiedRight,
}

impl ModelSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelSource::Host => "host",
            ModelSource::Color => "color",
            ModelSource::Left => "left",
            ModelSource::Right => "right",
            ModelSource::RectifiedLeft => "rectifiedLeft",
            ModelSource::RectifiedRight => "rectifiedRight",
        }
    }
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RgbSensorResolution {
    The1080P,
    The4K,
    The12Mp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum MonoSensorResolution {
    The400P,
    The720P,
    The800P,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum MedianFilter {
    Off,
    Kernel3x3,
    Kernel5x5,
    Kernel7x7,
}

#[derive(Clone, Debug)]
pub struct ConfigurationResolver {
    request: Request,
}

impl ConfigurationResolver {
    /// Builds the canonical request from raw input and normalizes it.
    pub fn new(raw: RawRequest) -> Self {
        let mut resolver = Self {
            request: Request::from_raw(raw),
        };
        resolver.normalize();
        resolver
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn into_request(self) -> Request {
        self.request
    }

    pub(crate) fn set_video_path(&mut self, path: String) {
        if let Source::File(location) = &mut self.request.source {
            *location = path;
        }
    }

    /// Checks option combinations that are allowed but likely wrong.
    /// Pair lists and defaults are already folded by `Request::from_raw`.
    fn normalize(&mut self) {
        let mono_reoriented = self
            .request
            .orientation_overrides
            .keys()
            .any(|camera| camera.is_mono());
        if mono_reoriented && self.uses_depth() {
            log::warn!(
                "changing mono cameras orientation may result in incorrect depth/disparity maps"
            );
        }
    }

    // -------------------- Derived queries --------------------

    pub fn debug(&self) -> bool {
        self.request.debug_requested
    }

    pub fn uses_camera(&self) -> bool {
        self.request.source == Source::Camera
    }

    pub fn uses_neural_net(&self) -> bool {
        self.request.neural_net_requested
    }

    pub fn uses_depth(&self) -> bool {
        self.request.depth_requested && self.uses_camera()
    }

    pub fn low_bandwidth(&self) -> bool {
        self.request.bandwidth_mode == BandwidthMode::Low
    }

    pub fn max_disparity(&self) -> u32 {
        let mut max_disparity = BASE_MAX_DISPARITY;
        if self.request.extended_disparity {
            max_disparity *= EXTENDED_DISPARITY_FACTOR;
        }
        if self.request.subpixel {
            max_disparity *= SUBPIXEL_DISPARITY_FACTOR;
        }
        max_disparity
    }

    /// Scale from raw disparity to the 0..=255 visualisation range.
    pub fn disp_multiplier(&self) -> f64 {
        255.0 / f64::from(self.max_disparity())
    }

    pub fn model_input_source(&self) -> ModelSource {
        if !self.uses_camera() {
            return ModelSource::Host;
        }
        match (self.request.camera_choice, self.uses_depth()) {
            (CameraName::Left, true) => ModelSource::RectifiedLeft,
            (CameraName::Left, false) => ModelSource::Left,
            (CameraName::Right, true) => ModelSource::RectifiedRight,
            (CameraName::Right, false) => ModelSource::Right,
            (CameraName::Color, _) => ModelSource::Color,
        }
    }

    /// Fixed allocation table, explicit override first.
    pub fn shave_count(&self) -> u32 {
        if let Some(shaves) = self.request.shave_count {
            return shaves;
        }
        if !self.uses_camera() {
            return HOST_SHAVES;
        }
        if self.request.rgb_resolution > 1080 {
            return HIGH_RES_SHAVES;
        }
        DEFAULT_SHAVES
    }

    pub fn rgb_resolution(&self) -> RgbSensorResolution {
        match self.request.rgb_resolution {
            2160 => RgbSensorResolution::The4K,
            3040 => RgbSensorResolution::The12Mp,
            _ => RgbSensorResolution::The1080P,
        }
    }

    pub fn mono_resolution(&self) -> MonoSensorResolution {
        match self.request.mono_resolution {
            720 => MonoSensorResolution::The720P,
            800 => MonoSensorResolution::The800P,
            _ => MonoSensorResolution::The400P,
        }
    }

    pub fn median_filter(&self) -> MedianFilter {
        match self.request.stereo_median_size {
            3 => MedianFilter::Kernel3x3,
            5 => MedianFilter::Kernel5x5,
            7 => MedianFilter::Kernel7x7,
            _ => MedianFilter::Off,
        }
    }

    pub fn usb2_mode(&self) -> bool {
        if self.request.force_usb2 {
            log::warn!("FORCE USB2 MODE");
        }
        self.request.force_usb2
    }

    pub fn left_camera_enabled(&self) -> bool {
        self.mono_camera_enabled(
            CameraName::Left,
            PreviewName::Left,
            PreviewName::RectifiedLeft,
        )
    }

    pub fn right_camera_enabled(&self) -> bool {
        self.mono_camera_enabled(
            CameraName::Right,
            PreviewName::Right,
            PreviewName::RectifiedRight,
        )
    }

    fn mono_camera_enabled(
        &self,
        camera: CameraName,
        raw: PreviewName,
        rectified: PreviewName,
    ) -> bool {
        let previews = &self.request.preview_set;
        (self.request.camera_choice == camera && self.uses_neural_net())
            || previews.contains(raw)
            || previews.contains(rectified)
            || self.uses_depth()
    }

    pub fn rgb_camera_enabled(&self) -> bool {
        (self.request.camera_choice == CameraName::Color && self.uses_neural_net())
            || self.request.preview_set.contains(PreviewName::Color)
    }

    pub fn input_size(&self) -> Option<(u32, u32)> {
        self.request.cnn_input_size
    }

    pub fn preview_size(&self) -> (u32, u32) {
        PREVIEW_SIZE
    }

    /// Hosts with ARM CPUs get lighter default processing.
    pub fn low_capabilities(&self) -> bool {
        let arch = std::env::consts::ARCH;
        arch.starts_with("arm") || arch.starts_with("aarch")
    }

    /// Label to count in the frame. A numeric value indexes `labels`.
    pub fn count_label(&self, labels: &[String]) -> Option<String> {
        let label = self.request.count_label.as_deref()?;
        if !label.is_empty() && label.chars().all(|c| c.is_ascii_digit()) {
            let index: usize = label.parse().ok()?;
            let object = labels.get(index)?.to_lowercase();
            log::info!("counting number of {} in the frame", object);
            return Some(object);
        }
        Some(label.to_lowercase())
    }

    // -------------------- Previews --------------------

    /// Fills the default preview set. An explicit selection is left untouched.
    pub fn adjust_preview_to_options(&mut self) {
        if !self.request.preview_set.is_empty() {
            return;
        }

        let uses_depth = self.uses_depth();
        let uses_nn = self.uses_neural_net();
        let low_bandwidth = self.low_bandwidth();
        let previews = &mut self.request.preview_set;

        previews.push(PreviewName::Color);
        if uses_depth {
            if low_bandwidth {
                previews.push(PreviewName::DisparityColor);
            } else {
                previews.push(PreviewName::Depth);
            }
        }

        if self.request.gui_kind == GuiKind::Qt {
            if uses_nn {
                previews.push(PreviewName::NnInput);
            }
            if uses_depth {
                previews.push(PreviewName::DepthRaw);
                previews.push(PreviewName::RectifiedLeft);
                previews.push(PreviewName::RectifiedRight);
            } else {
                previews.push(PreviewName::Left);
                previews.push(PreviewName::Right);
            }
        }
    }

    // -------------------- Device reconciliation --------------------

    /// Narrows the request to the attached device. Never fails: missing
    /// capabilities only switch features off.
    pub fn reconcile_with_device(&mut self, caps: &DeviceCapabilities) {
        if caps.has_stereo_pair() {
            if !self.uses_depth() && self.drop_previews(|name| !name.requires_depth()) {
                self.ensure_previews();
            }
        } else {
            self.disable_stereo();
        }
        self.resolve_bandwidth(caps);
    }

    fn disable_stereo(&mut self) {
        if self.request.depth_requested {
            log::warn!("disabling depth...");
            self.request.depth_requested = false;
        }
        if self.request.spatial_bounding_box {
            log::warn!("disabling spatial bounding boxes...");
            self.request.spatial_bounding_box = false;
        }
        if self.request.camera_choice != CameraName::Color {
            log::warn!("switching source to RGB camera...");
            self.request.camera_choice = CameraName::Color;
        }
        self.drop_previews(PreviewName::available_without_stereo);
        self.ensure_previews();
    }

    /// Removes previews failing `keep`. Returns true when any were removed.
    fn drop_previews(&mut self, keep: impl FnMut(PreviewName) -> bool) -> bool {
        let dropped = self.request.preview_set.retain(keep);
        for name in &dropped {
            log::warn!("disabling {} preview...", name);
        }
        !dropped.is_empty()
    }

    /// An empty set falls back to the color preview, plus the NN input when
    /// the network runs.
    fn ensure_previews(&mut self) {
        if !self.request.preview_set.is_empty() {
            return;
        }
        log::warn!("no previews available, adding color and nnInput...");
        self.request.preview_set.push(PreviewName::Color);
        if self.uses_neural_net() {
            self.request.preview_set.push(PreviewName::NnInput);
        }
    }

    fn resolve_bandwidth(&mut self, caps: &DeviceCapabilities) {
        if self.request.bandwidth_mode != BandwidthMode::Auto {
            return;
        }
        if !caps.transport_protocol.is_high_throughput_usb() {
            log::info!(
                "enabling low-bandwidth mode due to connection mode... (protocol: {})",
                caps.transport_protocol
            );
            self.request.bandwidth_mode = BandwidthMode::Low;
            log::info!(
                "setting PoE video quality to {} to reduce latency...",
                REDUCED_POE_QUALITY
            );
            self.request.poe_quality = REDUCED_POE_QUALITY;
        } else if !caps.usb_link_speed.is_super_speed() {
            log::info!(
                "enabling low-bandwidth mode due to low USB speed... (speed: {})",
                caps.usb_link_speed
            );
            self.request.bandwidth_mode = BandwidthMode::Low;
        } else {
            self.request.bandwidth_mode = BandwidthMode::High;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{CameraSocket, TransportProtocol, UsbSpeed};
    use crate::preview::PreviewSet;
    use crate::request::Orientation;

    fn usb3_caps(sockets: &[CameraSocket]) -> DeviceCapabilities {
        DeviceCapabilities::new(
            sockets.iter().copied(),
            TransportProtocol::UsbVsc,
            UsbSpeed::Super,
        )
    }

    fn previews(names: &[PreviewName]) -> PreviewSet {
        names.iter().copied().collect()
    }

    #[test]
    fn max_disparity_compounds_multiplicatively() {
        let cases = [
            (false, false, 95),
            (true, false, 190),
            (false, true, 3040),
            (true, true, 6080),
        ];
        for (extended_disparity, subpixel, expected) in cases {
            let resolver = ConfigurationResolver::new(RawRequest {
                extended_disparity,
                subpixel,
                ..RawRequest::default()
            });
            assert_eq!(resolver.max_disparity(), expected);
            assert!((resolver.disp_multiplier() - 255.0 / expected as f64).abs() < 1e-12);
        }
    }

    #[test]
    fn depth_needs_a_live_camera() {
        let resolver = ConfigurationResolver::new(RawRequest {
            video: Some("clip.mp4".to_string()),
            ..RawRequest::default()
        });
        assert!(!resolver.uses_camera());
        assert!(!resolver.uses_depth());

        let resolver = ConfigurationResolver::new(RawRequest::default());
        assert!(resolver.uses_depth());
    }

    #[test]
    fn model_source_follows_depth_state() {
        let with = |camera, disable_depth| {
            ConfigurationResolver::new(RawRequest {
                camera,
                disable_depth,
                ..RawRequest::default()
            })
            .model_input_source()
        };
        assert_eq!(with(CameraName::Left, false), ModelSource::RectifiedLeft);
        assert_eq!(with(CameraName::Right, false), ModelSource::RectifiedRight);
        assert_eq!(with(CameraName::Left, true), ModelSource::Left);
        assert_eq!(with(CameraName::Right, true), ModelSource::Right);
        assert_eq!(with(CameraName::Color, false), ModelSource::Color);
        assert_eq!(with(CameraName::Color, true), ModelSource::Color);
    }

    #[test]
    fn shave_table() {
        let shaves = |raw: RawRequest| ConfigurationResolver::new(raw).shave_count();
        assert_eq!(shaves(RawRequest::default()), 6);
        assert_eq!(
            shaves(RawRequest {
                rgb_resolution: 2160,
                ..RawRequest::default()
            }),
            5
        );
        assert_eq!(
            shaves(RawRequest {
                video: Some("clip.mp4".to_string()),
                rgb_resolution: 3040,
                ..RawRequest::default()
            }),
            8
        );
        assert_eq!(
            shaves(RawRequest {
                shaves: Some(13),
                video: Some("clip.mp4".to_string()),
                ..RawRequest::default()
            }),
            13
        );
    }

    #[test]
    fn sensor_selectors_fall_back_to_smallest_mode() {
        let resolver = ConfigurationResolver::new(RawRequest {
            rgb_resolution: 2160,
            mono_resolution: 800,
            stereo_median_size: 5,
            ..RawRequest::default()
        });
        assert_eq!(resolver.rgb_resolution(), RgbSensorResolution::The4K);
        assert_eq!(resolver.mono_resolution(), MonoSensorResolution::The800P);
        assert_eq!(resolver.median_filter(), MedianFilter::Kernel5x5);

        let resolver = ConfigurationResolver::new(RawRequest {
            rgb_resolution: 720,
            mono_resolution: 480,
            stereo_median_size: 0,
            ..RawRequest::default()
        });
        assert_eq!(resolver.rgb_resolution(), RgbSensorResolution::The1080P);
        assert_eq!(resolver.mono_resolution(), MonoSensorResolution::The400P);
        assert_eq!(resolver.median_filter(), MedianFilter::Off);
    }

    #[test]
    fn default_previews_basic_gui() {
        let mut resolver = ConfigurationResolver::new(RawRequest::default());
        resolver.adjust_preview_to_options();
        assert_eq!(
            resolver.request().preview_set,
            previews(&[PreviewName::Color, PreviewName::Depth])
        );

        let mut resolver = ConfigurationResolver::new(RawRequest {
            bandwidth: BandwidthMode::Low,
            ..RawRequest::default()
        });
        resolver.adjust_preview_to_options();
        assert_eq!(
            resolver.request().preview_set,
            previews(&[PreviewName::Color, PreviewName::DisparityColor])
        );
    }

    #[test]
    fn default_previews_advanced_gui() {
        let mut resolver = ConfigurationResolver::new(RawRequest {
            gui: GuiKind::Qt,
            ..RawRequest::default()
        });
        resolver.adjust_preview_to_options();
        assert_eq!(
            resolver.request().preview_set,
            previews(&[
                PreviewName::Color,
                PreviewName::Depth,
                PreviewName::NnInput,
                PreviewName::DepthRaw,
                PreviewName::RectifiedLeft,
                PreviewName::RectifiedRight,
            ])
        );

        let mut resolver = ConfigurationResolver::new(RawRequest {
            gui: GuiKind::Qt,
            disable_depth: true,
            disable_neural_network: true,
            ..RawRequest::default()
        });
        resolver.adjust_preview_to_options();
        assert_eq!(
            resolver.request().preview_set,
            previews(&[PreviewName::Color, PreviewName::Left, PreviewName::Right])
        );
    }

    #[test]
    fn explicit_previews_are_never_replaced() {
        let mut resolver = ConfigurationResolver::new(RawRequest {
            show: vec![PreviewName::Right, PreviewName::Disparity],
            gui: GuiKind::Qt,
            ..RawRequest::default()
        });
        let before = resolver.request().clone();
        resolver.adjust_preview_to_options();
        assert_eq!(resolver.request(), &before);
    }

    #[test]
    fn missing_stereo_pair_disables_depth_features() {
        let mut resolver = ConfigurationResolver::new(RawRequest {
            camera: CameraName::Left,
            spatial_bounding_box: true,
            show: vec![PreviewName::Depth, PreviewName::NnInput, PreviewName::Left],
            ..RawRequest::default()
        });
        resolver.reconcile_with_device(&usb3_caps(&[CameraSocket::Color, CameraSocket::Left]));

        let request = resolver.request();
        assert!(!resolver.uses_depth());
        assert!(!request.spatial_bounding_box);
        assert_eq!(request.camera_choice, CameraName::Color);
        assert_eq!(request.preview_set, previews(&[PreviewName::NnInput]));
    }

    #[test]
    fn emptied_previews_fall_back_to_color() {
        let mut resolver = ConfigurationResolver::new(RawRequest {
            show: vec![PreviewName::RectifiedLeft, PreviewName::Depth],
            disable_neural_network: true,
            ..RawRequest::default()
        });
        resolver.reconcile_with_device(&usb3_caps(&[CameraSocket::Color]));
        assert_eq!(resolver.request().preview_set, previews(&[PreviewName::Color]));
    }

    #[test]
    fn stereo_device_without_depth_drops_depth_previews() {
        let mut resolver = ConfigurationResolver::new(RawRequest {
            disable_depth: true,
            show: vec![PreviewName::Left, PreviewName::DisparityColor],
            ..RawRequest::default()
        });
        resolver.reconcile_with_device(&usb3_caps(&[
            CameraSocket::Left,
            CameraSocket::Right,
            CameraSocket::Color,
        ]));
        assert!(!resolver.uses_depth());
        assert_eq!(resolver.request().preview_set, previews(&[PreviewName::Left]));
    }

    #[test]
    fn stereo_device_keeps_depth_request() {
        let mut resolver = ConfigurationResolver::new(RawRequest {
            camera: CameraName::Left,
            show: vec![PreviewName::Depth],
            ..RawRequest::default()
        });
        resolver.reconcile_with_device(&usb3_caps(&[
            CameraSocket::Left,
            CameraSocket::Right,
            CameraSocket::Color,
        ]));
        assert!(resolver.uses_depth());
        assert_eq!(resolver.model_input_source(), ModelSource::RectifiedLeft);
        assert_eq!(resolver.request().preview_set, previews(&[PreviewName::Depth]));
    }

    #[test]
    fn bandwidth_resolution_table() {
        let resolve = |protocol, speed| {
            let mut resolver = ConfigurationResolver::new(RawRequest::default());
            resolver.reconcile_with_device(&DeviceCapabilities::new(
                [CameraSocket::Color],
                protocol,
                speed,
            ));
            let request = resolver.into_request();
            (request.bandwidth_mode, request.poe_quality)
        };
        assert_eq!(
            resolve(TransportProtocol::TcpIp, UsbSpeed::Unknown),
            (BandwidthMode::Low, REDUCED_POE_QUALITY)
        );
        assert_eq!(
            resolve(TransportProtocol::UsbVsc, UsbSpeed::High),
            (BandwidthMode::Low, 100)
        );
        assert_eq!(
            resolve(TransportProtocol::UsbVsc, UsbSpeed::SuperPlus),
            (BandwidthMode::High, 100)
        );
    }

    #[test]
    fn explicit_bandwidth_is_kept() {
        let mut resolver = ConfigurationResolver::new(RawRequest {
            bandwidth: BandwidthMode::High,
            ..RawRequest::default()
        });
        resolver.reconcile_with_device(&DeviceCapabilities::new(
            [CameraSocket::Color],
            TransportProtocol::TcpIp,
            UsbSpeed::Unknown,
        ));
        assert_eq!(resolver.request().bandwidth_mode, BandwidthMode::High);
        assert_eq!(resolver.request().poe_quality, 100);
    }

    #[test]
    fn camera_enablement() {
        let resolver = ConfigurationResolver::new(RawRequest {
            disable_depth: true,
            camera: CameraName::Right,
            show: vec![PreviewName::RectifiedLeft],
            ..RawRequest::default()
        });
        assert!(resolver.left_camera_enabled());
        assert!(resolver.right_camera_enabled());
        assert!(!resolver.rgb_camera_enabled());

        let resolver = ConfigurationResolver::new(RawRequest {
            disable_depth: true,
            disable_neural_network: true,
            camera: CameraName::Right,
            show: vec![PreviewName::Color],
            ..RawRequest::default()
        });
        assert!(!resolver.left_camera_enabled());
        assert!(!resolver.right_camera_enabled());
        assert!(resolver.rgb_camera_enabled());
    }

    #[test]
    fn count_label_lookup() {
        let labels = vec!["Background".to_string(), "Person".to_string()];
        let label = |value: Option<&str>| {
            ConfigurationResolver::new(RawRequest {
                count_label: value.map(str::to_string),
                ..RawRequest::default()
            })
            .count_label(&labels)
        };
        assert_eq!(label(None), None);
        assert_eq!(label(Some("1")), Some("person".to_string()));
        assert_eq!(label(Some("7")), None);
        assert_eq!(label(Some("Car")), Some("car".to_string()));
    }

    #[test]
    fn mono_orientation_with_depth_still_normalizes() {
        let resolver = ConfigurationResolver::new(RawRequest {
            camera_orientation: vec![(CameraName::Left, Orientation::Rotate180Deg)],
            ..RawRequest::default()
        });
        assert!(resolver.uses_depth());
        assert_eq!(
            resolver.request().orientation_overrides[&CameraName::Left],
            Orientation::Rotate180Deg
        );
    }
}
