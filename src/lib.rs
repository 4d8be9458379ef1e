//! Depth camera runtime configuration.
//!
//! This crate derives the operating parameters of a depth camera application
//! (camera selection, resolutions, stereo settings, previews, bandwidth tier)
//! from user arguments and from what the attached device reports.
//!
//! # Lifecycle
//!
//! 1. `prepare` builds a `ConfigurationResolver` from a `RawRequest`
//!    (normalizing it), runs the host preflight check and resolves the video
//!    source when frames come from a recording.
//! 2. After device discovery, `ConfigurationResolver::reconcile_with_device`
//!    narrows the request to the hardware.
//! 3. `ConfigurationResolver::adjust_preview_to_options` fills default
//!    previews when the user chose none.
//!
//! From then on the request is read-only.
//!
//! # Module Structure
//!
//! - `request`: raw and canonical user intent
//! - `preview`: preview names and the ordered preview set
//! - `device`: capability snapshot and discovery seam
//! - `resolver`: normalization, derived queries, device reconciliation
//! - `zoo`, `video`, `preflight`: collaborators at the host boundary
//! - `config`, `cli`: file/env settings and the command line

use anyhow::{anyhow, Result};

pub mod cli;
pub mod config;
pub mod device;
pub mod preflight;
pub mod preview;
pub mod request;
pub mod resolver;
pub mod video;
pub mod zoo;

pub use config::AppConfig;
pub use device::{
    CameraSocket, DeviceCapabilities, DeviceDiscovery, JsonDeviceDiscovery, TransportProtocol,
    UsbSpeed,
};
pub use preflight::{PermissionsChecker, UdevRulesChecker};
pub use preview::{PreviewName, PreviewSet};
pub use request::{
    BandwidthMode, CameraName, GuiKind, Orientation, RawRequest, Request, Source,
};
pub use resolver::{
    ConfigurationResolver, MedianFilter, ModelSource, MonoSensorResolution, RgbSensorResolution,
};
#[cfg(feature = "download")]
pub use video::HttpDownloader;
pub use video::{LocalVideoResolver, VideoDownloader, VideoSourceResolver};
pub use zoo::ModelZoo;

/// Host collaborators used while preparing a request.
pub struct PrepareContext<'a> {
    pub permissions: &'a dyn PermissionsChecker,
    pub videos: &'a dyn VideoSourceResolver,
}

/// Builds the resolver, checks the host and resolves a recorded source.
///
/// A failed permissions check ends the process. A recorded source that does
/// not resolve to an existing local file is returned as an error.
pub fn prepare(raw: RawRequest, ctx: &PrepareContext<'_>) -> Result<ConfigurationResolver> {
    let mut resolver = ConfigurationResolver::new(raw);
    preflight::enforce(ctx.permissions);
    resolve_video_source(&mut resolver, ctx.videos)?;
    Ok(resolver)
}

/// Replaces a recorded source with its resolved local path.
pub fn resolve_video_source(
    resolver: &mut ConfigurationResolver,
    videos: &dyn VideoSourceResolver,
) -> Result<()> {
    let Source::File(location) = &resolver.request().source else {
        return Ok(());
    };
    let path = videos
        .resolve(location)
        .map_err(|e| anyhow!("invalid video source: {}", e))?;
    resolver.set_video_path(path.to_string_lossy().into_owned());
    Ok(())
}
