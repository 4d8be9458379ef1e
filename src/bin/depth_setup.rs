//! depth_setup - resolve and print the runtime configuration
//!
//! This tool:
//! 1. Parses the command line and loads host settings
//! 2. Checks device access permissions and resolves the video source
//! 3. Reconciles the request with a device capability snapshot, if given
//! 4. Fills default previews and prints the final configuration as JSON

use anyhow::Result;
use clap::Parser;
use serde_json::json;

use depth_setup::cli::Args;
use depth_setup::{
    prepare, AppConfig, DeviceDiscovery, JsonDeviceDiscovery, LocalVideoResolver, ModelZoo,
    PrepareContext, UdevRulesChecker,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = AppConfig::load()?;
    let zoo = ModelZoo::new(&cfg.zoo_dir);

    if args.list_models {
        for model in zoo.available_models()? {
            println!("{}", model);
        }
        return Ok(());
    }

    let permissions = UdevRulesChecker::new(&cfg.udev_rules_dir);
    let videos = video_resolver(&cfg);
    let ctx = PrepareContext {
        permissions: &permissions,
        videos: &videos,
    };
    let mut resolver = prepare(args.to_raw_request(&cfg), &ctx)?;

    if let Some(path) = &args.device_caps {
        let caps = JsonDeviceDiscovery::new(path).capabilities()?;
        log::info!(
            "device: {} sockets, protocol {}, usb speed {}",
            caps.connected_camera_sockets.len(),
            caps.transport_protocol,
            caps.usb_link_speed
        );
        resolver.reconcile_with_device(&caps);
    } else {
        log::warn!("no device capabilities given, skipping device reconciliation");
    }
    resolver.adjust_preview_to_options();

    let summary = json!({
        "request": resolver.request(),
        "derived": {
            "usesCamera": resolver.uses_camera(),
            "usesDepth": resolver.uses_depth(),
            "usesNeuralNet": resolver.uses_neural_net(),
            "modelInputSource": resolver.model_input_source(),
            "modelName": zoo.model_name(resolver.request()),
            "maxDisparity": resolver.max_disparity(),
            "dispMultiplier": resolver.disp_multiplier(),
            "shaves": resolver.shave_count(),
            "rgbResolution": resolver.rgb_resolution(),
            "monoResolution": resolver.mono_resolution(),
            "medianFilter": resolver.median_filter(),
            "usb2Mode": resolver.usb2_mode(),
            "lowCapabilities": resolver.low_capabilities(),
            "leftCameraEnabled": resolver.left_camera_enabled(),
            "rightCameraEnabled": resolver.right_camera_enabled(),
            "rgbCameraEnabled": resolver.rgb_camera_enabled(),
            "previewSize": resolver.preview_size(),
            "inputSize": resolver.input_size(),
        },
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

#[cfg(feature = "download")]
fn video_resolver(cfg: &AppConfig) -> LocalVideoResolver {
    LocalVideoResolver::new(&cfg.videos_dir).with_downloader(depth_setup::HttpDownloader)
}

#[cfg(not(feature = "download"))]
fn video_resolver(cfg: &AppConfig) -> LocalVideoResolver {
    LocalVideoResolver::new(&cfg.videos_dir)
}
