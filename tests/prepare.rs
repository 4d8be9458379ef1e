use anyhow::{anyhow, Result};
use std::cell::Cell;
use std::fs;
use std::path::PathBuf;

use depth_setup::{
    prepare, LocalVideoResolver, PermissionsChecker, PrepareContext, RawRequest, Source,
    VideoSourceResolver,
};

struct AllowAll;

impl PermissionsChecker for AllowAll {
    fn check(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct CountingResolver {
    calls: Cell<u32>,
}

impl VideoSourceResolver for CountingResolver {
    fn resolve(&self, _location: &str) -> Result<PathBuf> {
        self.calls.set(self.calls.get() + 1);
        Err(anyhow!("unexpected resolve"))
    }
}

#[test]
fn camera_source_skips_video_resolution() -> Result<()> {
    let videos = CountingResolver::default();
    let ctx = PrepareContext {
        permissions: &AllowAll,
        videos: &videos,
    };
    let resolver = prepare(RawRequest::default(), &ctx)?;
    assert_eq!(videos.calls.get(), 0);
    assert!(resolver.uses_camera());
    assert!(resolver.uses_depth());
    Ok(())
}

#[test]
fn recorded_source_is_resolved_to_local_path() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let clip = dir.path().join("street.mp4");
    fs::write(&clip, b"not really a video")?;

    let videos = LocalVideoResolver::new(dir.path());
    let ctx = PrepareContext {
        permissions: &AllowAll,
        videos: &videos,
    };
    let raw = RawRequest {
        video: Some(clip.to_string_lossy().into_owned()),
        ..RawRequest::default()
    };
    let resolver = prepare(raw, &ctx)?;
    assert_eq!(
        resolver.request().source,
        Source::File(clip.to_string_lossy().into_owned())
    );
    assert!(!resolver.uses_depth());
    assert_eq!(resolver.shave_count(), 8);
    Ok(())
}

#[test]
fn missing_recording_is_an_invalid_argument() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("missing.mp4");

    let videos = LocalVideoResolver::new(dir.path());
    let ctx = PrepareContext {
        permissions: &AllowAll,
        videos: &videos,
    };
    let raw = RawRequest {
        video: Some(missing.to_string_lossy().into_owned()),
        ..RawRequest::default()
    };
    let err = prepare(raw, &ctx).expect_err("missing video");
    let message = err.to_string();
    assert!(message.contains("invalid video source"), "{message}");
    assert!(message.contains("does not exist"), "{message}");
    Ok(())
}
