//! Video source resolution.
//!
//! When frames come from a recording, the location given by the user is
//! turned into a local playable path before the pipeline is built. Remote
//! `https://` sources are fetched into the video cache directory first.

use anyhow::{anyhow, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Turns a user-supplied path or URL into a local playable path.
pub trait VideoSourceResolver {
    fn resolve(&self, location: &str) -> Result<PathBuf>;
}

/// Fetches a remote video into a cache directory.
pub trait VideoDownloader {
    fn download(&self, url: &str, videos_dir: &Path) -> Result<PathBuf>;
}

pub fn is_remote(location: &str) -> bool {
    location.starts_with("https://")
}

/// Cache file name for a remote source: a hash prefix of the URL plus the
/// URL's own extension when it has one.
pub fn cache_file_name(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let stem = hex::encode(&digest[..8]);
    let path_part = url.split(['?', '#']).next().unwrap_or(url);
    let extension = path_part
        .strip_prefix("https://")
        .and_then(|rest| rest.split_once('/'))
        .and_then(|(_, path)| path.rsplit('/').next())
        .and_then(|file| file.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));
    match extension {
        Some(ext) => format!("{}.{}", stem, ext.to_ascii_lowercase()),
        None => format!("{}.mp4", stem),
    }
}

/// Resolver backed by the local filesystem and an optional downloader.
pub struct LocalVideoResolver {
    videos_dir: PathBuf,
    downloader: Option<Box<dyn VideoDownloader>>,
}

impl LocalVideoResolver {
    pub fn new(videos_dir: impl Into<PathBuf>) -> Self {
        Self {
            videos_dir: videos_dir.into(),
            downloader: None,
        }
    }

    pub fn with_downloader<D: VideoDownloader + 'static>(mut self, downloader: D) -> Self {
        self.downloader = Some(Box::new(downloader));
        self
    }

    pub fn videos_dir(&self) -> &Path {
        &self.videos_dir
    }
}

impl VideoSourceResolver for LocalVideoResolver {
    fn resolve(&self, location: &str) -> Result<PathBuf> {
        let path = if is_remote(location) {
            let downloader = self
                .downloader
                .as_ref()
                .ok_or_else(|| anyhow!("no downloader configured for remote video {}", location))?;
            std::fs::create_dir_all(&self.videos_dir).map_err(|e| {
                anyhow!(
                    "failed to create video directory {}: {}",
                    self.videos_dir.display(),
                    e
                )
            })?;
            let path = downloader.download(location, &self.videos_dir)?;
            log::info!("remote video downloaded to {}", path.display());
            path
        } else {
            PathBuf::from(location)
        };

        if !path.exists() {
            return Err(anyhow!("path {} does not exist", path.display()));
        }
        Ok(path)
    }
}

/// Plain HTTPS download of a video file.
#[cfg(feature = "download")]
#[derive(Clone, Debug, Default)]
pub struct HttpDownloader;

#[cfg(feature = "download")]
impl VideoDownloader for HttpDownloader {
    fn download(&self, url: &str, videos_dir: &Path) -> Result<PathBuf> {
        let parsed = url::Url::parse(url).map_err(|e| anyhow!("invalid video url {}: {}", url, e))?;
        if parsed.scheme() != "https" {
            return Err(anyhow!("video downloads require https"));
        }
        let target = videos_dir.join(cache_file_name(url));
        if target.exists() {
            log::info!("using cached video {}", target.display());
            return Ok(target);
        }

        let response = ureq::get(parsed.as_str())
            .call()
            .map_err(|e| anyhow!("video download failed: {}", e))?;
        let partial = target.with_extension("part");
        let mut file = std::fs::File::create(&partial)
            .map_err(|e| anyhow!("failed to create {}: {}", partial.display(), e))?;
        std::io::copy(&mut response.into_reader(), &mut file)
            .map_err(|e| anyhow!("failed to write {}: {}", partial.display(), e))?;
        std::fs::rename(&partial, &target)
            .map_err(|e| anyhow!("failed to finalize {}: {}", target.display(), e))?;
        Ok(target)
    }
}
