//! Model zoo lookup.
//!
//! A zoo model lives in `<root>/<name>/<name>.json` (plus its blobs). The
//! resolver only needs the zoo to name the selected model for display.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

use crate::request::Request;

#[derive(Clone, Debug)]
pub struct ModelZoo {
    root: PathBuf,
}

impl ModelZoo {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of the selected model: explicit path first, then a zoo
    /// entry named after the model.
    pub fn model_dir(&self, request: &Request) -> Option<PathBuf> {
        if let Some(path) = &request.cnn_path {
            return Some(path.clone());
        }
        let name = request.cnn_model.as_deref()?;
        let candidate = self.root.join(name);
        candidate.exists().then_some(candidate)
    }

    /// Display name of the selected model.
    pub fn model_name(&self, request: &Request) -> Option<String> {
        if let Some(name) = &request.cnn_model {
            return Some(name.clone());
        }
        let dir = self.model_dir(request)?;
        dir.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
    }

    /// Names of all models in the zoo, sorted.
    pub fn available_models(&self) -> Result<Vec<String>> {
        let mut models = Vec::new();
        collect_models(&self.root, &mut models)?;
        models.sort();
        models.dedup();
        Ok(models)
    }
}

fn collect_models(dir: &Path, models: &mut Vec<String>) -> Result<()> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| anyhow!("failed to read model zoo {}: {}", dir.display(), e))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            collect_models(&path, models)?;
        } else if let Some(name) = zoo_model_name(&path) {
            models.push(name);
        }
    }
    Ok(())
}

/// `<name>/<name>.json` marks a model directory.
fn zoo_model_name(path: &Path) -> Option<String> {
    if path.extension()? != "json" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let parent = path.parent()?.file_name()?.to_str()?;
    (stem == parent).then(|| stem.to_string())
}
