//! Preview windows.
//!
//! `PreviewName` enumerates every stream the application can display.
//! `PreviewSet` keeps the user's selection in insertion order (first entries
//! render first) and never holds the same preview twice.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PreviewName {
    Color,
    NnInput,
    Left,
    Right,
    RectifiedLeft,
    RectifiedRight,
    Depth,
    DepthRaw,
    Disparity,
    DisparityColor,
}

impl PreviewName {
    pub const ALL: [PreviewName; 10] = [
        PreviewName::Color,
        PreviewName::NnInput,
        PreviewName::Left,
        PreviewName::Right,
        PreviewName::RectifiedLeft,
        PreviewName::RectifiedRight,
        PreviewName::Depth,
        PreviewName::DepthRaw,
        PreviewName::Disparity,
        PreviewName::DisparityColor,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PreviewName::Color => "color",
            PreviewName::NnInput => "nnInput",
            PreviewName::Left => "left",
            PreviewName::Right => "right",
            PreviewName::RectifiedLeft => "rectifiedLeft",
            PreviewName::RectifiedRight => "rectifiedRight",
            PreviewName::Depth => "depth",
            PreviewName::DepthRaw => "depthRaw",
            PreviewName::Disparity => "disparity",
            PreviewName::DisparityColor => "disparityColor",
        }
    }

    /// Previews that only carry data while the stereo pipeline is running.
    pub fn requires_depth(self) -> bool {
        matches!(
            self,
            PreviewName::RectifiedLeft
                | PreviewName::RectifiedRight
                | PreviewName::Depth
                | PreviewName::DepthRaw
                | PreviewName::Disparity
                | PreviewName::DisparityColor
        )
    }

    /// Previews that survive on a device without a stereo pair.
    pub fn available_without_stereo(self) -> bool {
        matches!(self, PreviewName::NnInput | PreviewName::Color)
    }
}

impl fmt::Display for PreviewName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PreviewName {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        PreviewName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| anyhow!("unknown preview '{}'", s))
    }
}

/// Ordered, duplicate-free list of previews.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<PreviewName>", into = "Vec<PreviewName>")]
pub struct PreviewSet {
    names: Vec<PreviewName>,
}

impl PreviewSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `name` unless it is already present. Returns true when added.
    pub fn push(&mut self, name: PreviewName) -> bool {
        if self.contains(name) {
            return false;
        }
        self.names.push(name);
        true
    }

    pub fn contains(&self, name: PreviewName) -> bool {
        self.names.contains(&name)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = PreviewName> + '_ {
        self.names.iter().copied()
    }

    pub fn as_slice(&self) -> &[PreviewName] {
        &self.names
    }

    /// Keeps the previews matching `keep`, preserving order. Returns the
    /// previews that were removed.
    pub fn retain(&mut self, mut keep: impl FnMut(PreviewName) -> bool) -> Vec<PreviewName> {
        let mut dropped = Vec::new();
        self.names.retain(|name| {
            if keep(*name) {
                true
            } else {
                dropped.push(*name);
                false
            }
        });
        dropped
    }
}

impl From<Vec<PreviewName>> for PreviewSet {
    fn from(names: Vec<PreviewName>) -> Self {
        names.into_iter().collect()
    }
}

impl From<PreviewSet> for Vec<PreviewName> {
    fn from(set: PreviewSet) -> Self {
        set.names
    }
}

impl FromIterator<PreviewName> for PreviewSet {
    fn from_iter<I: IntoIterator<Item = PreviewName>>(iter: I) -> Self {
        let mut set = PreviewSet::new();
        for name in iter {
            set.push(name);
        }
        set
    }
}
