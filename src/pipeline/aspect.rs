//! Orientation classes and the object keys derived from them.

use super::error::{PipelineError, PipelineResult};
use serde::Serialize;
use std::fmt;

/// Coarse orientation of a video, decided from its pixel dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectClass {
    Landscape,
    Portrait,
    Other,
}

impl AspectClass {
    /// Classify `width`x`height` by exact 16:9 / 9:16 integer matching.
    ///
    /// The scaled side is computed with integer division, so only pairs where
    /// the ratio divides evenly match (1920x1080 is landscape, 1366x768 is not).
    pub fn classify(width: u32, height: u32) -> PipelineResult<Self> {
        if height == 0 {
            return Err(PipelineError::InvalidDimensions { width, height });
        }

        let (w, h) = (u64::from(width), u64::from(height));
        if w == 16 * h / 9 {
            Ok(AspectClass::Landscape)
        } else if h == 16 * w / 9 {
            Ok(AspectClass::Portrait)
        } else {
            Ok(AspectClass::Other)
        }
    }

    /// Key prefix objects of this class are stored under.
    pub fn prefix(self) -> &'static str {
        match self {
            AspectClass::Landscape => "landscape/",
            AspectClass::Portrait => "portrait/",
            AspectClass::Other => "other/",
        }
    }
}

impl fmt::Display for AspectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AspectClass::Landscape => "landscape",
            AspectClass::Portrait => "portrait",
            AspectClass::Other => "other",
        };
        f.write_str(name)
    }
}

/// `<prefix><name>.<extension>`
pub fn object_key(aspect: AspectClass, name: &str, extension: &str) -> String {
    format!("{}{}.{}", aspect.prefix(), name, extension)
}
