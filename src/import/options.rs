use crate::{
    anim_error::AnimError,
    types::{DEFAULT_TICKS_PER_SECOND, MAX_JOINTS},
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Options for turning an imported scene into a skeleton and clips. Missing
/// fields take their default values when read from YAML.
#[derive(Clone, Serialize, Deserialize, PartialEq, Debug)]
#[serde(default)]
pub struct ImportOptions {
    /// Used for animations that declare zero ticks per second
    pub fallback_ticks_per_second: f64,
    /// Joint limit checked when a model instance is created. May be lowered
    /// below `MAX_JOINTS` but not raised above it.
    pub max_joints: usize,
    /// Fail the whole import on a bad clip instead of skipping it
    pub strict_clips: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            fallback_ticks_per_second: DEFAULT_TICKS_PER_SECOND,
            max_joints: MAX_JOINTS,
            strict_clips: false,
        }
    }
}

impl ImportOptions {
    /// Reads options from a YAML string
    ///
    /// # Errors
    /// May return `AnimError`
    pub fn from_yaml_str(s: &str) -> Result<Self, AnimError> {
        let options: Self = serde_yaml::from_str(s)?;
        options.validate()?;
        Ok(options)
    }

    /// Reads options from a YAML file
    ///
    /// # Errors
    /// May return `AnimError`
    pub fn from_yaml_file(path: &Path) -> Result<Self, AnimError> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// # Errors
    /// Returns `AnimError::InvalidOption` naming the first bad field
    pub fn validate(&self) -> Result<(), AnimError> {
        if !self.fallback_ticks_per_second.is_finite()
            || self.fallback_ticks_per_second <= 0.0
        {
            return Err(AnimError::InvalidOption("fallback_ticks_per_second"));
        }
        if self.max_joints == 0 || self.max_joints > MAX_JOINTS {
            return Err(AnimError::InvalidOption("max_joints"));
        }
        Ok(())
    }

    /// Rate to use for an animation given the rate it declares
    #[must_use]
    pub fn ticks_per_second(&self, declared: f64) -> f64 {
        if declared.is_finite() && declared > 0.0 {
            declared
        } else {
            self.fallback_ticks_per_second
        }
    }
}
