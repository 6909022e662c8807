// SPDX-License-Identifier: GPL-3.0-only

//! Device capability reporting and domain filtering

use super::catalog::SettingDeclaration;
use crate::constants::ranges::{EXPOSURE_MAX_STEPS, ISO_STEP};
use crate::errors::AppResult;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Reports which values of each setting a camera actually supports
///
/// Queries must be cheap local lookups. Anything slow (querying the hardware)
/// has to happen before the provider is handed to the engine.
pub trait CapabilityProvider {
    /// Supported values for `key`, or `None` if the device does not offer it
    fn supported_values(&self, key: &str) -> Option<Vec<String>>;

    /// Supported values for `key` given that `trigger` currently holds `trigger_value`
    ///
    /// Used for domains that change at runtime, such as high frame rates that
    /// depend on the selected video size.
    fn dependent_values(
        &self,
        key: &str,
        _trigger: &str,
        _trigger_value: &str,
    ) -> Option<Vec<String>> {
        self.supported_values(key)
    }
}

/// Capability table for one camera, loadable from JSON
///
/// ```json
/// {
///   "camera_id": "0",
///   "settings": { "flash_mode": ["off", "auto", "on"] },
///   "dependent": {
///     "video_hfr": { "video_quality": { "1920x1080": ["off", "hfr60"] } }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCapabilities {
    #[serde(default)]
    pub camera_id: String,
    #[serde(default)]
    pub settings: HashMap<String, Vec<String>>,
    /// setting key -> trigger key -> trigger value -> supported values
    #[serde(default)]
    pub dependent: HashMap<String, HashMap<String, HashMap<String, Vec<String>>>>,
}

impl DeviceCapabilities {
    pub fn new(camera_id: impl Into<String>) -> Self {
        Self {
            camera_id: camera_id.into(),
            ..Self::default()
        }
    }

    pub fn with<I, S>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings
            .insert(key.into(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_dependent<I, S>(
        mut self,
        key: impl Into<String>,
        trigger: impl Into<String>,
        trigger_value: impl Into<String>,
        values: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependent
            .entry(key.into())
            .or_default()
            .entry(trigger.into())
            .or_default()
            .insert(
                trigger_value.into(),
                values.into_iter().map(Into::into).collect(),
            );
        self
    }

    pub fn from_json_str(json: &str) -> AppResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> AppResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

impl CapabilityProvider for DeviceCapabilities {
    fn supported_values(&self, key: &str) -> Option<Vec<String>> {
        self.settings.get(key).cloned()
    }

    fn dependent_values(&self, key: &str, trigger: &str, trigger_value: &str) -> Option<Vec<String>> {
        self.dependent
            .get(key)
            .and_then(|by_trigger| by_trigger.get(trigger))
            .and_then(|by_value| by_value.get(trigger_value))
            .cloned()
            .or_else(|| self.supported_values(key))
    }
}

/// Intersect a declaration's candidates with what the device reports
///
/// Keeps candidate order and drops duplicates. Declarations without
/// candidates take the reported list in reported order.
pub fn filter_domain(declaration: &SettingDeclaration, reported: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    match &declaration.candidates {
        Some(candidates) => {
            let reported: HashSet<&str> = reported.iter().map(String::as_str).collect();
            candidates
                .iter()
                .filter(|c| reported.contains(c.as_str()))
                .filter(|c| seen.insert(c.as_str()))
                .cloned()
                .collect()
        }
        None => reported
            .iter()
            .filter(|v| seen.insert(v.as_str()))
            .cloned()
            .collect(),
    }
}

/// ISO domain for a sensor sensitivity range: "auto" then every step inside the range
pub fn iso_values(min: u32, max: u32) -> Vec<String> {
    let mut values = vec!["auto".to_string()];
    let first = min.max(ISO_STEP).div_ceil(ISO_STEP).checked_mul(ISO_STEP);
    let steps = std::iter::successors(first, |iso| iso.checked_add(ISO_STEP));
    values.extend(steps.take_while(|iso| *iso <= max).map(|iso| iso.to_string()));
    values
}

/// Exposure compensation domain for an AE compensation range
///
/// The step grows until the range fits in [`EXPOSURE_MAX_STEPS`] steps. A
/// negative start is moved up onto a multiple of the step so that 0 stays
/// reachable. A `0..=0` range means the device has no compensation.
pub fn exposure_compensation_values(min: i32, max: i32) -> Vec<String> {
    if (min == 0 && max == 0) || max < min {
        return Vec::new();
    }
    let (min, max) = (i64::from(min), i64::from(max));
    let increment = (max - min) / (i64::from(EXPOSURE_MAX_STEPS) + 1) + 1;
    let start = if min < 0 { -(-min / increment * increment) } else { min };
    std::iter::successors(Some(start), |v| Some(v + increment))
        .take_while(|v| *v <= max)
        .map(|v| v.to_string())
        .collect()
}
