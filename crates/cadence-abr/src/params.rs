//! Per-media-type rule parameters.
//!
//! Rules look parameters up by key through a [`ParamSource`]; a missing key
//! falls back to the rule's built-in default. [`ParamTable`] is the stock
//! source: global values overridden per media type, loadable from JSON.

use std::{collections::HashMap, sync::Arc};

use serde::Deserialize;

use crate::{AbrError, AbrResult, MediaTable, MediaType};

/// Parameter keys understood by the rules.
pub mod keys {
    pub const DROPPED_FRAMES_MAX_RATIO: &str = "ABR.droppedFramesMaxRatio";
    pub const DROPPED_FRAMES_MIN_RATIO: &str = "ABR.droppedFramesMinRatio";

    pub const MIN_BUFFER_TIME: &str = "BufferController.minBufferTime";
    pub const SWITCH_LOWER_BUFFER_RATIO: &str = "ABR.switchLowerBufferRatio";
    pub const SWITCH_LOWER_BUFFER_TIME: &str = "ABR.switchLowerBufferTime";
    pub const SWITCH_DOWN_BUFFER_RATIO: &str = "ABR.switchDownBufferRatio";
    pub const SWITCH_DOWN_BUFFER_TIME: &str = "ABR.switchDownBufferTime";
    pub const SWITCH_UP_BUFFER_RATIO: &str = "ABR.switchUpBufferRatio";
    pub const SWITCH_UP_BUFFER_TIME: &str = "ABR.switchUpBufferTime";
}

/// Per-media-type configuration lookup.
#[cfg_attr(test, unimock::unimock(api = ParamSourceMock))]
pub trait ParamSource {
    /// Value configured for `key`, if any.
    fn param_for(&self, media_type: MediaType, key: &str) -> Option<f64>;
}

impl<T: ParamSource + ?Sized> ParamSource for &T {
    fn param_for(&self, media_type: MediaType, key: &str) -> Option<f64> {
        (**self).param_for(media_type, key)
    }
}

impl<T: ParamSource + ?Sized> ParamSource for Arc<T> {
    fn param_for(&self, media_type: MediaType, key: &str) -> Option<f64> {
        (**self).param_for(media_type, key)
    }
}

/// Look up a numeric parameter, falling back to `default`.
pub fn number_param<P: ParamSource + ?Sized>(
    source: &P,
    media_type: MediaType,
    key: &str,
    default: f64,
) -> f64 {
    source.param_for(media_type, key).unwrap_or(default)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawParamTable {
    global: HashMap<String, f64>,
    audio: HashMap<String, f64>,
    video: HashMap<String, f64>,
    text: HashMap<String, f64>,
}

/// Global parameters with per-media-type overrides.
///
/// ```json
/// {
///   "global": { "ABR.switchDownBufferRatio": 0.4 },
///   "video": { "ABR.droppedFramesMaxRatio": 0.25 }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParamTable {
    global: HashMap<String, f64>,
    per_type: MediaTable<HashMap<String, f64>>,
}

impl ParamTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> AbrResult<Self> {
        let raw: RawParamTable = serde_json::from_str(json)?;

        let mut table = Self::new();
        for (key, value) in raw.global {
            table = table.with_param(key, value)?;
        }
        for (media_type, overrides) in [
            (MediaType::Audio, raw.audio),
            (MediaType::Video, raw.video),
            (MediaType::Text, raw.text),
        ] {
            for (key, value) in overrides {
                table = table.with_param_for(media_type, key, value)?;
            }
        }
        Ok(table)
    }

    /// Set a parameter for every media type.
    pub fn with_param(mut self, key: impl Into<String>, value: f64) -> AbrResult<Self> {
        let key = validate(key.into(), value)?;
        self.global.insert(key, value);
        Ok(self)
    }

    /// Set a parameter for one media type, shadowing the global value.
    pub fn with_param_for(
        mut self,
        media_type: MediaType,
        key: impl Into<String>,
        value: f64,
    ) -> AbrResult<Self> {
        let key = validate(key.into(), value)?;
        self.per_type
            .get_or_insert_with(media_type, HashMap::new)
            .insert(key, value);
        Ok(self)
    }
}

fn validate(key: String, value: f64) -> AbrResult<String> {
    if value.is_finite() && value >= 0.0 {
        Ok(key)
    } else {
        Err(AbrError::InvalidParam { key, value })
    }
}

impl ParamSource for ParamTable {
    fn param_for(&self, media_type: MediaType, key: &str) -> Option<f64> {
        self.per_type
            .get(media_type)
            .and_then(|overrides| overrides.get(key))
            .or_else(|| self.global.get(key))
            .copied()
    }
}
