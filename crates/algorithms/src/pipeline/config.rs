//! Run configuration

use crate::transect::TransectParams;
use openres_core::Result;
use openres_parallel::ProcessingMode;
use serde::{Deserialize, Serialize};

/// How LCS/RCS are traced from the channel belt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeltMode {
    /// Split the belt line crossed nearest the stream at the crossing point
    #[default]
    SplitAtTransect,
    /// Use belt lines already tagged with `t_ID` and `side`
    TaggedSides,
}

/// Configuration of an extraction run.
///
/// Loadable from JSON; missing keys take their defaults.
///
/// ```ignore
/// let config: PipelineConfig = serde_json::from_str(r#"{"transect": {"max_length": 8000}}"#)?;
/// config.validate()?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub transect: TransectParams,
    pub belt_mode: BeltMode,
    pub processing: ProcessingMode,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        self.transect.validate()?;
        if let ProcessingMode::ParallelWith(0) = self.processing {
            return Err(openres_core::Error::InvalidParameter {
                name: "processing",
                value: "parallel_with(0)".into(),
                reason: "needs at least one thread".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"transect": {"max_length": 8000.0}, "belt_mode": "tagged_sides"}"#).unwrap();
        assert_eq!(config.transect.max_length, 8000.0);
        assert_eq!(config.transect.extension_increment, 250.0);
        assert_eq!(config.belt_mode, BeltMode::TaggedSides);
        assert_eq!(config.processing, ProcessingMode::Parallel);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = PipelineConfig::default();
        config.transect.extension_increment = -5.0;
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            processing: ProcessingMode::ParallelWith(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
