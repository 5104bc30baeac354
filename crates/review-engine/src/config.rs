//! Configuration for review sessions
//!
//! TOML-based. Every table is optional; anything left out falls back to the
//! timings and audit catalog the product ships with.

use crate::audits::AuditOption;
use crate::error::{ReviewError, Result};
use crate::progress::ProgressProfile;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Seed for the progress increments; unseeded runs draw from OS entropy
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub analysis: ProfileOverrides,
    #[serde(default)]
    pub audit: ProfileOverrides,
    #[serde(default)]
    pub pulse: PulseConfig,
    #[serde(default = "default_audits")]
    pub audits: Vec<AuditOption>,
}

impl ReviewConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML is malformed, or a
    /// progress profile is inconsistent
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    ///
    /// # Example
    ///
    /// ```
    /// use review_engine::ReviewConfig;
    ///
    /// # fn example() -> review_engine::Result<()> {
    /// let config = ReviewConfig::from_str(r#"
    ///     seed = 7
    ///
    ///     [analysis]
    ///     cadence_ms = 100
    /// "#)?;
    /// assert_eq!(config.analysis_profile().cadence.as_millis(), 100);
    /// # Ok(())
    /// # }
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.analysis_profile().validate()?;
        self.audit_profile().validate()?;
        Ok(())
    }

    pub fn analysis_profile(&self) -> ProgressProfile {
        self.analysis.apply(ProgressProfile::analysis())
    }

    pub fn audit_profile(&self) -> ProgressProfile {
        self.audit.apply(ProgressProfile::audit())
    }

    pub fn pulse_duration(&self) -> Duration {
        Duration::from_millis(self.pulse.clear_after_ms)
    }
}

/// Partial progress profile; unset fields keep the built-in value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileOverrides {
    pub cadence_ms: Option<u64>,
    pub increment_min: Option<f64>,
    pub increment_max: Option<f64>,
    pub start_value: Option<f64>,
    pub settle_ms: Option<u64>,
    pub steps: Option<Vec<String>>,
    pub messages: Option<Vec<String>>,
}

impl ProfileOverrides {
    fn apply(&self, mut profile: ProgressProfile) -> ProgressProfile {
        if let Some(ms) = self.cadence_ms {
            profile.cadence = Duration::from_millis(ms);
        }
        if let Some(min) = self.increment_min {
            profile.increment_min = min;
        }
        if let Some(max) = self.increment_max {
            profile.increment_max = max;
        }
        if let Some(start) = self.start_value {
            profile.start_value = start;
        }
        if let Some(ms) = self.settle_ms {
            profile.settle = Duration::from_millis(ms);
        }
        if let Some(steps) = &self.steps {
            profile.steps = steps.clone();
        }
        if let Some(messages) = &self.messages {
            profile.messages = messages.clone();
        }
        profile
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseConfig {
    /// How long the document-tab pulse stays lit (default: 1200)
    #[serde(default = "default_pulse_ms")]
    pub clear_after_ms: u64,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            clear_after_ms: default_pulse_ms(),
        }
    }
}

fn default_pulse_ms() -> u64 {
    1200
}

fn default_audits() -> Vec<AuditOption> {
    AuditOption::defaults()
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            seed: None,
            analysis: ProfileOverrides::default(),
            audit: ProfileOverrides::default(),
            pulse: PulseConfig::default(),
            audits: default_audits(),
        }
    }
}

impl ProgressProfile {
    fn validate(&self) -> Result<()> {
        if self.cadence.is_zero() {
            return Err(ReviewError::InvalidSetting(
                "cadence_ms must be greater than zero".to_string(),
            ));
        }
        if !(self.increment_min > 0.0
            && self.increment_min <= self.increment_max
            && self.increment_max.is_finite())
        {
            return Err(ReviewError::InvalidSetting(format!(
                "increment range {}..={} must be positive and ordered",
                self.increment_min, self.increment_max
            )));
        }
        if !(0.0..100.0).contains(&self.start_value) {
            return Err(ReviewError::InvalidSetting(format!(
                "start_value {} must be in 0..100",
                self.start_value
            )));
        }
        Ok(())
    }
}
