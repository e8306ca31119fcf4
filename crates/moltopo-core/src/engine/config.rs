use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MIN_ATOMIC_NUMBER: u8 = 6;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

/// Which of several equally large matches the search returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
    /// The first maximum-size match the search met. Depends on search order.
    #[default]
    FirstFound,
    /// The tied match whose sorted atom pairs compare lowest. Only ties met
    /// before the search ends are compared, and a match covering the smaller
    /// molecule ends it at once.
    LowestIndices,
}

#[derive(Debug, Clone, PartialEq)]
pub struct McsConfig {
    /// Wall-clock budget. Checked between candidate extensions, so one
    /// expensive step may overrun it.
    pub timeout: Duration,
    /// Atoms with a lower atomic number never take part in the match.
    pub min_atomic_number: u8,
    /// Whether a ring bond may only map onto a ring bond.
    pub match_ring_bonds: bool,
    /// Whether atoms may only map onto atoms of the same element.
    pub match_elements: bool,
    pub tie_break: TieBreak,
}

impl McsConfig {
    pub fn builder() -> McsConfigBuilder {
        McsConfigBuilder::new()
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let file: McsConfigFile = toml::from_str(&content).map_err(|e| ConfigError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        file.into_config()
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: McsConfigFile = toml::from_str(content).map_err(|e| ConfigError::Toml {
            path: "<string>".to_string(),
            source: e,
        })?;
        file.into_config()
    }
}

#[derive(Default)]
pub struct McsConfigBuilder {
    timeout: Option<Duration>,
    min_atomic_number: Option<u8>,
    match_ring_bonds: Option<bool>,
    match_elements: Option<bool>,
    tie_break: Option<TieBreak>,
}

impl McsConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
    pub fn min_atomic_number(mut self, z: u8) -> Self {
        self.min_atomic_number = Some(z);
        self
    }
    pub fn match_ring_bonds(mut self, enabled: bool) -> Self {
        self.match_ring_bonds = Some(enabled);
        self
    }
    pub fn match_elements(mut self, enabled: bool) -> Self {
        self.match_elements = Some(enabled);
        self
    }
    pub fn tie_break(mut self, policy: TieBreak) -> Self {
        self.tie_break = Some(policy);
        self
    }

    pub fn build(self) -> Result<McsConfig, ConfigError> {
        let timeout = self
            .timeout
            .ok_or(ConfigError::MissingParameter("timeout"))?;
        if timeout.is_zero() {
            return Err(ConfigError::InvalidParameter {
                name: "timeout",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(McsConfig {
            timeout,
            min_atomic_number: self
                .min_atomic_number
                .unwrap_or(DEFAULT_MIN_ATOMIC_NUMBER),
            match_ring_bonds: self.match_ring_bonds.unwrap_or(true),
            match_elements: self.match_elements.unwrap_or(false),
            tie_break: self.tie_break.unwrap_or_default(),
        })
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct McsConfigFile {
    timeout_secs: Option<f64>,
    min_atomic_number: Option<u8>,
    match_ring_bonds: Option<bool>,
    match_elements: Option<bool>,
    tie_break: Option<TieBreak>,
}

impl McsConfigFile {
    fn into_config(self) -> Result<McsConfig, ConfigError> {
        let mut builder = McsConfigBuilder::new();
        if let Some(secs) = self.timeout_secs {
            let timeout =
                Duration::try_from_secs_f64(secs).map_err(|e| ConfigError::InvalidParameter {
                    name: "timeout-secs",
                    reason: e.to_string(),
                })?;
            builder = builder.timeout(timeout);
        }
        if let Some(z) = self.min_atomic_number {
            builder = builder.min_atomic_number(z);
        }
        if let Some(enabled) = self.match_ring_bonds {
            builder = builder.match_ring_bonds(enabled);
        }
        if let Some(enabled) = self.match_elements {
            builder = builder.match_elements(enabled);
        }
        if let Some(policy) = self.tie_break {
            builder = builder.tie_break(policy);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builder_requires_timeout() {
        let result = McsConfig::builder().build();
        assert!(matches!(result, Err(ConfigError::MissingParameter("timeout"))));
    }

    #[test]
    fn builder_applies_defaults() {
        let config = McsConfig::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        assert_eq!(config.min_atomic_number, DEFAULT_MIN_ATOMIC_NUMBER);
        assert!(config.match_ring_bonds);
        assert!(!config.match_elements);
        assert_eq!(config.tie_break, TieBreak::FirstFound);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let result = McsConfig::builder().timeout(Duration::ZERO).build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameter { name: "timeout", .. })
        ));
    }

    #[test]
    fn parses_toml() {
        let config = McsConfig::from_toml_str(
            r#"
            timeout-secs = 2.5
            min-atomic-number = 2
            match-ring-bonds = false
            match-elements = true
            tie-break = "lowest-indices"
            "#,
        )
        .unwrap();
        assert_eq!(config.timeout, Duration::from_millis(2500));
        assert_eq!(config.min_atomic_number, 2);
        assert!(!config.match_ring_bonds);
        assert!(config.match_elements);
        assert_eq!(config.tie_break, TieBreak::LowestIndices);
    }

    #[test]
    fn toml_rejects_unknown_keys_and_negative_timeouts() {
        assert!(matches!(
            McsConfig::from_toml_str("timeout-secs = 1.0\nbogus = 3"),
            Err(ConfigError::Toml { .. })
        ));
        assert!(matches!(
            McsConfig::from_toml_str("timeout-secs = -1.0"),
            Err(ConfigError::InvalidParameter { name: "timeout-secs", .. })
        ));
        assert!(matches!(
            McsConfig::from_toml_str("min-atomic-number = 6"),
            Err(ConfigError::MissingParameter("timeout"))
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timeout-secs = 10.0").unwrap();
        let config = McsConfig::load(file.path()).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(10));

        let missing = McsConfig::load(Path::new("/definitely/not/here.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
