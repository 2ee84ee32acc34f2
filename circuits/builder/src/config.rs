use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CIRCOM_VERSION, DEFAULT_COMPARATOR_BITS, DEFAULT_INCLUDE_ROOT,
    DEFAULT_MAX_MERKLE_DEPTH, DEFAULT_TEMPLATE_NAME, MAX_COMPARATOR_BITS, MAX_MERKLE_DEPTH,
    POSEIDON_MAX_INPUTS,
};
use crate::error::ConfigError;
use crate::estimate::CostTable;

/// Knobs for emission and estimation. Every field has a default, so a
/// config file only needs the values it changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub template_name: String,
    pub circom_version: String,
    pub include_root: String,
    pub comparator_bits: u32,
    pub max_hash_inputs: usize,
    pub max_merkle_depth: u32,
    pub costs: CostTable,
}

impl CompilerConfig {
    pub fn with_template_name(name: impl Into<String>) -> Self {
        Self {
            template_name: name.into(),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| ConfigError::Json(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_identifier(&self.template_name) {
            return Err(ConfigError::InvalidTemplateName(self.template_name.clone()));
        }
        let version_ok = !self.circom_version.is_empty()
            && self
                .circom_version
                .split('.')
                .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()));
        if !version_ok {
            return Err(ConfigError::InvalidCircomVersion(self.circom_version.clone()));
        }
        if !(1..=MAX_COMPARATOR_BITS).contains(&self.comparator_bits) {
            return Err(ConfigError::InvalidComparatorBits(self.comparator_bits));
        }
        if !(1..=POSEIDON_MAX_INPUTS).contains(&self.max_hash_inputs) {
            return Err(ConfigError::InvalidHashInputLimit(self.max_hash_inputs));
        }
        if !(1..=MAX_MERKLE_DEPTH).contains(&self.max_merkle_depth) {
            return Err(ConfigError::InvalidMerkleDepthLimit(self.max_merkle_depth));
        }
        Ok(())
    }

    /// Whether `value` is representable by the configured comparators.
    pub fn fits_comparator(&self, value: u64) -> bool {
        self.comparator_bits >= 64 || value < (1u64 << self.comparator_bits)
    }

    /// Include path for a circomlib module, e.g. `circomlib/circuits/poseidon.circom`.
    pub fn include_path(&self, file: &str) -> String {
        let root = self.include_root.trim_end_matches('/');
        if root.is_empty() {
            file.to_string()
        } else {
            format!("{root}/{file}")
        }
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            template_name: DEFAULT_TEMPLATE_NAME.to_string(),
            circom_version: DEFAULT_CIRCOM_VERSION.to_string(),
            include_root: DEFAULT_INCLUDE_ROOT.to_string(),
            comparator_bits: DEFAULT_COMPARATOR_BITS,
            max_hash_inputs: POSEIDON_MAX_INPUTS,
            max_merkle_depth: DEFAULT_MAX_MERKLE_DEPTH,
            costs: CostTable::default(),
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut bytes = name.bytes();
    match bytes.next() {
        Some(first) if first.is_ascii_alphabetic() || first == b'_' => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            CompilerConfig::from_json(r#"{"template_name": "AgeCheck", "comparator_bits": 64}"#)
                .expect("config");
        assert_eq!(config.template_name, "AgeCheck");
        assert_eq!(config.comparator_bits, 64);
        assert_eq!(config.circom_version, DEFAULT_CIRCOM_VERSION);
        assert_eq!(config.costs, CostTable::default());
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut config = CompilerConfig::default();
        config.comparator_bits = 253;
        assert_eq!(config.validate(), Err(ConfigError::InvalidComparatorBits(253)));

        let config = CompilerConfig::with_template_name("1Circuit");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTemplateName(_))
        ));

        let mut config = CompilerConfig::default();
        config.circom_version = "2.x".into();
        assert!(config.validate().is_err());

        assert!(matches!(
            CompilerConfig::from_json("{\"max_hash_inputs\": 17}"),
            Err(ConfigError::InvalidHashInputLimit(17))
        ));
        assert!(matches!(
            CompilerConfig::from_json("not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn comparator_width_bounds_values() {
        let mut config = CompilerConfig::default();
        config.comparator_bits = 8;
        assert!(config.fits_comparator(255));
        assert!(!config.fits_comparator(256));
        config.comparator_bits = 128;
        assert!(config.fits_comparator(u64::MAX));
    }

    #[test]
    fn include_paths_join_root() {
        let mut config = CompilerConfig::default();
        assert_eq!(
            config.include_path("poseidon.circom"),
            "circomlib/circuits/poseidon.circom"
        );
        config.include_root = String::new();
        assert_eq!(config.include_path("poseidon.circom"), "poseidon.circom");
    }
}
