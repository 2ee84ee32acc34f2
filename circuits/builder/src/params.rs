//! Typed resolution of advanced-operation parameters.
//!
//! The editor stores parameters as free text. [`Primitive::resolve`] turns
//! them into the shape the emitter and estimator work with, or explains
//! what is wrong through a [`ParamError`].

use crate::config::CompilerConfig;
use crate::error::ParamError;
use crate::graph::{AdvancedOperator, Params};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Primitive {
    RangeCheck { min: u64, max: u64 },
    Hash { inputs: usize },
    Conditional { condition: u64 },
    MerkleProof { depth: u32 },
    Modulo { modulus: u64 },
}

impl Primitive {
    pub fn resolve(
        operator: AdvancedOperator,
        params: &Params,
        config: &CompilerConfig,
    ) -> Result<Self, ParamError> {
        if let Some(name) = operator
            .required_params()
            .iter()
            .copied()
            .find(|name| !is_present(params, name))
        {
            return Err(ParamError::Missing { name });
        }
        match operator {
            AdvancedOperator::RangeCheck => {
                let min = unsigned(params, "min")?;
                let max = unsigned(params, "max")?;
                if min > max {
                    return Err(ParamError::EmptyRange { min, max });
                }
                comparator_width("max", max, config)?;
                Ok(Primitive::RangeCheck { min, max })
            }
            AdvancedOperator::Hash => {
                let inputs = bounded(params, "inputs", 1, config.max_hash_inputs as u64)?;
                Ok(Primitive::Hash {
                    inputs: inputs as usize,
                })
            }
            AdvancedOperator::Conditional => {
                let condition = unsigned(params, "condition")?;
                Ok(Primitive::Conditional { condition })
            }
            AdvancedOperator::MerkleProof => {
                let depth = bounded(params, "depth", 1, u64::from(config.max_merkle_depth))?;
                Ok(Primitive::MerkleProof {
                    depth: depth as u32,
                })
            }
            AdvancedOperator::Modulo => {
                let modulus = unsigned(params, "modulus")?;
                if modulus == 0 {
                    return Err(ParamError::OutOfRange {
                        name: "modulus",
                        value: 0,
                        min: 1,
                        max: u64::MAX,
                    });
                }
                comparator_width("modulus", modulus, config)?;
                Ok(Primitive::Modulo { modulus })
            }
        }
    }
}

fn is_present(params: &Params, name: &str) -> bool {
    params
        .get(name)
        .is_some_and(|value| !value.trim().is_empty())
}

fn unsigned(params: &Params, name: &'static str) -> Result<u64, ParamError> {
    let raw = params
        .get(name)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .ok_or(ParamError::Missing { name })?;
    raw.parse::<u64>().map_err(|_| ParamError::NotAnInteger {
        name,
        value: raw.to_string(),
    })
}

fn bounded(params: &Params, name: &'static str, min: u64, max: u64) -> Result<u64, ParamError> {
    let value = unsigned(params, name)?;
    if !(min..=max).contains(&value) {
        return Err(ParamError::OutOfRange {
            name,
            value,
            min,
            max,
        });
    }
    Ok(value)
}

fn comparator_width(
    name: &'static str,
    value: u64,
    config: &CompilerConfig,
) -> Result<(), ParamError> {
    if config.fits_comparator(value) {
        Ok(())
    } else {
        Err(ParamError::TooWide {
            name,
            value,
            bits: config.comparator_bits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn resolve(op: AdvancedOperator, pairs: &[(&str, &str)]) -> Result<Primitive, ParamError> {
        Primitive::resolve(op, &params(pairs), &CompilerConfig::default())
    }

    #[test]
    fn range_check_requires_ordered_bounds() {
        assert_eq!(
            resolve(AdvancedOperator::RangeCheck, &[("min", "18"), ("max", " 65 ")]),
            Ok(Primitive::RangeCheck { min: 18, max: 65 })
        );
        assert_eq!(
            resolve(AdvancedOperator::RangeCheck, &[("min", "10"), ("max", "5")]),
            Err(ParamError::EmptyRange { min: 10, max: 5 })
        );
        assert_eq!(
            resolve(AdvancedOperator::RangeCheck, &[("min", "10")]),
            Err(ParamError::Missing { name: "max" })
        );
        assert!(matches!(
            resolve(AdvancedOperator::RangeCheck, &[("min", "0"), ("max", "5000000000")]),
            Err(ParamError::TooWide { name: "max", .. })
        ));
    }

    #[test]
    fn every_primitive_reports_its_first_required_param() {
        for operator in AdvancedOperator::ALL {
            assert_eq!(
                resolve(operator, &[]),
                Err(ParamError::Missing {
                    name: operator.required_params()[0]
                }),
                "{operator}"
            );
        }
    }

    #[test]
    fn negative_and_blank_values_are_rejected() {
        assert!(matches!(
            resolve(AdvancedOperator::Modulo, &[("modulus", "-3")]),
            Err(ParamError::NotAnInteger { .. })
        ));
        assert_eq!(
            resolve(AdvancedOperator::Conditional, &[("condition", "  ")]),
            Err(ParamError::Missing { name: "condition" })
        );
        assert!(matches!(
            resolve(AdvancedOperator::Modulo, &[("modulus", "0")]),
            Err(ParamError::OutOfRange { name: "modulus", .. })
        ));
    }

    #[test]
    fn depth_and_inputs_respect_config_limits() {
        assert_eq!(
            resolve(AdvancedOperator::MerkleProof, &[("depth", "20")]),
            Ok(Primitive::MerkleProof { depth: 20 })
        );
        assert!(resolve(AdvancedOperator::MerkleProof, &[("depth", "0")]).is_err());
        assert!(resolve(AdvancedOperator::MerkleProof, &[("depth", "33")]).is_err());
        assert_eq!(
            resolve(AdvancedOperator::Hash, &[("inputs", "16")]),
            Ok(Primitive::Hash { inputs: 16 })
        );
        assert!(resolve(AdvancedOperator::Hash, &[("inputs", "17")]).is_err());
    }
}
