use rand::Rng;
use serde::{Deserialize, Serialize};

use ferret_model::ParamValue;

/// The set of values a parameter may take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParamDomain {
    /// `true` with probability `p_true`.
    Bool { p_true: f64 },
    /// Inclusive integer range.
    Int { min: i64, max: i64 },
    /// One of a fixed list of strings, uniformly.
    Choice { values: Vec<String> },
}

impl ParamDomain {
    pub fn choice(values: &[&str]) -> Self {
        ParamDomain::Choice {
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    /// Draw one value. Errors describe why the domain cannot produce a value.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<ParamValue, String> {
        match self {
            ParamDomain::Bool { p_true } => {
                if !(0.0..=1.0).contains(p_true) {
                    return Err(format!("probability {p_true} outside [0, 1]"));
                }
                Ok(ParamValue::Bool(rng.gen_bool(*p_true)))
            }
            ParamDomain::Int { min, max } => {
                if min > max {
                    return Err(format!("empty range {min}..={max}"));
                }
                Ok(ParamValue::Int(rng.gen_range(*min..=*max)))
            }
            ParamDomain::Choice { values } => {
                if values.is_empty() {
                    return Err("no values to choose from".to_string());
                }
                let idx = rng.gen_range(0..values.len());
                Ok(ParamValue::Text(values[idx].clone()))
            }
        }
    }
}
