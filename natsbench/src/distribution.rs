use crate::error::{DistributionError, RandomParamsError};
use rand::Rng;
use serde_yaml::Value;
use std::f64::consts::PI;
use std::fmt;

/// A rule for picking a positive integer, used both for the delay between two
/// sends (milliseconds) and for payload sizes (bytes).
///
/// In the workload file a distribution is written as a three element
/// sequence, `[normal, mean, variance]` or `[random, min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Distribution {
    Normal { mean: f64, variance: f64 },
    Uniform { min: i64, max: i64 },
}

impl Distribution {
    pub fn normal(mean: f64, variance: f64) -> Result<Self, DistributionError> {
        if !mean.is_finite() || !variance.is_finite() {
            return Err(DistributionError::InvalidNormalParams);
        }
        Ok(Distribution::Normal { mean, variance })
    }

    pub fn uniform(min: i64, max: i64) -> Result<Self, DistributionError> {
        if min > max {
            return Err(RandomParamsError::MinGreaterThanMax.into());
        }
        Ok(Distribution::Uniform { min, max })
    }

    /// Builds a distribution from its `[kind, a, b]` form.
    pub fn from_value(raw: &Value) -> Result<Self, DistributionError> {
        let seq = raw
            .as_sequence()
            .ok_or_else(|| DistributionError::InvalidDistributionKind(format!("{:?}", raw)))?;
        let kind = match seq.first() {
            Some(Value::String(kind)) => kind.as_str(),
            other => {
                return Err(DistributionError::InvalidDistributionKind(format!(
                    "{:?}",
                    other
                )))
            }
        };
        let a = seq.get(1).and_then(Value::as_f64);
        let b = seq.get(2).and_then(Value::as_f64);
        match kind {
            "normal" => match (a, b) {
                (Some(mean), Some(variance)) => Distribution::normal(mean, variance),
                _ => Err(DistributionError::InvalidNormalParams),
            },
            "random" => match (a, b) {
                (Some(min), Some(max)) if min.is_finite() && max.is_finite() => {
                    if min > max {
                        return Err(RandomParamsError::MinGreaterThanMax.into());
                    }
                    // rounding is monotonic so the order survives it
                    Distribution::uniform(min.round() as i64, max.round() as i64)
                }
                _ => Err(RandomParamsError::NotNumeric.into()),
            },
            other => Err(DistributionError::InvalidDistributionKind(other.to_owned())),
        }
    }

    /// Picks a value using the thread local generator. Never returns 0.
    pub fn sample(&self) -> u64 {
        self.sample_with(&mut rand::thread_rng())
    }

    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        let value = match *self {
            Distribution::Normal { mean, variance } => {
                // Box-Muller, u1 is drawn from (0, 1] so ln(u1) stays finite
                let u1 = 1.0 - rng.gen::<f64>();
                let u2 = rng.gen::<f64>();
                let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
                (mean + z * variance).round()
            }
            Distribution::Uniform { min, max } => {
                let u = rng.gen::<f64>();
                min as f64 + ((max as f64 - min as f64) * u).round()
            }
        };
        at_least_one(value)
    }
}

fn at_least_one(value: f64) -> u64 {
    if value.is_nan() || value < 1.0 {
        1
    } else {
        // saturates at u64::MAX
        value as u64
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distribution::Normal { mean, variance } => write!(f, "[normal, {}, {}]", mean, variance),
            Distribution::Uniform { min, max } => write!(f, "[random, {}, {}]", min, max),
        }
    }
}
