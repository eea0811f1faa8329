//! Time-to-compromise values.
//!
//! The platform expresses TTC as a distribution name plus zero or more
//! numeric parameters, serialized on the wire either as a structured object
//! (inside model documents) or as a comma-separated string (inside tunings),
//! e.g. `"Exponential,0.1"`. The `Infinity` distribution is the sentinel for
//! an attack step the attacker can never complete.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

/// Distribution name used to disable an attack step.
pub const DISABLED_DISTRIBUTION: &str = "Infinity";

/// A time-to-compromise specification: a distribution tag drawn from the
/// platform's open vocabulary plus its numeric parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ttc {
    pub distribution: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<f64>,
}

impl Ttc {
    pub fn new(distribution: impl Into<String>, parameters: Vec<f64>) -> Self {
        Self {
            distribution: distribution.into(),
            parameters,
        }
    }

    /// The sentinel value meaning "never compromised".
    pub fn disabled() -> Self {
        Self {
            distribution: DISABLED_DISTRIBUTION.to_string(),
            parameters: Vec::new(),
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.distribution == DISABLED_DISTRIBUTION
    }
}

impl fmt::Display for Ttc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.distribution)?;
        for param in &self.parameters {
            write!(f, ",{}", param)?;
        }
        Ok(())
    }
}

impl FromStr for Ttc {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(',');
        let distribution = match parts.next() {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => {
                return Err(ValidationError::Invalid(format!(
                    "Empty TTC distribution in '{s}'"
                )))
            }
        };
        let mut parameters = Vec::new();
        for part in parts {
            let value: f64 = part.trim().parse().map_err(|_| {
                ValidationError::Invalid(format!("Invalid TTC parameter '{part}' in '{s}'"))
            })?;
            parameters.push(value);
        }
        Ok(Self {
            distribution,
            parameters,
        })
    }
}
