use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete confidence attached to a prediction, banded by months ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    #[schemars(description = "Up to 3 months beyond the last observed month")]
    High,

    #[schemars(description = "4 to 6 months ahead")]
    Medium,

    #[schemars(description = "More than 6 months ahead")]
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "HIGH",
            Confidence::Medium => "MEDIUM",
            Confidence::Low => "LOW",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upper bounds are inclusive: 3 is HIGH, 6 is MEDIUM.
pub fn compute_confidence(months_ahead: u32) -> Confidence {
    match months_ahead {
        0..=3 => Confidence::High,
        4..=6 => Confidence::Medium,
        _ => Confidence::Low,
    }
}
