use std::fmt;
use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::types::errors::ConfidenceError;

/// Confidence attached to a category suggestion, always within `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct ConfidenceScore(f64);

impl ConfidenceScore {
    pub const MIN: f64 = 0.0;
    pub const MAX: f64 = 1.0;

    pub fn new(value: f64) -> Result<Self, ConfidenceError> {
        //NOTE: NaN fails both comparisons, so it is rejected here as well
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(ConfidenceError::OutOfRange(value));
        }

        Ok(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Arithmetic mean of the given scores, `None` when there are none.
    pub fn mean<I>(scores: I) -> Option<Self>
    where
        I: IntoIterator<Item = ConfidenceScore>,
    {
        let (sum, count) = scores.into_iter()
            .fold((0.0, 0usize), |(sum, count), score| (sum + score.0, count + 1));

        if count == 0 {
            return None;
        }

        //NOTE: Float rounding can push the mean a hair past the bounds, clamp keeps the invariant
        Some(Self((sum / count as f64).clamp(Self::MIN, Self::MAX)))
    }
}

impl TryFrom<f64> for ConfidenceScore {
    type Error = ConfidenceError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl Display for ConfidenceScore {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{:.2}", self.0)
    }
}
