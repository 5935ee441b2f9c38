//! Bounded stream of shocks for one worker, with optional antithetic pairing.

use std::fmt;
use std::iter::FusedIterator;
use std::str::FromStr;

use super::prng::WorkerRng;

/// Variance reduction applied when drawing shocks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum VarianceReduction {
    /// Independent draws.
    #[default]
    None,
    /// Draws come in pairs `(z, -z)`; an odd count ends with one unpaired draw.
    Antithetic,
}

impl VarianceReduction {
    /// Returns true for antithetic sampling.
    #[inline]
    pub fn is_antithetic(self) -> bool {
        matches!(self, Self::Antithetic)
    }

    /// Short lowercase name, as used on the command line and in CSV output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "standard",
            Self::Antithetic => "antithetic",
        }
    }
}

impl fmt::Display for VarianceReduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VarianceReduction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "standard" | "plain" => Ok(Self::None),
            "antithetic" => Ok(Self::Antithetic),
            other => Err(format!(
                "unknown variance reduction '{}': expected 'standard' or 'antithetic'",
                other
            )),
        }
    }
}

/// Yields exactly `count` standard normal shocks from a seeded stream.
///
/// In antithetic mode the sequence is `z0, -z0, z1, -z1, ...`; when `count`
/// is odd the final shock is a fresh unpaired draw. Only one underlying draw
/// is consumed per pair.
///
/// # Examples
///
/// ```rust
/// use pricer_distributed::rng::{SampleGenerator, VarianceReduction};
///
/// let shocks: Vec<f64> = SampleGenerator::new(7, 4, VarianceReduction::Antithetic).collect();
/// assert_eq!(shocks.len(), 4);
/// assert_eq!(shocks[1], -shocks[0]);
/// assert_eq!(shocks[3], -shocks[2]);
/// ```
///
/// A stream cannot be forked; replaying means constructing a new generator
/// from the same seed.
///
/// ```compile_fail
/// use pricer_distributed::rng::{SampleGenerator, VarianceReduction};
///
/// let generator = SampleGenerator::new(7, 4, VarianceReduction::None);
/// let _fork = generator.clone();
/// ```
#[derive(Debug)]
pub struct SampleGenerator {
    rng: WorkerRng,
    remaining: u64,
    mode: VarianceReduction,
    /// Mirror image of the last drawn shock, pending emission.
    pending: Option<f64>,
}

impl SampleGenerator {
    /// Creates a generator of `count` shocks seeded with `seed`.
    pub fn new(seed: u64, count: u64, mode: VarianceReduction) -> Self {
        Self {
            rng: WorkerRng::from_seed(seed),
            remaining: count,
            mode,
            pending: None,
        }
    }
}

impl Iterator for SampleGenerator {
    type Item = f64;

    #[inline]
    fn next(&mut self) -> Option<f64> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        if let Some(mirror) = self.pending.take() {
            return Some(mirror);
        }

        let z = self.rng.gen_normal();
        // Only queue a mirror if there is room for it.
        if self.mode.is_antithetic() && self.remaining > 0 {
            self.pending = Some(-z);
        }
        Some(z)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.remaining) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}

// A u64 count only fits the exact length contract when usize is 64 bits.
#[cfg(target_pointer_width = "64")]
impl ExactSizeIterator for SampleGenerator {}

impl FusedIterator for SampleGenerator {}
