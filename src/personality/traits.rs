//! Personality trait vector — five bounded dimensions shared by every user.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::InitialTraits;
use crate::error::TraitParseError;

/// A named personality dimension.
///
/// The set is closed: traits cannot be added or removed at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trait {
    Openness,
    Conscientiousness,
    Extraversion,
    Agreeableness,
    Empathy,
}

impl Trait {
    /// All traits in display order.
    pub const ALL: [Trait; 5] = [
        Trait::Openness,
        Trait::Conscientiousness,
        Trait::Extraversion,
        Trait::Agreeableness,
        Trait::Empathy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Trait::Openness => "openness",
            Trait::Conscientiousness => "conscientiousness",
            Trait::Extraversion => "extraversion",
            Trait::Agreeableness => "agreeableness",
            Trait::Empathy => "empathy",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Trait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Trait {
    type Err = TraitParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Trait::ALL
            .into_iter()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| TraitParseError(s.to_string()))
    }
}

/// Current value of every trait, each in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TraitVector {
    values: [f32; 5],
}

impl TraitVector {
    /// Build a vector from configured initial values, clamping each.
    pub fn new(initial: &InitialTraits) -> Self {
        let mut values = [0.0; 5];
        values[Trait::Openness.index()] = initial.openness;
        values[Trait::Conscientiousness.index()] = initial.conscientiousness;
        values[Trait::Extraversion.index()] = initial.extraversion;
        values[Trait::Agreeableness.index()] = initial.agreeableness;
        values[Trait::Empathy.index()] = initial.empathy;
        for v in values.iter_mut() {
            *v = clamp_unit(*v);
        }
        Self { values }
    }

    pub fn value(&self, t: Trait) -> f32 {
        self.values[t.index()]
    }

    /// Add `delta` to a trait and clamp to `[0, 1]`. Returns the new value.
    ///
    /// A NaN delta leaves the trait untouched.
    pub fn adjust(&mut self, t: Trait, delta: f32) -> f32 {
        let slot = &mut self.values[t.index()];
        if !delta.is_nan() {
            *slot = clamp_unit(*slot + delta);
        }
        *slot
    }

    pub fn iter(&self) -> impl Iterator<Item = (Trait, f32)> + '_ {
        Trait::ALL.into_iter().map(move |t| (t, self.value(t)))
    }

    /// Trait values keyed by name, in alphabetical order.
    pub fn to_map(&self) -> BTreeMap<String, f32> {
        self.iter().map(|(t, v)| (t.as_str().to_string(), v)).collect()
    }
}

impl Default for TraitVector {
    fn default() -> Self {
        Self::new(&InitialTraits::default())
    }
}

fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let traits = TraitVector::default();
        assert_eq!(traits.value(Trait::Openness), 0.7);
        assert_eq!(traits.value(Trait::Conscientiousness), 0.8);
        assert_eq!(traits.value(Trait::Extraversion), 0.6);
        assert_eq!(traits.value(Trait::Agreeableness), 0.75);
        assert_eq!(traits.value(Trait::Empathy), 0.7);
    }

    #[test]
    fn test_adjust_clamps_both_ends() {
        let mut traits = TraitVector::default();
        assert_eq!(traits.adjust(Trait::Empathy, 5.0), 1.0);
        assert_eq!(traits.adjust(Trait::Empathy, -12.5), 0.0);
        assert_eq!(traits.adjust(Trait::Empathy, f32::INFINITY), 1.0);
        assert_eq!(traits.adjust(Trait::Empathy, f32::NEG_INFINITY), 0.0);
    }

    #[test]
    fn test_repeated_deltas_stay_bounded() {
        let mut traits = TraitVector::default();
        let deltas = [0.3, -0.7, 0.05, 1.9, -0.01, -3.0, 0.45, 0.45, 0.45];
        for _ in 0..50 {
            for (i, d) in deltas.iter().enumerate() {
                let t = Trait::ALL[i % Trait::ALL.len()];
                let v = traits.adjust(t, *d);
                assert!((0.0..=1.0).contains(&v), "{} = {}", t, v);
            }
        }
    }

    #[test]
    fn test_nan_delta_is_ignored() {
        let mut traits = TraitVector::default();
        assert_eq!(traits.adjust(Trait::Openness, f32::NAN), 0.7);
    }

    #[test]
    fn test_initial_values_clamped() {
        let initial = InitialTraits {
            openness: 1.5,
            conscientiousness: -0.2,
            ..InitialTraits::default()
        };
        let traits = TraitVector::new(&initial);
        assert_eq!(traits.value(Trait::Openness), 1.0);
        assert_eq!(traits.value(Trait::Conscientiousness), 0.0);
    }

    #[test]
    fn test_parse_trait_names() {
        assert_eq!("Empathy".parse::<Trait>().unwrap(), Trait::Empathy);
        assert_eq!(" openness ".parse::<Trait>().unwrap(), Trait::Openness);
        assert_eq!(
            "humor".parse::<Trait>().unwrap_err(),
            TraitParseError("humor".into())
        );
    }

    #[test]
    fn test_to_map_has_every_trait() {
        let map = TraitVector::default().to_map();
        assert_eq!(map.len(), 5);
        assert_eq!(map["agreeableness"], 0.75);
    }
}
