/// Trait ledger: a player's bounded lie-profile traits.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown trait name: {0}")]
pub struct UnknownTrait(pub String);

/// The numeric traits a player carries through every story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TraitName {
    LieCreativity,
    TruthResistance,
    ParadoxAptitude,
}

impl TraitName {
    pub const ALL: [TraitName; 3] = [
        TraitName::LieCreativity,
        TraitName::TruthResistance,
        TraitName::ParadoxAptitude,
    ];

    /// Inclusive `(min, max)` range a trait is clamped to.
    pub fn bounds(self) -> (i32, i32) {
        match self {
            Self::LieCreativity | Self::TruthResistance => (1, 10),
            Self::ParadoxAptitude => (1, 5),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LieCreativity => "lieCreativity",
            Self::TruthResistance => "truthResistance",
            Self::ParadoxAptitude => "paradoxAptitude",
        }
    }
}

impl fmt::Display for TraitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TraitName {
    type Err = UnknownTrait;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lieCreativity" | "lie_creativity" => Ok(Self::LieCreativity),
            "truthResistance" | "truth_resistance" => Ok(Self::TruthResistance),
            "paradoxAptitude" | "paradox_aptitude" => Ok(Self::ParadoxAptitude),
            other => Err(UnknownTrait(other.to_string())),
        }
    }
}

/// A player's lie profile. Values only change through [`LieProfile::apply_delta`],
/// which keeps every trait inside its bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredProfile")]
pub struct LieProfile {
    lie_creativity: i32,
    truth_resistance: i32,
    paradox_aptitude: i32,
}

impl Default for LieProfile {
    fn default() -> Self {
        Self {
            lie_creativity: 5,
            truth_resistance: 5,
            paradox_aptitude: 1,
        }
    }
}

// Stored documents may carry values written by older code; clamp on the way in.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredProfile {
    lie_creativity: i32,
    truth_resistance: i32,
    paradox_aptitude: i32,
}

impl From<StoredProfile> for LieProfile {
    fn from(raw: StoredProfile) -> Self {
        Self::new(raw.lie_creativity, raw.truth_resistance, raw.paradox_aptitude)
    }
}

impl LieProfile {
    /// Create a profile; out-of-range starting values are clamped.
    pub fn new(lie_creativity: i32, truth_resistance: i32, paradox_aptitude: i32) -> Self {
        Self {
            lie_creativity: clamp(TraitName::LieCreativity, lie_creativity as i64),
            truth_resistance: clamp(TraitName::TruthResistance, truth_resistance as i64),
            paradox_aptitude: clamp(TraitName::ParadoxAptitude, paradox_aptitude as i64),
        }
    }

    pub fn get(&self, name: TraitName) -> i32 {
        match name {
            TraitName::LieCreativity => self.lie_creativity,
            TraitName::TruthResistance => self.truth_resistance,
            TraitName::ParadoxAptitude => self.paradox_aptitude,
        }
    }

    pub fn lie_creativity(&self) -> i32 {
        self.lie_creativity
    }

    pub fn truth_resistance(&self) -> i32 {
        self.truth_resistance
    }

    pub fn paradox_aptitude(&self) -> i32 {
        self.paradox_aptitude
    }

    /// True if the trait is at or above `level`.
    pub fn meets(&self, name: TraitName, level: i32) -> bool {
        self.get(name) >= level
    }

    /// Add a signed delta and saturate at the trait's bounds. Returns the new value.
    pub fn apply_delta(&mut self, name: TraitName, delta: i32) -> i32 {
        let value = clamp(name, self.get(name) as i64 + delta as i64);
        match name {
            TraitName::LieCreativity => self.lie_creativity = value,
            TraitName::TruthResistance => self.truth_resistance = value,
            TraitName::ParadoxAptitude => self.paradox_aptitude = value,
        }
        value
    }
}

fn clamp(name: TraitName, value: i64) -> i32 {
    let (min, max) = name.bounds();
    value.clamp(min as i64, max as i64) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_new_player() {
        let p = LieProfile::default();
        assert_eq!(p.lie_creativity(), 5);
        assert_eq!(p.truth_resistance(), 5);
        assert_eq!(p.paradox_aptitude(), 1);
    }

    #[test]
    fn positive_delta_saturates() {
        let mut p = LieProfile::default();
        assert_eq!(p.apply_delta(TraitName::LieCreativity, 100), 10);
        assert_eq!(p.lie_creativity(), 10);
    }

    #[test]
    fn extreme_deltas_never_wrap() {
        let mut p = LieProfile::default();
        assert_eq!(p.apply_delta(TraitName::TruthResistance, i32::MIN), 1);
        assert_eq!(p.apply_delta(TraitName::TruthResistance, i32::MAX), 10);
        assert_eq!(p.apply_delta(TraitName::ParadoxAptitude, i32::MAX), 5);
    }

    #[test]
    fn aptitude_has_narrower_bounds() {
        let mut p = LieProfile::default();
        assert_eq!(p.apply_delta(TraitName::ParadoxAptitude, 2), 3);
        assert_eq!(p.apply_delta(TraitName::ParadoxAptitude, 7), 5);
        assert_eq!(p.apply_delta(TraitName::ParadoxAptitude, -9), 1);
    }

    #[test]
    fn new_clamps_starting_values() {
        let p = LieProfile::new(0, 42, 9);
        assert_eq!(p.get(TraitName::LieCreativity), 1);
        assert_eq!(p.get(TraitName::TruthResistance), 10);
        assert_eq!(p.get(TraitName::ParadoxAptitude), 5);
    }

    #[test]
    fn trait_names_parse() {
        assert_eq!("lieCreativity".parse::<TraitName>().unwrap(), TraitName::LieCreativity);
        assert_eq!("paradox_aptitude".parse::<TraitName>().unwrap(), TraitName::ParadoxAptitude);
        assert!("charisma".parse::<TraitName>().is_err());
    }

    #[test]
    fn unknown_trait_fails_to_deserialize() {
        let parsed: Result<TraitName, _> = ron::from_str("charisma");
        assert!(parsed.is_err());
        let ok: TraitName = ron::from_str("truthResistance").unwrap();
        assert_eq!(ok, TraitName::TruthResistance);
    }

    #[test]
    fn stored_values_clamped_on_load() {
        let p: LieProfile =
            ron::from_str("(lieCreativity: 15, truthResistance: 3, paradoxAptitude: 0)").unwrap();
        assert_eq!(p.lie_creativity(), 10);
        assert_eq!(p.truth_resistance(), 3);
        assert_eq!(p.paradox_aptitude(), 1);
    }

    #[test]
    fn meets_threshold() {
        let p = LieProfile::new(7, 5, 2);
        assert!(p.meets(TraitName::LieCreativity, 7));
        assert!(!p.meets(TraitName::ParadoxAptitude, 3));
    }
}
