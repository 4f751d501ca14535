//! Wound records on a living body
//!
//! Wounds track bodypart, severity, bleeding, infection and whether they
//! have been treated.

use serde::{Deserialize, Serialize};

use crate::check::Difficulty;
use crate::core::types::{BodypartId, Tick};

/// Wound severity categories (not f32)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WoundSeverity {
    None,
    Superficial,
    Minor,
    Small,
    Moderate,
    Severe,
    VerySevere,
    Grievous,
    /// One step short of fatal
    Horrifying,
}

impl WoundSeverity {
    pub fn all() -> [WoundSeverity; 9] {
        [
            WoundSeverity::None,
            WoundSeverity::Superficial,
            WoundSeverity::Minor,
            WoundSeverity::Small,
            WoundSeverity::Moderate,
            WoundSeverity::Severe,
            WoundSeverity::VerySevere,
            WoundSeverity::Grievous,
            WoundSeverity::Horrifying,
        ]
    }

    /// Step the severity up (positive) or down (negative), saturating
    pub fn shift(self, steps: i32) -> Self {
        let index = (self as i32 + steps).clamp(0, WoundSeverity::Horrifying as i32) as usize;
        WoundSeverity::all()[index]
    }

    pub fn describe(&self) -> &'static str {
        match self {
            WoundSeverity::None => "negligible",
            WoundSeverity::Superficial => "superficial",
            WoundSeverity::Minor => "minor",
            WoundSeverity::Small => "small",
            WoundSeverity::Moderate => "moderate",
            WoundSeverity::Severe => "severe",
            WoundSeverity::VerySevere => "very severe",
            WoundSeverity::Grievous => "grievous",
            WoundSeverity::Horrifying => "horrifying",
        }
    }

    /// External bleed rate a fresh untreated wound of this severity causes
    pub fn bleed_rate(&self) -> f64 {
        match self {
            WoundSeverity::None | WoundSeverity::Superficial => 0.0,
            WoundSeverity::Minor => 0.05,
            WoundSeverity::Small => 0.1,
            WoundSeverity::Moderate => 0.25,
            WoundSeverity::Severe => 0.5,
            WoundSeverity::VerySevere => 1.0,
            WoundSeverity::Grievous => 2.0,
            WoundSeverity::Horrifying => 4.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageType {
    Slashing,
    Piercing,
    Crushing,
    Shearing,
    Burning,
    /// Controlled incision left by surgery
    Surgical,
}

/// An infection seeded in a wound
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Infection {
    /// How hard the infection is to fight off
    pub virulence: Difficulty,
    /// 0.0 = just seeded, 1.0 = gangrenous
    pub intensity: f64,
}

/// Individual wound on a body part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wound {
    pub bodypart: BodypartId,
    pub damage_type: DamageType,
    pub severity: WoundSeverity,
    pub bleeding: f64,
    pub infection: Option<Infection>,
    /// Cleaned and closed
    pub treated: bool,
    pub tick_received: Tick,
}

impl Wound {
    pub fn new(bodypart: BodypartId, damage_type: DamageType, severity: WoundSeverity, tick: Tick) -> Self {
        Self {
            bodypart,
            damage_type,
            severity,
            bleeding: severity.bleed_rate(),
            infection: None,
            treated: false,
            tick_received: tick,
        }
    }

    pub fn with_infection(mut self, infection: Infection) -> Self {
        self.infection = Some(infection);
        self
    }

    /// Mark the wound as cleaned and closed; treated wounds stop bleeding
    pub fn treat(&mut self) {
        self.treated = true;
        self.bleeding = 0.0;
    }

    pub fn is_bleeding(&self) -> bool {
        self.bleeding > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_saturates() {
        assert_eq!(WoundSeverity::Grievous.shift(3), WoundSeverity::Horrifying);
        assert_eq!(WoundSeverity::Minor.shift(-5), WoundSeverity::None);
        assert_eq!(WoundSeverity::Small.shift(1), WoundSeverity::Moderate);
    }

    #[test]
    fn test_new_wound_bleeds_by_severity() {
        let wound = Wound::new(BodypartId(1), DamageType::Shearing, WoundSeverity::Horrifying, 0);
        assert!(wound.is_bleeding());
        let scratch = Wound::new(BodypartId(1), DamageType::Surgical, WoundSeverity::Superficial, 0);
        assert!(!scratch.is_bleeding());
    }

    #[test]
    fn test_treat_stops_bleeding() {
        let mut wound = Wound::new(BodypartId(2), DamageType::Surgical, WoundSeverity::Moderate, 5);
        wound.treat();
        assert!(wound.treated);
        assert!(!wound.is_bleeding());
    }
}
