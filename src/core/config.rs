//! Engine configuration with documented constants
//!
//! All tunable numbers for procedure consequences are collected here with
//! explanations of their purpose and how they interact with each other.

use serde::{Deserialize, Serialize};

use crate::check::Difficulty;
use crate::core::error::{ProcedureError, Result};
use crate::entity::wounds::WoundSeverity;
use crate::items::DecayState;

/// Configuration for the procedure engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === DIFFICULTY ===
    /// Stages added when the patient is awake for an invasive procedure
    ///
    /// A conscious patient squirms and fights the knife; at 2 a Normal
    /// procedure becomes Very Hard.
    pub conscious_patient_stages: i32,

    /// Stages removed when working on a corpse
    ///
    /// No bleeding, no movement. At 1 a Normal procedure becomes Easy.
    pub corpse_stages: i32,

    // === FINALIZATION ===
    /// Stitch-up difficulty left by a clean completion
    pub completion_finalization_difficulty: Difficulty,

    /// Stitch-up difficulty left by an interrupted invasive procedure
    ///
    /// Aborts leave ragged, half-finished incisions, so this should be
    /// harder than `completion_finalization_difficulty`.
    pub abort_finalization_difficulty: Difficulty,

    /// Severity of the closed wound a successful finalization leaves
    ///
    /// Each success degree steps it down. A failed closure leaves no wound;
    /// it escalates the open requirement instead.
    pub finalization_wound_severity: WoundSeverity,

    /// Virulence of infections seeded by a botched stitch-up
    pub finalization_infection_virulence: Difficulty,

    // === BLEEDING & TRAUMA ===
    /// Internal bleed rate added per failure degree of an invasive procedure
    ///
    /// At 0.25 a major failure (3 degrees) adds 0.75, roughly a very severe
    /// external wound.
    pub bleeding_per_failure_degree: f64,

    /// Severity of the shearing wound an interrupted amputation leaves
    pub amputation_abort_severity: WoundSeverity,

    /// Internal bleeding stopped per success degree of trauma control
    pub trauma_control_per_degree: f64,

    /// Organ function bonus per success degree of stabilisation
    pub stabilisation_per_degree: f64,

    // === TISSUE VIABILITY ===
    /// Most decayed organ a transplant can restore
    pub max_transplant_decay: DecayState,

    /// Most decayed severed part a replantation can restore
    pub max_replant_decay: DecayState,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            conscious_patient_stages: 2,
            corpse_stages: 1,

            completion_finalization_difficulty: Difficulty::Normal,
            abort_finalization_difficulty: Difficulty::Hard,
            finalization_wound_severity: WoundSeverity::Moderate,
            finalization_infection_virulence: Difficulty::Normal,

            bleeding_per_failure_degree: 0.25,
            amputation_abort_severity: WoundSeverity::Horrifying,
            trauma_control_per_degree: 0.5,
            stabilisation_per_degree: 0.1,

            max_transplant_decay: DecayState::Recent,
            max_replant_decay: DecayState::Recent,
        }
    }
}

impl EngineConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a (possibly partial) TOML document over the defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.bleeding_per_failure_degree < 0.0 {
            return Err(ProcedureError::InvalidConfig(
                "bleeding_per_failure_degree must not be negative".into(),
            ));
        }

        if self.trauma_control_per_degree < 0.0 || self.stabilisation_per_degree < 0.0 {
            return Err(ProcedureError::InvalidConfig(
                "per-degree treatment amounts must not be negative".into(),
            ));
        }

        if self.abort_finalization_difficulty < self.completion_finalization_difficulty {
            return Err(ProcedureError::InvalidConfig(format!(
                "abort_finalization_difficulty ({}) should be >= completion_finalization_difficulty ({})",
                self.abort_finalization_difficulty, self.completion_finalization_difficulty
            )));
        }

        if self.conscious_patient_stages < 0 || self.corpse_stages < 0 {
            return Err(ProcedureError::InvalidConfig(
                "stage adjustments must not be negative".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_overrides_defaults() {
        let config = EngineConfig::from_toml_str(
            "bleeding_per_failure_degree = 0.5\nabort_finalization_difficulty = \"VeryHard\"\n",
        )
        .unwrap();
        assert_eq!(config.bleeding_per_failure_degree, 0.5);
        assert_eq!(config.abort_finalization_difficulty, Difficulty::VeryHard);
        assert_eq!(config.corpse_stages, 1);
    }

    #[test]
    fn test_inverted_finalization_difficulties_rejected() {
        let config = EngineConfig {
            abort_finalization_difficulty: Difficulty::Easy,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
