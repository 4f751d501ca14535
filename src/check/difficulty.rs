//! Difficulty scale for skill checks
//!
//! Difficulties are categorical stages, never percentages. Situational
//! modifiers move a difficulty up or down by whole stages.

use serde::{Deserialize, Serialize};

/// Ordered difficulty stages, easiest first
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[repr(u8)]
pub enum Difficulty {
    Automatic = 0,
    Trivial = 1,
    ExtremelyEasy = 2,
    VeryEasy = 3,
    Easy = 4,
    #[default]
    Normal = 5,
    Hard = 6,
    VeryHard = 7,
    ExtremelyHard = 8,
    Insane = 9,
    Impossible = 10,
}

impl Difficulty {
    /// Returns all stages in ascending order
    pub fn all() -> [Difficulty; 11] {
        [
            Difficulty::Automatic,
            Difficulty::Trivial,
            Difficulty::ExtremelyEasy,
            Difficulty::VeryEasy,
            Difficulty::Easy,
            Difficulty::Normal,
            Difficulty::Hard,
            Difficulty::VeryHard,
            Difficulty::ExtremelyHard,
            Difficulty::Insane,
            Difficulty::Impossible,
        ]
    }

    fn from_index(index: i32) -> Self {
        let clamped = index.clamp(0, Difficulty::Impossible as i32) as usize;
        Difficulty::all()[clamped]
    }

    /// Make the check harder by `stages`. Negative values make it easier.
    pub fn stage_up(self, stages: i32) -> Self {
        Self::from_index(self as i32 + stages)
    }

    /// Make the check easier by `stages`. Negative values make it harder.
    pub fn stage_down(self, stages: i32) -> Self {
        Self::from_index(self as i32 - stages)
    }

    /// Human-readable name
    pub fn describe(&self) -> &'static str {
        match self {
            Difficulty::Automatic => "automatic",
            Difficulty::Trivial => "trivial",
            Difficulty::ExtremelyEasy => "extremely easy",
            Difficulty::VeryEasy => "very easy",
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
            Difficulty::VeryHard => "very hard",
            Difficulty::ExtremelyHard => "extremely hard",
            Difficulty::Insane => "insane",
            Difficulty::Impossible => "impossible",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.describe())
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        Difficulty::all()
            .into_iter()
            .find(|d| d.describe().replace(' ', "") == normalized)
            .ok_or_else(|| format!("unknown difficulty '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_up_saturates() {
        assert_eq!(Difficulty::Insane.stage_up(5), Difficulty::Impossible);
        assert_eq!(Difficulty::Normal.stage_up(1), Difficulty::Hard);
    }

    #[test]
    fn test_stage_down_saturates() {
        assert_eq!(Difficulty::Trivial.stage_down(3), Difficulty::Automatic);
        assert_eq!(Difficulty::Normal.stage_down(2), Difficulty::VeryEasy);
    }

    #[test]
    fn test_negative_stages_reverse_direction() {
        assert_eq!(Difficulty::Normal.stage_up(-1), Difficulty::Easy);
        assert_eq!(Difficulty::Normal.stage_down(-1), Difficulty::Hard);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("Very Hard".parse::<Difficulty>(), Ok(Difficulty::VeryHard));
        assert_eq!("extremelyeasy".parse::<Difficulty>(), Ok(Difficulty::ExtremelyEasy));
        assert!("sideways".parse::<Difficulty>().is_err());
    }
}
