//! Ranked check outcomes

use serde::{Deserialize, Serialize};

/// Result of a skill check, worst first.
///
/// `NotTested` sorts below every real result and is never a pass or a fail.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum Outcome {
    #[default]
    NotTested,
    MajorFail,
    Fail,
    MinorFail,
    MinorPass,
    Pass,
    MajorPass,
}

impl Outcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, Outcome::MinorPass | Outcome::Pass | Outcome::MajorPass)
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Outcome::MinorFail | Outcome::Fail | Outcome::MajorFail)
    }

    /// Degrees of success (0 for any failure)
    pub fn successes(&self) -> i32 {
        match self {
            Outcome::MinorPass => 1,
            Outcome::Pass => 2,
            Outcome::MajorPass => 3,
            _ => 0,
        }
    }

    /// Degrees of failure (0 for any success)
    pub fn failures(&self) -> i32 {
        match self {
            Outcome::MinorFail => 1,
            Outcome::Fail => 2,
            Outcome::MajorFail => 3,
            _ => 0,
        }
    }

    /// Signed distance from a neutral result
    pub fn degree(&self) -> i32 {
        self.successes() - self.failures()
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Outcome::NotTested => "not tested",
            Outcome::MajorFail => "major failure",
            Outcome::Fail => "failure",
            Outcome::MinorFail => "minor failure",
            Outcome::MinorPass => "minor success",
            Outcome::Pass => "success",
            Outcome::MajorPass => "major success",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        assert!(Outcome::MajorFail < Outcome::MinorFail);
        assert!(Outcome::MinorFail < Outcome::MinorPass);
        assert!(Outcome::NotTested < Outcome::MajorFail);
    }

    #[test]
    fn test_degrees() {
        assert_eq!(Outcome::MajorPass.degree(), 3);
        assert_eq!(Outcome::Fail.degree(), -2);
        assert_eq!(Outcome::NotTested.degree(), 0);
        assert!(!Outcome::NotTested.is_pass());
        assert!(!Outcome::NotTested.is_fail());
    }
}
