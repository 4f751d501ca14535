pub mod body;
pub mod character;
pub mod wounds;

pub use body::{
    Body, BoneState, FinalizationRequirement, InstalledCannula, InstalledImplant, SeveredParts,
};
pub use character::{Character, CharacterState, Merit};
pub use wounds::{DamageType, Infection, Wound, WoundSeverity};
