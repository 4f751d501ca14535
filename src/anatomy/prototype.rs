//! Body prototypes: the static anatomy a living body is built from
//!
//! A prototype is a tree of bodyparts (each with an optional upstream part)
//! plus the organs and bones each bodypart contains. Organs and bones may sit
//! inside several bodyparts; a heart is reachable through the chest or the
//! upper back.

use serde::{Deserialize, Serialize};

use crate::anatomy::lookup::{find_by_token, MatchReason};
use crate::core::types::{BodyPrototypeId, BodypartId, BoneId, OrganId};

/// Which face of the body a part sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Alignment {
    Front,
    FrontLeft,
    FrontRight,
    Left,
    Right,
    Rear,
    RearLeft,
    RearRight,
    Irrelevant,
}

impl Alignment {
    pub fn is_front(&self) -> bool {
        matches!(self, Alignment::Front | Alignment::FrontLeft | Alignment::FrontRight)
    }

    pub fn is_rear(&self) -> bool {
        matches!(self, Alignment::Rear | Alignment::RearLeft | Alignment::RearRight)
    }
}

/// Coarse organ category, used for sensitivity and compatibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrganKind {
    Brain,
    Heart,
    Lung,
    Liver,
    Kidney,
    Stomach,
    Intestines,
    Spleen,
    Trachea,
    Esophagus,
    SpinalCord,
    Eye,
    Other,
}

impl OrganKind {
    /// Extra difficulty stages for working on this organ
    pub fn sensitivity_stages(&self) -> i32 {
        match self {
            OrganKind::Brain | OrganKind::SpinalCord => 2,
            OrganKind::Heart => 2,
            OrganKind::Lung | OrganKind::Liver | OrganKind::Eye => 1,
            _ => 0,
        }
    }
}

/// Where an organ sits inside a bodypart and how exposed it is there
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrganLocation {
    pub organ: OrganId,
    pub hit_chance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodypartProto {
    pub id: BodypartId,
    pub name: String,
    pub alignment: Alignment,
    /// Relative chance of this part being struck
    pub relative_hit_chance: f64,
    pub upstream: Option<BodypartId>,
    pub severable: bool,
    /// Space available for implants
    pub implant_space: f64,
    pub organs: Vec<OrganLocation>,
    pub bones: Vec<BoneId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganProto {
    pub id: OrganId,
    pub name: String,
    pub kind: OrganKind,
    /// Losing this organ kills
    pub vital: bool,
    pub implant_space: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoneProto {
    pub id: BoneId,
    pub name: String,
    /// Extra difficulty stages to set this bone
    pub setting_stages: i32,
}

/// Static anatomy shared by every body built from it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyPrototype {
    pub id: BodyPrototypeId,
    pub name: String,
    pub bodyparts: Vec<BodypartProto>,
    pub organs: Vec<OrganProto>,
    pub bones: Vec<BoneProto>,
}

impl BodyPrototype {
    pub fn bodypart(&self, id: BodypartId) -> Option<&BodypartProto> {
        self.bodyparts.iter().find(|p| p.id == id)
    }

    pub fn organ(&self, id: OrganId) -> Option<&OrganProto> {
        self.organs.iter().find(|o| o.id == id)
    }

    pub fn bone(&self, id: BoneId) -> Option<&BoneProto> {
        self.bones.iter().find(|b| b.id == id)
    }

    pub fn bodypart_name(&self, id: BodypartId) -> &str {
        self.bodypart(id).map(|p| p.name.as_str()).unwrap_or("unknown bodypart")
    }

    pub fn organ_name(&self, id: OrganId) -> &str {
        self.organ(id).map(|o| o.name.as_str()).unwrap_or("unknown organ")
    }

    pub fn bone_name(&self, id: BoneId) -> &str {
        self.bone(id).map(|b| b.name.as_str()).unwrap_or("unknown bone")
    }

    /// Look a bodypart up by id, exact name, or name prefix
    pub fn find_bodypart(&self, token: &str) -> Option<(BodypartId, MatchReason)> {
        find_by_token(self.bodyparts.iter().map(|p| (p.id.0, p.name.as_str())), token)
            .map(|(id, reason)| (BodypartId(id), reason))
    }

    pub fn find_organ(&self, token: &str) -> Option<(OrganId, MatchReason)> {
        find_by_token(self.organs.iter().map(|o| (o.id.0, o.name.as_str())), token)
            .map(|(id, reason)| (OrganId(id), reason))
    }

    pub fn find_bone(&self, token: &str) -> Option<(BoneId, MatchReason)> {
        find_by_token(self.bones.iter().map(|b| (b.id.0, b.name.as_str())), token)
            .map(|(id, reason)| (BoneId(id), reason))
    }

    /// The part plus everything attached below it, upstream-first
    pub fn downstream_of(&self, part: BodypartId) -> Vec<BodypartId> {
        let mut result = vec![part];
        let mut index = 0;
        while index < result.len() {
            let current = result[index];
            result.extend(
                self.bodyparts
                    .iter()
                    .filter(|p| p.upstream == Some(current))
                    .map(|p| p.id),
            );
            index += 1;
        }
        result
    }

    pub fn parts_containing_organ(&self, organ: OrganId) -> impl Iterator<Item = (&BodypartProto, f64)> {
        self.bodyparts.iter().filter_map(move |p| {
            p.organs
                .iter()
                .find(|loc| loc.organ == organ)
                .map(|loc| (p, loc.hit_chance))
        })
    }

    pub fn parts_containing_bone(&self, bone: BoneId) -> impl Iterator<Item = &BodypartProto> {
        self.bodyparts.iter().filter(move |p| p.bones.contains(&bone))
    }

    pub fn part_contains_organ(&self, part: BodypartId, organ: OrganId) -> bool {
        self.bodypart(part)
            .map(|p| p.organs.iter().any(|loc| loc.organ == organ))
            .unwrap_or(false)
    }

    pub fn part_contains_bone(&self, part: BodypartId, bone: BoneId) -> bool {
        self.bodypart(part)
            .map(|p| p.bones.contains(&bone))
            .unwrap_or(false)
    }

    /// A standard humanoid with enough anatomy for every procedure family
    pub fn humanoid(id: BodyPrototypeId) -> Self {
        HumanoidBuilder::default().build(id)
    }
}

#[derive(Default)]
struct HumanoidBuilder {
    parts: Vec<BodypartProto>,
    organs: Vec<OrganProto>,
    bones: Vec<BoneProto>,
}

impl HumanoidBuilder {
    fn organ(&mut self, name: &str, kind: OrganKind, vital: bool) -> OrganId {
        let id = OrganId(self.organs.len() as u32 + 1);
        self.organs.push(OrganProto {
            id,
            name: name.into(),
            kind,
            vital,
            implant_space: 0.5,
        });
        id
    }

    fn bone(&mut self, name: &str, setting_stages: i32) -> BoneId {
        let id = BoneId(self.bones.len() as u32 + 1);
        self.bones.push(BoneProto {
            id,
            name: name.into(),
            setting_stages,
        });
        id
    }

    #[allow(clippy::too_many_arguments)]
    fn part(
        &mut self,
        name: &str,
        alignment: Alignment,
        hit: f64,
        upstream: Option<BodypartId>,
        severable: bool,
        implant_space: f64,
        organs: &[(OrganId, f64)],
        bones: &[BoneId],
    ) -> BodypartId {
        let id = BodypartId(self.parts.len() as u32 + 1);
        self.parts.push(BodypartProto {
            id,
            name: name.into(),
            alignment,
            relative_hit_chance: hit,
            upstream,
            severable,
            implant_space,
            organs: organs
                .iter()
                .map(|(organ, hit_chance)| OrganLocation {
                    organ: *organ,
                    hit_chance: *hit_chance,
                })
                .collect(),
            bones: bones.to_vec(),
        });
        id
    }

    fn build(mut self, id: BodyPrototypeId) -> BodyPrototype {
        let brain = self.organ("brain", OrganKind::Brain, true);
        let heart = self.organ("heart", OrganKind::Heart, true);
        let left_lung = self.organ("left lung", OrganKind::Lung, false);
        let right_lung = self.organ("right lung", OrganKind::Lung, false);
        let liver = self.organ("liver", OrganKind::Liver, true);
        let stomach = self.organ("stomach", OrganKind::Stomach, false);
        let intestines = self.organ("intestines", OrganKind::Intestines, false);
        let spleen = self.organ("spleen", OrganKind::Spleen, false);
        let left_kidney = self.organ("left kidney", OrganKind::Kidney, false);
        let right_kidney = self.organ("right kidney", OrganKind::Kidney, false);
        let trachea = self.organ("trachea", OrganKind::Trachea, true);
        let esophagus = self.organ("esophagus", OrganKind::Esophagus, false);
        let spinal_cord = self.organ("spinal cord", OrganKind::SpinalCord, true);
        let left_eye = self.organ("left eye", OrganKind::Eye, false);
        let right_eye = self.organ("right eye", OrganKind::Eye, false);

        let skull = self.bone("skull", 2);
        let vertebrae = self.bone("cervical vertebrae", 2);
        let sternum = self.bone("sternum", 0);
        let ribs = self.bone("ribs", 1);
        let pelvis = self.bone("pelvis", 1);
        let left_humerus = self.bone("left humerus", 0);
        let right_humerus = self.bone("right humerus", 0);
        let left_radius = self.bone("left radius", 0);
        let right_radius = self.bone("right radius", 0);
        let left_femur = self.bone("left femur", 1);
        let right_femur = self.bone("right femur", 1);
        let left_tibia = self.bone("left tibia", 0);
        let right_tibia = self.bone("right tibia", 0);

        let abdomen = self.part(
            "abdomen",
            Alignment::Front,
            0.15,
            None,
            false,
            2.0,
            &[(liver, 0.3), (stomach, 0.3), (intestines, 0.5), (spleen, 0.1), (left_kidney, 0.05), (right_kidney, 0.05)],
            &[pelvis],
        );
        let chest = self.part(
            "chest",
            Alignment::Front,
            0.2,
            Some(abdomen),
            false,
            3.0,
            &[(heart, 0.25), (left_lung, 0.35), (right_lung, 0.35)],
            &[sternum, ribs],
        );
        self.part(
            "upper back",
            Alignment::Rear,
            0.15,
            Some(abdomen),
            false,
            2.0,
            &[(heart, 0.1), (left_lung, 0.3), (right_lung, 0.3), (spinal_cord, 0.2)],
            &[ribs],
        );
        self.part(
            "lower back",
            Alignment::Rear,
            0.1,
            Some(abdomen),
            false,
            1.5,
            &[(left_kidney, 0.3), (right_kidney, 0.3), (liver, 0.1), (spinal_cord, 0.2)],
            &[pelvis],
        );
        let neck = self.part(
            "neck",
            Alignment::Front,
            0.04,
            Some(chest),
            true,
            0.5,
            &[(trachea, 0.4), (esophagus, 0.3), (spinal_cord, 0.1)],
            &[vertebrae],
        );
        let head = self.part(
            "head",
            Alignment::Front,
            0.08,
            Some(neck),
            true,
            1.0,
            &[(brain, 0.6)],
            &[skull],
        );
        self.part("left eye socket", Alignment::FrontLeft, 0.01, Some(head), false, 0.1, &[(left_eye, 1.0)], &[]);
        self.part("right eye socket", Alignment::FrontRight, 0.01, Some(head), false, 0.1, &[(right_eye, 1.0)], &[]);

        for (side, alignment, humerus, radius) in [
            ("left", Alignment::Left, left_humerus, left_radius),
            ("right", Alignment::Right, right_humerus, right_radius),
        ] {
            let upper = self.part(&format!("{} upper arm", side), alignment, 0.06, Some(chest), true, 1.0, &[], &[humerus]);
            let fore = self.part(&format!("{} forearm", side), alignment, 0.05, Some(upper), true, 1.0, &[], &[radius]);
            self.part(&format!("{} hand", side), alignment, 0.03, Some(fore), true, 0.5, &[], &[]);
        }

        for (side, alignment, femur, tibia) in [
            ("left", Alignment::Left, left_femur, left_tibia),
            ("right", Alignment::Right, right_femur, right_tibia),
        ] {
            let thigh = self.part(&format!("{} thigh", side), alignment, 0.07, Some(abdomen), true, 1.0, &[], &[femur]);
            let shin = self.part(&format!("{} shin", side), alignment, 0.05, Some(thigh), true, 1.0, &[], &[tibia]);
            self.part(&format!("{} foot", side), alignment, 0.02, Some(shin), true, 0.5, &[], &[]);
        }

        BodyPrototype {
            id,
            name: "humanoid".into(),
            bodyparts: self.parts,
            organs: self.organs,
            bones: self.bones,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn humanoid() -> BodyPrototype {
        BodyPrototype::humanoid(BodyPrototypeId(1))
    }

    #[test]
    fn test_downstream_includes_children() {
        let body = humanoid();
        let (arm, _) = body.find_bodypart("left upper arm").unwrap();
        let names: Vec<&str> = body
            .downstream_of(arm)
            .into_iter()
            .map(|id| body.bodypart_name(id))
            .collect();
        assert_eq!(names, vec!["left upper arm", "left forearm", "left hand"]);
    }

    #[test]
    fn test_heart_reachable_from_front_and_back() {
        let body = humanoid();
        let (heart, _) = body.find_organ("heart").unwrap();
        let parts: Vec<&str> = body
            .parts_containing_organ(heart)
            .map(|(p, _)| p.name.as_str())
            .collect();
        assert_eq!(parts, vec!["chest", "upper back"]);
    }

    #[test]
    fn test_alignment_faces() {
        assert!(Alignment::FrontLeft.is_front());
        assert!(Alignment::Rear.is_rear());
        assert!(!Alignment::Left.is_front());
    }

    #[test]
    fn test_vital_organ_sensitivity() {
        assert_eq!(OrganKind::Heart.sensitivity_stages(), 2);
        assert_eq!(OrganKind::Spleen.sensitivity_stages(), 0);
    }
}
