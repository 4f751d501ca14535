//! Static anatomy: body prototypes and name lookup

pub mod lookup;
pub mod prototype;

pub use lookup::{find_by_token, MatchReason};
pub use prototype::{
    Alignment, BodyPrototype, BodypartProto, BoneProto, OrganKind, OrganLocation, OrganProto,
};
