use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a display slot. Zero is reserved as the "no value"
/// sentinel and is never a valid slot.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct SlotId(pub u64);

/// Identifier of a banner (creative). Zero is reserved.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct BannerId(pub u64);

/// Opaque identifier of a user group. Zero is reserved.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct UserGroupId(pub u64);

macro_rules! id_impls {
    ($name:ident) => {
        impl $name {
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// True when this is the reserved "no value" sentinel.
            pub const fn is_zero(&self) -> bool {
                self.0 == 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

id_impls!(SlotId);
id_impls!(BannerId);
id_impls!(UserGroupId);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RotationEventType {
    Click,
    View,
}

/// Feedback event published to NATS on every recorded click and every
/// selection. Consumed downstream for reporting; never read back to serve
/// decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationEvent {
    pub event_id: Uuid,
    #[serde(rename = "type")]
    pub event_type: RotationEventType,
    pub slot_id: SlotId,
    pub banner_id: BannerId,
    pub user_group_id: UserGroupId,
    pub timestamp: DateTime<Utc>,
}
