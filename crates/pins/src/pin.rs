use std::fmt;

use foundation::math::Vec3;
use serde::{Deserialize, Serialize};

/// Store-assigned pin identifier. Opaque to the core.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinId(pub String);

impl PinId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named marker on the terrain model.
///
/// On the wire the position is an `[x, y, z]` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    pub id: PinId,
    pub label: String,
    #[serde(with = "position_array")]
    pub position: Vec3,
}

/// Create payload; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPin {
    pub label: String,
    #[serde(with = "position_array")]
    pub position: Vec3,
}

impl NewPin {
    pub fn new(label: impl Into<String>, position: Vec3) -> Self {
        Self {
            label: label.into(),
            position,
        }
    }

    pub fn into_pin(self, id: PinId) -> Pin {
        Pin {
            id,
            label: self.label,
            position: self.position,
        }
    }
}

mod position_array {
    use foundation::math::Vec3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(v: &Vec3, s: S) -> Result<S::Ok, S::Error> {
        v.as_array().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec3, D::Error> {
        <[f64; 3]>::deserialize(d).map(Vec3::from_array)
    }
}
