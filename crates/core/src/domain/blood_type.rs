use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// ABO/Rh blood group used as the inventory key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BloodType {
    APositive,
    ANegative,
    BPositive,
    BNegative,
    AbPositive,
    AbNegative,
    OPositive,
    ONegative,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown blood type `{0}` (expected one of A+, A-, B+, B-, AB+, AB-, O+, O-)")]
pub struct ParseBloodTypeError(pub String);

impl BloodType {
    pub const COUNT: usize = 8;

    pub const ALL: [BloodType; Self::COUNT] = [
        BloodType::APositive,
        BloodType::ANegative,
        BloodType::BPositive,
        BloodType::BNegative,
        BloodType::AbPositive,
        BloodType::AbNegative,
        BloodType::OPositive,
        BloodType::ONegative,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::APositive => "A+",
            Self::ANegative => "A-",
            Self::BPositive => "B+",
            Self::BNegative => "B-",
            Self::AbPositive => "AB+",
            Self::AbNegative => "AB-",
            Self::OPositive => "O+",
            Self::ONegative => "O-",
        }
    }

    /// Position in [`BloodType::ALL`]; stable, used to index per-type slots.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for BloodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BloodType {
    type Err = ParseBloodTypeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        // U+2212 MINUS SIGN shows up when labels are copied from rendered pages.
        let normalized = value.trim().replace('\u{2212}', "-").to_ascii_uppercase();
        match normalized.as_str() {
            "A+" => Ok(Self::APositive),
            "A-" => Ok(Self::ANegative),
            "B+" => Ok(Self::BPositive),
            "B-" => Ok(Self::BNegative),
            "AB+" => Ok(Self::AbPositive),
            "AB-" => Ok(Self::AbNegative),
            "O+" => Ok(Self::OPositive),
            "O-" => Ok(Self::ONegative),
            _ => Err(ParseBloodTypeError(value.to_string())),
        }
    }
}

impl Serialize for BloodType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BloodType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
