use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// School class a student is enrolled in (`1A` … `4B`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StudentClass {
    C1A,
    C1B,
    C2A,
    C2B,
    C3A,
    C3B,
    C4A,
    C4B,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownClass(pub String);

impl core::fmt::Display for UnknownClass {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "unknown student class '{}'", self.0)
    }
}

impl std::error::Error for UnknownClass {}

impl StudentClass {
    pub const ALL: [StudentClass; 8] = [
        StudentClass::C1A,
        StudentClass::C1B,
        StudentClass::C2A,
        StudentClass::C2B,
        StudentClass::C3A,
        StudentClass::C3B,
        StudentClass::C4A,
        StudentClass::C4B,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StudentClass::C1A => "1A",
            StudentClass::C1B => "1B",
            StudentClass::C2A => "2A",
            StudentClass::C2B => "2B",
            StudentClass::C3A => "3A",
            StudentClass::C3B => "3B",
            StudentClass::C4A => "4A",
            StudentClass::C4B => "4B",
        }
    }
}

impl core::fmt::Display for StudentClass {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StudentClass {
    type Err = UnknownClass;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownClass(s.to_string()))
    }
}

impl Serialize for StudentClass {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StudentClass {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("2b".parse::<StudentClass>().unwrap(), StudentClass::C2B);
        assert_eq!(" 4A ".parse::<StudentClass>().unwrap(), StudentClass::C4A);
        assert!("5A".parse::<StudentClass>().is_err());
    }

    #[test]
    fn serializes_as_display_value() {
        assert_eq!(serde_json::to_string(&StudentClass::C3A).unwrap(), "\"3A\"");
        let c: StudentClass = serde_json::from_str("\"1b\"").unwrap();
        assert_eq!(c, StudentClass::C1B);
        assert!(serde_json::from_str::<StudentClass>("\"C1B\"").is_err());
    }
}
