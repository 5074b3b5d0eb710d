use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SerialNumberParseError {
    #[error("Invalid hex character: {0}")]
    InvalidHexCharacter(char),

    #[error("Empty string provided")]
    EmptyString,
}

pub type Result<T> = std::result::Result<T, SerialNumberParseError>;

/// A certificate serial number: unique hexadecimal identifier doubling as the
/// certificate's storage base name.
///
/// Stored canonically as uppercase hex without leading zeros, so `"02"`, `"2"`
/// and `"0002"` compare equal. Display pads to at least two digits to match
/// the on-disk base-name format.
#[derive(Debug, Clone, Eq)]
pub struct SerialNumber {
    hex: String,
}

impl SerialNumber {
    /// Serial for a counter index (e.g. index 2 -> "02", index 26 -> "1A")
    pub fn from_index(index: u64) -> Self {
        Self {
            hex: format!("{index:X}"),
        }
    }

    /// Parse a hex serial string, canonicalizing case and leading zeros
    pub fn parse(identifier: &str) -> Result<Self> {
        if identifier.is_empty() {
            return Err(SerialNumberParseError::EmptyString);
        }

        for ch in identifier.chars() {
            if !ch.is_ascii_hexdigit() {
                return Err(SerialNumberParseError::InvalidHexCharacter(ch));
            }
        }

        let canonical = identifier.trim_start_matches('0').to_uppercase();
        if canonical.is_empty() {
            // All-zero input is the zero serial
            return Ok(Self {
                hex: "0".to_string(),
            });
        }

        Ok(Self { hex: canonical })
    }

    /// Canonical hex form (uppercase, no leading zeros)
    pub fn as_canonical(&self) -> &str {
        &self.hex
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Base-name format: two-or-more uppercase hex digits
        write!(f, "{:0>2}", self.hex)
    }
}

impl FromStr for SerialNumber {
    type Err = SerialNumberParseError;
    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Hash for SerialNumber {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.hex.hash(state);
    }
}

impl PartialEq for SerialNumber {
    fn eq(&self, other: &Self) -> bool {
        self.hex == other.hex
    }
}

impl Serialize for SerialNumber {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SerialNumber {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        SerialNumber::parse(&s).map_err(serde::de::Error::custom)
    }
}
