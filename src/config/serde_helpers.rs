//! Lenient field decoding for documents produced by the editing UI.
//!
//! The UI has historically sent ports as strings, retry counts as numbers and
//! flags as either booleans or strings. Decoding never fails on those shapes;
//! anything unusable is kept as text and reads back as absent.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Treats an explicit `null` like a missing field.
pub fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseScalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl LooseScalar {
    fn into_text(self) -> String {
        match self {
            LooseScalar::Bool(b) => b.to_string(),
            LooseScalar::Int(i) => i.to_string(),
            LooseScalar::Float(f) => f.to_string(),
            LooseScalar::Text(s) => s,
        }
    }
}

/// Accepts strings and bare numbers, keeping numbers as their decimal text.
pub fn loose_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<LooseScalar>::deserialize(deserializer)?;
    Ok(value.map(LooseScalar::into_text).unwrap_or_default())
}

/// Accepts `true`/`false`, `0`/`1` and strings. Non-empty strings other than
/// `false`/`0`/`no`/`off` read as set.
pub fn loose_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<LooseScalar>::deserialize(deserializer)?;
    Ok(match value {
        None => false,
        Some(LooseScalar::Bool(b)) => b,
        Some(LooseScalar::Int(i)) => i != 0,
        Some(LooseScalar::Float(f)) => f != 0.0,
        Some(LooseScalar::Text(s)) => {
            let s = s.trim();
            !(s.is_empty()
                || s.eq_ignore_ascii_case("false")
                || s == "0"
                || s.eq_ignore_ascii_case("no")
                || s.eq_ignore_ascii_case("off"))
        }
    })
}

/// A numeric field as the user typed it.
///
/// The raw text is preserved so lint can report it and the store can write it
/// back untouched; the typed accessors return `None` for anything malformed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LooseNumber(String);

impl LooseNumber {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn raw(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Parses the trimmed text, `None` when blank or malformed.
    pub fn parse<T: FromStr>(&self) -> Option<T> {
        let trimmed = self.0.trim();
        if trimmed.is_empty() {
            return None;
        }
        trimmed.parse().ok()
    }

    /// A usable TCP/UDP port: 1..=65535.
    pub fn port(&self) -> Option<u16> {
        self.parse::<u16>().filter(|p| *p != 0)
    }

    /// A strictly positive count.
    pub fn positive(&self) -> Option<u32> {
        self.parse::<u32>().filter(|n| *n > 0)
    }

    /// True when something was supplied but does not parse as `T`.
    pub fn is_malformed<T: FromStr>(&self) -> bool {
        !self.is_blank() && self.parse::<T>().is_none()
    }
}

impl From<&str> for LooseNumber {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<u16> for LooseNumber {
    fn from(value: u16) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for LooseNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for LooseNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<LooseScalar>::deserialize(deserializer)?;
        Ok(Self(value.map(LooseScalar::into_text).unwrap_or_default()))
    }
}

impl Serialize for LooseNumber {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}
