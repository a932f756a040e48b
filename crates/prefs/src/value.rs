// Typed preference values
//
// Every setting holds exactly one kind of value for its whole lifetime.
// The backing store keeps values as strings, so each kind knows how to
// render itself and how to parse itself back.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of value a setting holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefType {
    Bool,
    Int,
    Long,
    Double,
    #[serde(alias = "str")]
    String,
}

impl PrefType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrefType::Bool => "bool",
            PrefType::Int => "int",
            PrefType::Long => "long",
            PrefType::Double => "double",
            PrefType::String => "string",
        }
    }
}

impl fmt::Display for PrefType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A setting value.
///
/// Equality is bit-exact for doubles: `NaN` equals itself and `0.0` is not
/// equal to `-0.0`. The "write is a no-op when unchanged" rule depends on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum PrefValue {
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    #[serde(rename = "string")]
    Str(String),
}

impl PrefValue {
    pub fn pref_type(&self) -> PrefType {
        match self {
            PrefValue::Bool(_) => PrefType::Bool,
            PrefValue::Int(_) => PrefType::Int,
            PrefValue::Long(_) => PrefType::Long,
            PrefValue::Double(_) => PrefType::Double,
            PrefValue::Str(_) => PrefType::String,
        }
    }

    pub fn same_type(&self, other: &PrefValue) -> bool {
        self.pref_type() == other.pref_type()
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PrefValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            PrefValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            PrefValue::Long(l) => Some(*l),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            PrefValue::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PrefValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// String form written to the backing store.
    pub fn to_stored(&self) -> String {
        match self {
            PrefValue::Bool(b) => b.to_string(),
            PrefValue::Int(i) => i.to_string(),
            PrefValue::Long(l) => l.to_string(),
            PrefValue::Double(d) => d.to_string(),
            PrefValue::Str(s) => s.clone(),
        }
    }

    /// Parse a stored string as a value of kind `ty`.
    ///
    /// Booleans accept `true`/`false` in any case, matching what the
    /// platform preference stores historically wrote.
    pub fn parse_as(ty: PrefType, raw: &str) -> Option<PrefValue> {
        match ty {
            PrefType::Bool => {
                if raw.eq_ignore_ascii_case("true") {
                    Some(PrefValue::Bool(true))
                } else if raw.eq_ignore_ascii_case("false") {
                    Some(PrefValue::Bool(false))
                } else {
                    None
                }
            }
            PrefType::Int => raw.trim().parse().ok().map(PrefValue::Int),
            PrefType::Long => raw.trim().parse().ok().map(PrefValue::Long),
            PrefType::Double => raw.trim().parse().ok().map(PrefValue::Double),
            PrefType::String => Some(PrefValue::Str(raw.to_string())),
        }
    }
}

impl PartialEq for PrefValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PrefValue::Bool(a), PrefValue::Bool(b)) => a == b,
            (PrefValue::Int(a), PrefValue::Int(b)) => a == b,
            (PrefValue::Long(a), PrefValue::Long(b)) => a == b,
            (PrefValue::Double(a), PrefValue::Double(b)) => a.to_bits() == b.to_bits(),
            (PrefValue::Str(a), PrefValue::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for PrefValue {}

impl fmt::Display for PrefValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrefValue::Str(s) => write!(f, "\"{}\"", s),
            other => f.write_str(&other.to_stored()),
        }
    }
}

impl From<bool> for PrefValue {
    fn from(v: bool) -> Self {
        PrefValue::Bool(v)
    }
}

impl From<i32> for PrefValue {
    fn from(v: i32) -> Self {
        PrefValue::Int(v)
    }
}

impl From<i64> for PrefValue {
    fn from(v: i64) -> Self {
        PrefValue::Long(v)
    }
}

impl From<f64> for PrefValue {
    fn from(v: f64) -> Self {
        PrefValue::Double(v)
    }
}

impl From<String> for PrefValue {
    fn from(v: String) -> Self {
        PrefValue::Str(v)
    }
}

impl From<&str> for PrefValue {
    fn from(v: &str) -> Self {
        PrefValue::Str(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_equality_is_bitwise() {
        assert_eq!(PrefValue::Double(f64::NAN), PrefValue::Double(f64::NAN));
        assert_ne!(PrefValue::Double(0.0), PrefValue::Double(-0.0));
        assert_eq!(PrefValue::Double(2.5), PrefValue::Double(2.5));
    }

    #[test]
    fn test_different_kinds_never_equal() {
        assert_ne!(PrefValue::Int(1), PrefValue::Long(1));
        assert_ne!(PrefValue::Str("true".into()), PrefValue::Bool(true));
    }

    #[test]
    fn test_stored_form_parses_back() {
        let values = [
            PrefValue::Bool(true),
            PrefValue::Int(-42),
            PrefValue::Long(i64::MAX),
            PrefValue::Double(0.1 + 0.2),
            PrefValue::Double(-0.0),
            PrefValue::Str("metal-1".into()),
        ];
        for v in values {
            let parsed = PrefValue::parse_as(v.pref_type(), &v.to_stored());
            assert_eq!(parsed, Some(v));
        }
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(PrefValue::parse_as(PrefType::Int, "12.5"), None);
        assert_eq!(PrefValue::parse_as(PrefType::Bool, "yes"), None);
        assert_eq!(PrefValue::parse_as(PrefType::Double, ""), None);
        assert_eq!(PrefValue::parse_as(PrefType::Bool, "TRUE"), Some(PrefValue::Bool(true)));
    }

    #[test]
    fn test_display_quotes_strings() {
        assert_eq!(PrefValue::Str("a".into()).to_string(), "\"a\"");
        assert_eq!(PrefValue::Double(1.0).to_string(), "1");
    }
}
