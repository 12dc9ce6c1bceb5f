use std::fmt;
use std::sync::Arc;

/// A literal value as written in a command.
///
/// The kind comes from the token that produced it, but tables only ever
/// store text: every value is rendered with [Value::to_field] before it
/// reaches a row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The `NULL` keyword, stored as the text `NULL`.
    Null,
    /// An integer literal, kept exactly as written (sign and leading zeros
    /// included). It is only read as a number when compared.
    Int(Arc<str>),
    /// A decimal literal, kept exactly as written.
    Float(Arc<str>),
    /// A UTF-8 string value, wrapped in an [Arc] for cheap cloning.
    Text(Arc<str>),
    /// A boolean value.
    Bool(bool),
}

impl Value {
    pub fn int(n: i64) -> Self {
        Self::Int(n.to_string().into())
    }

    /// Builds a decimal literal; whole numbers keep their `.0`.
    pub fn float(v: f64) -> Self {
        Self::Float(format!("{v:?}").into())
    }

    /// Returns `true` if the value is [Value::Null].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the value as a number if it is numeric, or if it is text that
    /// parses as one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Int(s) | Self::Float(s) | Self::Text(s) => parse_number(s),
            Self::Null | Self::Bool(_) => None,
        }
    }

    /// Returns the inner string slice if this is a [Value::Text].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Renders the value the way it is stored in a row.
    pub fn to_field(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Int(s) | Self::Float(s) | Self::Text(s) => write!(f, "{s}"),
            Self::Bool(true) => write!(f, "TRUE"),
            Self::Bool(false) => write!(f, "FALSE"),
        }
    }
}

/// Parses a stored field as a number, the way numeric comparisons see it.
pub fn parse_number(field: &str) -> Option<f64> {
    let field = field.trim();
    if field.is_empty() {
        return None;
    }
    field.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_null() {
        assert!(Value::Null.is_null());
        assert!(!Value::int(1).is_null());
        assert!(!Value::Text("NULL".into()).is_null());
    }

    #[test]
    fn test_to_field() {
        assert_eq!(Value::Null.to_field(), "NULL");
        assert_eq!(Value::int(-42).to_field(), "-42");
        assert_eq!(Value::float(1.5).to_field(), "1.5");
        assert_eq!(Value::float(30.0).to_field(), "30.0");
        assert_eq!(Value::Text("Alice".into()).to_field(), "Alice");
        assert_eq!(Value::Bool(true).to_field(), "TRUE");
        assert_eq!(Value::Bool(false).to_field(), "FALSE");
    }

    #[test]
    fn test_numbers_render_as_written() {
        assert_eq!(Value::Int("007".into()).to_field(), "007");
        assert_eq!(Value::Float("1.50".into()).to_field(), "1.50");
        let long = "3.14159265358979323846";
        assert_eq!(Value::Float(long.into()).to_field(), long);
        assert_eq!(Value::Int("-0".into()).as_number(), Some(0.0));
    }

    #[test]
    fn test_as_number() {
        assert_eq!(Value::int(3).as_number(), Some(3.0));
        assert_eq!(Value::float(2.5).as_number(), Some(2.5));
        assert_eq!(Value::Text("31".into()).as_number(), Some(31.0));
        assert_eq!(Value::Text("Alice".into()).as_number(), None);
        assert_eq!(Value::Bool(true).as_number(), None);
        assert_eq!(Value::Null.as_number(), None);
    }

    #[test]
    fn test_parse_number_rejects_non_finite() {
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("-0.5"), Some(-0.5));
    }

    #[test]
    fn test_as_str() {
        let v = Value::Text("hello".into());
        assert_eq!(v.as_str(), Some("hello"));
        assert_eq!(Value::int(1).as_str(), None);
    }
}
