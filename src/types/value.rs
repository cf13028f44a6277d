use std::{cmp::Ordering, fmt};

/// A single decoded column value.
///
/// Comparison and equality across the engine operate on the value's textual
/// form (see [`Value::text_eq`] and [`Value::compare_key`]), so that a WHERE
/// literal `'7'` matches a stored integer `7` the same way it prints.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Integer view of the value: stored integers, or text that parses as one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn coerce_to_number(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(r) => Some(*r),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Equality on the textual form.
    pub fn text_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            _ => self.to_string() == other.to_string(),
        }
    }

    /// Orders an index key against a search value: integer comparison when both sides
    /// are integers, numeric comparison when both are numbers, otherwise
    /// ordinal comparison of the textual forms.
    pub fn compare_key(&self, other: &Value) -> Ordering {
        if let (Some(a), Some(b)) = (self.as_integer(), other.as_integer()) {
            return a.cmp(&b);
        }
        if let (Some(a), Some(b)) = (self.coerce_to_number(), other.coerce_to_number()) {
            return a.total_cmp(&b);
        }
        self.to_string().as_bytes().cmp(other.to_string().as_bytes())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Text(s) => f.write_str(s),
            Value::Blob(b) => f.write_str(&String::from_utf8_lossy(b)),
        }
    }
}
