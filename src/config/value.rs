//! Untyped option values and their command-line encoding.
use std::fmt;

/// A numeric option value, keeping integers and floats apart so each renders
/// the way it was written.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// Whole number, rendered as-is.
    Integer(i64),
    /// Floating-point number, rendered in fixed-point notation.
    Float(f64),
}

impl Number {
    /// Whether the value is zero (and therefore omitted from the command line).
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_zero(self) -> bool {
        match self {
            Self::Integer(n) => n == 0,
            Self::Float(f) => f == 0.0,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x:.6}"),
        }
    }
}

/// A configuration value that has no dedicated field in the profile model.
///
/// Only scalars and flat lists are representable: nested tables are command
/// sections, not options.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    /// `true` emits a presence flag, `false` omits the flag.
    Bool(bool),
    /// Emitted as a single value unless empty.
    Text(String),
    /// Emitted as a single value unless zero.
    Number(Number),
    /// Emitted once per element unless empty.
    List(Vec<String>),
}

impl OptionValue {
    /// Convert a document value. Returns `None` for tables, which cannot be
    /// flags.
    #[must_use]
    pub fn from_toml(value: &toml::Value) -> Option<Self> {
        match value {
            toml::Value::Boolean(b) => Some(Self::Bool(*b)),
            toml::Value::String(s) => Some(Self::Text(s.clone())),
            toml::Value::Integer(n) => Some(Self::Number(Number::Integer(*n))),
            toml::Value::Float(f) => Some(Self::Number(Number::Float(*f))),
            toml::Value::Datetime(d) => Some(Self::Text(d.to_string())),
            toml::Value::Array(items) => Some(Self::List(
                items.iter().filter_map(scalar_to_string).collect(),
            )),
            toml::Value::Table(_) => None,
        }
    }

    /// Encode into flag values.
    ///
    /// `None` means the flag is omitted entirely; `Some(vec![])` means the
    /// flag is present without a value.
    #[must_use]
    pub fn flag_values(&self) -> Option<Vec<String>> {
        match self {
            Self::Bool(true) => Some(Vec::new()),
            Self::Bool(false) => None,
            Self::Text(s) if s.is_empty() => None,
            Self::Text(s) => Some(vec![s.clone()]),
            Self::Number(n) if n.is_zero() => None,
            Self::Number(n) => Some(vec![n.to_string()]),
            Self::List(items) if items.is_empty() => None,
            Self::List(items) => Some(items.clone()),
        }
    }

    /// Render as a single string, used for environment variable values.
    #[must_use]
    pub fn to_plain_string(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Text(s) => s.clone(),
            Self::Number(Number::Integer(n)) => n.to_string(),
            Self::Number(Number::Float(f)) => f.to_string(),
            Self::List(items) => items.join(","),
        }
    }
}

/// Render a scalar document value; nested arrays and tables have no string form.
pub(crate) fn scalar_to_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(n) => Some(n.to_string()),
        toml::Value::Float(f) => Some(Number::Float(*f).to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        toml::Value::Datetime(d) => Some(d.to_string()),
        toml::Value::Array(_) | toml::Value::Table(_) => None,
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn bool_true_is_presence_flag() {
        assert_eq!(OptionValue::Bool(true).flag_values(), Some(vec![]));
    }

    #[test]
    fn bool_false_is_omitted() {
        assert_eq!(OptionValue::Bool(false).flag_values(), None);
    }

    #[test]
    fn empty_text_is_omitted() {
        assert_eq!(OptionValue::Text(String::new()).flag_values(), None);
        assert_eq!(
            OptionValue::Text("x".into()).flag_values(),
            Some(vec!["x".to_string()])
        );
    }

    #[test]
    fn zero_numbers_are_omitted() {
        assert_eq!(OptionValue::Number(Number::Integer(0)).flag_values(), None);
        assert_eq!(OptionValue::Number(Number::Float(0.0)).flag_values(), None);
    }

    #[test]
    fn floats_render_fixed_point() {
        assert_eq!(
            OptionValue::Number(Number::Float(4.2)).flag_values(),
            Some(vec!["4.200000".to_string()])
        );
        assert_eq!(
            OptionValue::Number(Number::Integer(42)).flag_values(),
            Some(vec!["42".to_string()])
        );
    }

    #[test]
    fn lists_keep_order_and_drop_when_empty() {
        assert_eq!(OptionValue::List(vec![]).flag_values(), None);
        assert_eq!(
            OptionValue::List(vec!["one".into(), "two".into()]).flag_values(),
            Some(vec!["one".to_string(), "two".to_string()])
        );
    }

    #[test]
    fn from_toml_stringifies_list_items() {
        let value: toml::Value = toml::Value::Array(vec![
            toml::Value::Integer(1),
            toml::Value::String("two".into()),
        ]);
        assert_eq!(
            OptionValue::from_toml(&value),
            Some(OptionValue::List(vec!["1".into(), "two".into()]))
        );
    }

    #[test]
    fn from_toml_rejects_tables() {
        let value = toml::Value::Table(toml::Table::new());
        assert_eq!(OptionValue::from_toml(&value), None);
    }
}
