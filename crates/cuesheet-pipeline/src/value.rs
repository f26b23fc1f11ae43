use crate::precedence::LogoAnimOverview;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetaValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Flags(LogoAnimOverview),
}

impl MetaValue {
    pub fn text(value: impl Into<String>) -> Self {
        MetaValue::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetaValue::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Renders scalars the way they appear in file names and reports.
    pub fn display(&self) -> Option<String> {
        match self {
            MetaValue::Integer(value) => Some(value.to_string()),
            MetaValue::Float(value) => Some(value.to_string()),
            MetaValue::Text(value) => Some(value.clone()),
            MetaValue::Flags(_) => None,
        }
    }

    pub fn from_raw(raw: &str, cast: bool) -> Self {
        if cast {
            cast_value(raw)
        } else {
            MetaValue::text(raw)
        }
    }
}

fn integer_pattern() -> &'static Regex {
    static INTEGER_RE: OnceLock<Regex> = OnceLock::new();
    INTEGER_RE.get_or_init(|| Regex::new(r"^[-+]?[0-9]+$").expect("integer regex should compile"))
}

fn float_pattern() -> &'static Regex {
    static FLOAT_RE: OnceLock<Regex> = OnceLock::new();
    FLOAT_RE
        .get_or_init(|| Regex::new(r"^[-+]?[0-9]*\.[0-9]+$").expect("float regex should compile"))
}

/// Integer-looking strings become integers, decimal-looking ones floats.
pub fn cast_value(raw: &str) -> MetaValue {
    let trimmed = raw.trim();
    if integer_pattern().is_match(trimmed) {
        if let Ok(value) = trimmed.parse::<i64>() {
            return MetaValue::Integer(value);
        }
    } else if float_pattern().is_match(trimmed) {
        if let Ok(value) = trimmed.parse::<f64>() {
            return MetaValue::Float(value);
        }
    }
    MetaValue::text(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn casts_integers_and_floats() {
        assert_eq!(cast_value(" 42 "), MetaValue::Integer(42));
        assert_eq!(cast_value("-7"), MetaValue::Integer(-7));
        assert_eq!(cast_value("+3"), MetaValue::Integer(3));
        assert_eq!(cast_value("25.0"), MetaValue::Float(25.0));
        assert_eq!(cast_value(".5"), MetaValue::Float(0.5));
    }

    #[test]
    fn leaves_other_strings_alone() {
        assert_eq!(cast_value("5."), MetaValue::text("5."));
        assert_eq!(cast_value("1e3"), MetaValue::text("1e3"));
        assert_eq!(cast_value("v2"), MetaValue::text("v2"));
        assert_eq!(cast_value(""), MetaValue::text(""));
        assert_eq!(
            cast_value("99999999999999999999"),
            MetaValue::text("99999999999999999999")
        );
    }

    #[test]
    fn serializes_untagged() {
        let values = vec![
            MetaValue::Integer(1),
            MetaValue::Float(2.5),
            MetaValue::text("x"),
        ];
        assert_eq!(
            serde_json::to_value(&values).expect("json"),
            serde_json::json!([1, 2.5, "x"])
        );
    }
}
