use std::collections::BTreeMap;
use std::fmt;
use std::mem::discriminant;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Typed value of a named engine variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    Bool(bool),
    Int(i32),
    Double(f64),
    String(String),
}

impl VariableValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            VariableValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            VariableValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            VariableValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            VariableValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn same_type(&self, other: &VariableValue) -> bool {
        discriminant(self) == discriminant(other)
    }

    /// Value as the engine's command line expects it (`-c name=value`).
    pub fn to_engine_arg(&self) -> String {
        match self {
            VariableValue::Bool(true) => "1".to_string(),
            VariableValue::Bool(false) => "0".to_string(),
            other => other.to_string(),
        }
    }

    /// Parses `raw` as the type of `template`, or infers a type when there
    /// is no template: bool, then integer, then double, then string.
    pub fn parse(raw: &str, template: Option<&VariableValue>) -> Option<VariableValue> {
        match template {
            Some(VariableValue::Bool(_)) => parse_bool(raw).map(VariableValue::Bool),
            Some(VariableValue::Int(_)) => raw.parse().ok().map(VariableValue::Int),
            Some(VariableValue::Double(_)) => raw.parse().ok().map(VariableValue::Double),
            Some(VariableValue::String(_)) => Some(VariableValue::String(raw.to_string())),
            None => Some(
                parse_bool(raw)
                    .map(VariableValue::Bool)
                    .or_else(|| raw.parse().ok().map(VariableValue::Int))
                    .or_else(|| raw.parse().ok().map(VariableValue::Double))
                    .unwrap_or_else(|| VariableValue::String(raw.to_string())),
            ),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "true" | "True" | "T" | "t" => Some(true),
        "false" | "False" | "F" | "f" => Some(false),
        _ => None,
    }
}

impl fmt::Display for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableValue::Bool(v) => write!(f, "{v}"),
            VariableValue::Int(v) => write!(f, "{v}"),
            VariableValue::Double(v) => write!(f, "{v}"),
            VariableValue::String(v) => f.write_str(v),
        }
    }
}

impl From<bool> for VariableValue {
    fn from(value: bool) -> Self {
        VariableValue::Bool(value)
    }
}

impl From<i32> for VariableValue {
    fn from(value: i32) -> Self {
        VariableValue::Int(value)
    }
}

impl From<f64> for VariableValue {
    fn from(value: f64) -> Self {
        VariableValue::Double(value)
    }
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        VariableValue::String(value.to_string())
    }
}

impl From<String> for VariableValue {
    fn from(value: String) -> Self {
        VariableValue::String(value)
    }
}

/// Named-variable store owned by a recognition backend.
pub trait VariableStore {
    /// `None` means the variable does not exist.
    fn get(&self, name: &str) -> Option<VariableValue>;

    /// Returns `false` when the store rejects the value.
    fn set(&mut self, name: &str, value: VariableValue) -> bool;

    /// Every variable, sorted by name.
    fn entries(&self) -> Vec<(String, VariableValue)>;
}

/// In-process store. A variable keeps the type of its first value; later
/// values of another type are rejected.
#[derive(Debug, Clone, Default)]
pub struct MemoryVariables {
    values: BTreeMap<String, VariableValue>,
}

impl MemoryVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults<I, K>(defaults: I) -> Self
    where
        I: IntoIterator<Item = (K, VariableValue)>,
        K: Into<String>,
    {
        Self {
            values: defaults.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl VariableStore for MemoryVariables {
    fn get(&self, name: &str) -> Option<VariableValue> {
        self.values.get(name).cloned()
    }

    fn set(&mut self, name: &str, value: VariableValue) -> bool {
        if let Some(existing) = self.values.get(name) {
            if !existing.same_type(&value) {
                warn!(name, ?value, ?existing, "rejecting variable of a different type");
                return false;
            }
        }
        debug!(name, %value, "set variable");
        self.values.insert(name.to_string(), value);
        true
    }

    fn entries(&self) -> Vec<(String, VariableValue)> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Parses Tesseract-style config text: one `name value` pair per line,
/// `#` starts a comment line, the value is the rest of the line.
pub fn parse_config_text(text: &str) -> Vec<(String, String)> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| match line.split_once(char::is_whitespace) {
            Some((name, value)) => (name.to_string(), value.trim().to_string()),
            None => (line.to_string(), String::new()),
        })
        .collect()
}

/// Applies config text to `store`, typing each value after the variable it
/// replaces. Returns how many variables were set.
pub fn apply_config_text<S: VariableStore + ?Sized>(store: &mut S, text: &str) -> usize {
    let mut applied = 0;
    for (name, raw) in parse_config_text(text) {
        let existing = store.get(&name);
        let accepted = match VariableValue::parse(&raw, existing.as_ref()) {
            Some(value) => store.set(&name, value),
            None => false,
        };
        if accepted {
            applied += 1;
        } else {
            warn!(name = %name, raw = %raw, "ignoring config entry");
        }
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn keeps_types_stable() {
        let mut vars = MemoryVariables::new();
        assert!(vars.set("edges_boxarea", 0.875.into()));
        assert!(!vars.set("edges_boxarea", 3.into()));
        assert!(vars.set("edges_boxarea", (-0.9).into()));
        assert_eq!(vars.get("edges_boxarea"), Some(VariableValue::Double(-0.9)));
        assert_eq!(vars.get("missing"), None);
    }

    #[test]
    fn stores_unicode_strings() {
        let mut vars = MemoryVariables::new();
        assert!(vars.set("tessedit_char_whitelist", "chinese 漢字".into()));
        assert!(vars.set("tessedit_char_whitelist", "".into()));
        assert_eq!(
            vars.get("tessedit_char_whitelist").and_then(|v| v.as_str().map(str::to_owned)),
            Some(String::new())
        );
    }

    #[test]
    fn parses_config_lines() {
        let parsed = parse_config_text("# comment\nuser_words_suffix user-words\n\nload_system_dawg F\nempty_value\n");
        assert_eq!(
            parsed,
            vec![
                ("user_words_suffix".to_string(), "user-words".to_string()),
                ("load_system_dawg".to_string(), "F".to_string()),
                ("empty_value".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn config_values_follow_existing_types() {
        let mut vars = MemoryVariables::with_defaults([("classify_bln_numeric_mode", VariableValue::Int(0))]);
        let applied = apply_config_text(&mut vars, "classify_bln_numeric_mode 1\nload_system_dawg false\nratio 0.5\n");
        assert_eq!(applied, 3);
        assert_eq!(vars.get("classify_bln_numeric_mode"), Some(VariableValue::Int(1)));
        assert_eq!(vars.get("load_system_dawg"), Some(VariableValue::Bool(false)));
        assert_eq!(vars.get("ratio"), Some(VariableValue::Double(0.5)));
    }

    #[test]
    fn rejects_unparseable_typed_values() {
        let mut vars = MemoryVariables::with_defaults([("edges_children_count_limit", VariableValue::Int(45))]);
        assert_eq!(apply_config_text(&mut vars, "edges_children_count_limit many"), 0);
        assert_eq!(vars.get("edges_children_count_limit"), Some(VariableValue::Int(45)));
    }

    #[test]
    fn engine_args_use_numeric_booleans() {
        assert_eq!(VariableValue::Bool(true).to_engine_arg(), "1");
        assert_eq!(VariableValue::Double(0.9).to_engine_arg(), "0.9");
    }
}
