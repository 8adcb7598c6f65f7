//! Per-site options: each key maps to one or more string values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// One value or a list, as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    One(String),
    Many(Vec<String>),
}

impl OptionValue {
    fn into_values(self) -> Vec<String> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteOptions {
    values: BTreeMap<String, Vec<String>>,
}

impl SiteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value to `key`.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.entry(key.into()).or_default().push(value.into());
    }

    /// Replace all values of `key`.
    pub fn set(&mut self, key: impl Into<String>, values: Vec<String>) {
        self.values.insert(key.into(), values);
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.values.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// First value of `key`.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key)?.first().map(String::as_str)
    }

    pub fn value_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.value(key).unwrap_or(default)
    }

    /// All values of `key`, empty when unset.
    pub fn values(&self, key: &str) -> &[String] {
        self.values.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// `true`, `yes`, `on` and `1` are true; anything else is false.
    pub fn bool_value(&self, key: &str) -> Option<bool> {
        self.value(key).map(|v| {
            matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "true" | "yes" | "on" | "1"
            )
        })
    }

    /// First value parsed as `T`; `None` when unset or unparsable.
    pub fn parsed<T: FromStr>(&self, key: &str) -> Option<T> {
        self.value(key)?.trim().parse().ok()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, OptionValue)> for SiteOptions {
    fn from_iter<I: IntoIterator<Item = (String, OptionValue)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(key, value)| (key, value.into_values()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_accessors() {
        let mut options = SiteOptions::new();
        options.add("cache.enabled", "Yes");
        options.add("cache.size", " 64 ");
        options.add("mirrors", "a");
        options.add("mirrors", "b");

        assert_eq!(options.bool_value("cache.enabled"), Some(true));
        assert_eq!(options.parsed::<u32>("cache.size"), Some(64));
        assert_eq!(options.parsed::<u32>("mirrors"), None);
        assert_eq!(options.values("mirrors"), ["a", "b"]);
        assert_eq!(options.value("mirrors"), Some("a"));
        assert_eq!(options.value_or("missing", "x"), "x");
        assert!(options.values("missing").is_empty());
    }

    #[test]
    fn test_from_config_values() {
        let options: SiteOptions = [
            ("one".to_string(), OptionValue::One("1".into())),
            (
                "many".to_string(),
                OptionValue::Many(vec!["a".into(), "b".into()]),
            ),
        ]
        .into_iter()
        .collect();
        assert_eq!(options.len(), 2);
        assert_eq!(options.values("many").len(), 2);
        assert_eq!(options.keys().collect::<Vec<_>>(), vec!["many", "one"]);
    }
}
