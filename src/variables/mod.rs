// ABOUTME: Case-insensitive, insertion-ordered string variable store.
// ABOUTME: Loaded from JSON and mutated by behaviours during a deployment.

pub mod known;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum VariablesError {
    #[error("failed to read variables file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("variables must be a JSON object of names to values: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("variable '{name}' has a nested value; only strings, numbers and booleans are allowed")]
    NestedValue { name: String },
}

/// Variables for one deployment. Later writes win; lookups ignore case.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.index
            .get(&name.to_lowercase())
            .map(|&i| self.entries[i].1.as_str())
    }

    pub fn get_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.get(name).unwrap_or(default)
    }

    /// A non-empty value, if any.
    pub fn get_non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.trim().is_empty())
    }

    /// Interpret the value as a boolean; anything but `true`/`false` yields `default`.
    pub fn get_flag(&self, name: &str, default: bool) -> bool {
        match self.get(name).map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "true" => true,
            Some(v) if v == "false" => false,
            _ => default,
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        let key = name.to_lowercase();
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push((name, value));
            }
        }
    }

    /// Distinct indexes of `collection[index].Property` style names, in first-seen order.
    pub fn get_indexes(&self, collection: &str) -> Vec<String> {
        let prefix = format!("{collection}[");
        let mut indexes: Vec<String> = Vec::new();
        for (name, _) in &self.entries {
            let matches = name
                .get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(&prefix));
            if !matches {
                continue;
            }
            let rest = &name[prefix.len()..];
            if let Some(end) = rest.find(']') {
                let index = &rest[..end];
                if !indexes.iter().any(|i| i == index) {
                    indexes.push(index.to_string());
                }
            }
        }
        indexes
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a flat JSON object. Numbers and booleans are stored as their text.
    pub fn from_json(json: &str) -> Result<Self, VariablesError> {
        let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;
        let mut variables = Self::new();
        for (name, value) in object {
            let text = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Null => String::new(),
                serde_json::Value::Bool(b) => b.to_string(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                    return Err(VariablesError::NestedValue { name });
                }
            };
            variables.set(name, text);
        }
        Ok(variables)
    }

    pub fn load_json_file(path: &Path) -> Result<Self, VariablesError> {
        let json = std::fs::read_to_string(path).map_err(|source| VariablesError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Variables {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut variables = Self::new();
        for (k, v) in iter {
            variables.set(k, v);
        }
        variables
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_ignore_case() {
        let mut vars = Variables::new();
        vars.set("Deckhand.Action.Name", "web");
        assert_eq!(vars.get("deckhand.action.name"), Some("web"));
        assert_eq!(vars.get("DECKHAND.ACTION.NAME"), Some("web"));
    }

    #[test]
    fn last_write_wins_and_keeps_position() {
        let mut vars = Variables::new();
        vars.set("A", "1");
        vars.set("B", "2");
        vars.set("a", "3");
        let all: Vec<_> = vars.iter().collect();
        assert_eq!(all, vec![("A", "3"), ("B", "2")]);
    }

    #[test]
    fn flags_fall_back_to_default() {
        let vars: Variables = [("On", "True"), ("Off", "false"), ("Junk", "yes")]
            .into_iter()
            .collect();
        assert!(vars.get_flag("on", false));
        assert!(!vars.get_flag("off", true));
        assert!(vars.get_flag("junk", true));
        assert!(!vars.get_flag("missing", false));
    }

    #[test]
    fn indexes_are_distinct_and_ordered() {
        let vars: Variables = [
            ("Deckhand.Action.Package[web].PackageId", "Acme.Web"),
            ("Deckhand.Action.Package[web].Version", "1.0.0"),
            ("deckhand.action.package[api].PackageId", "Acme.Api"),
            ("Deckhand.Action.PackageOther", "x"),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            vars.get_indexes("Deckhand.Action.Package"),
            vec!["web".to_string(), "api".to_string()]
        );
    }

    #[test]
    fn json_scalars_become_strings() {
        let vars =
            Variables::from_json(r#"{"Name": "web", "Count": 3, "Enabled": true, "Empty": null}"#)
                .unwrap();
        assert_eq!(vars.get("Count"), Some("3"));
        assert_eq!(vars.get("Enabled"), Some("true"));
        assert_eq!(vars.get("Empty"), Some(""));
    }

    #[test]
    fn nested_json_is_rejected() {
        let err = Variables::from_json(r#"{"Name": {"inner": 1}}"#).unwrap_err();
        assert!(matches!(err, VariablesError::NestedValue { name } if name == "Name"));
    }
}
