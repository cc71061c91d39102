//! Canonical keys for free-text labels and test names.

use std::collections::HashMap;

/// Trim, collapse inner whitespace and lower-case a label.
///
/// `"Physical"`, `"physical "` and `" PHYSICAL"` share one key.
pub fn canonical_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Upper-case a test name and drop dots and whitespace.
///
/// `"S. Bilirubin"` and `"s bilirubin"` both become `"SBILIRUBIN"`.
pub fn compact_test_name(name: &str) -> String {
    name.chars()
        .filter(|ch| *ch != '.' && !ch.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Maps canonical label keys to the first raw label seen for them.
#[derive(Debug, Clone, Default)]
pub struct FirstSeenLabels {
    map: HashMap<String, String>,
}

impl FirstSeenLabels {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for label in labels {
            set.insert(label.as_ref());
        }
        set
    }

    /// Record a label; returns its canonical key. Later variants of an
    /// already-seen key do not replace the first raw label.
    pub fn insert(&mut self, label: &str) -> String {
        let key = canonical_label(label);
        self.map
            .entry(key.clone())
            .or_insert_with(|| label.trim().to_string());
        key
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.map.get(&canonical_label(label)).map(String::as_str)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.map.contains_key(&canonical_label(label))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
