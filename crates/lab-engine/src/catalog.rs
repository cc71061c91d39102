//! In-memory test catalog.
//!
//! Loaded once per session from the definitions service export. Unit ids
//! are resolved to display names at load time so that report rows only
//! ever carry a printable unit.

use std::collections::HashMap;
use std::io::Read;

use lab_model::{
    LabError, NormalValueBand, Result, TestDefinition, TestRef, Unit, compact_test_name,
};
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogDocument {
    Tests(Vec<TestDefinition>),
    Bundle {
        tests: Vec<TestDefinition>,
        #[serde(default)]
        units: Vec<UnitEntry>,
    },
}

#[derive(Debug, Deserialize)]
struct UnitEntry {
    #[serde(rename = "_id", alias = "id")]
    id: String,
    name: String,
}

/// Test definitions indexed by id.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tests: Vec<TestDefinition>,
    by_id: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog from definitions whose units are already named.
    pub fn new(tests: Vec<TestDefinition>) -> Self {
        Self::with_units(tests, &HashMap::new())
    }

    /// Build a catalog, resolving unit ids through `units` (id -> name).
    pub fn with_units(mut tests: Vec<TestDefinition>, units: &HashMap<String, String>) -> Self {
        let mut unresolved = 0usize;
        for test in &mut tests {
            unresolved += normalize_test(test, units);
        }
        if unresolved > 0 {
            warn!(unresolved, "unit ids without a unit table entry");
        }
        let by_id = tests
            .iter()
            .enumerate()
            .filter_map(|(idx, test)| test.id.clone().map(|id| (id, idx)))
            .collect();
        debug!(tests = tests.len(), "catalog loaded");
        Self { tests, by_id }
    }

    /// Parse a catalog export: either a bare array of tests or
    /// `{ "tests": [...], "units": [{"_id", "name"}] }`.
    ///
    /// # Errors
    ///
    /// Returns [`LabError::Json`] when the document does not match either shape.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_document(serde_json::from_str(json)?)
    }

    /// Same as [`Catalog::from_json_str`] for any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::from_document(serde_json::from_reader(reader)?)
    }

    fn from_document(document: CatalogDocument) -> Result<Self> {
        Ok(match document {
            CatalogDocument::Tests(tests) => Self::new(tests),
            CatalogDocument::Bundle { tests, units } => {
                let units = units
                    .into_iter()
                    .map(|entry| (entry.id, entry.name))
                    .collect();
                Self::with_units(tests, &units)
            }
        })
    }

    pub fn tests(&self) -> &[TestDefinition] {
        &self.tests
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&TestDefinition> {
        self.by_id.get(id).map(|&idx| &self.tests[idx])
    }

    /// Test whose name equals `name` after trimming.
    pub fn find_exact(&self, name: &str) -> Option<&TestDefinition> {
        let name = name.trim();
        self.tests.iter().find(|test| test.name.trim() == name)
    }

    /// Locate a test from a free-text name (e.g. a receipt line).
    ///
    /// Names are compared upper-cased with dots and whitespace removed:
    /// equality first, then containment in either direction. Catalog order
    /// breaks ties.
    pub fn find_by_name(&self, name: &str) -> Option<&TestDefinition> {
        let wanted = compact_test_name(name);
        if wanted.is_empty() {
            return None;
        }
        let keys: Vec<String> = self
            .tests
            .iter()
            .map(|test| compact_test_name(&test.name))
            .collect();
        let idx = keys.iter().position(|key| *key == wanted).or_else(|| {
            keys.iter().position(|key| {
                !key.is_empty() && (key.contains(&wanted) || wanted.contains(key.as_str()))
            })
        })?;
        Some(&self.tests[idx])
    }

    /// Like [`Catalog::find_by_name`] but reports a miss as an error.
    pub fn require(&self, name: &str) -> Result<&TestDefinition> {
        self.find_by_name(name)
            .ok_or_else(|| LabError::UnknownTest(name.trim().to_string()))
    }

    /// Resolve a panel entry by id, then by exact name.
    pub fn resolve_ref<'a>(&'a self, reference: &'a TestRef) -> Option<&'a TestDefinition> {
        match reference {
            TestRef::Inline(test) => Some(test.as_ref()),
            TestRef::Id(key) => self.get(key).or_else(|| self.find_exact(key)),
        }
    }
}

/// Resolve units and repair inverted bands in place; returns the number of
/// unit ids left unresolved.
fn normalize_test(test: &mut TestDefinition, units: &HashMap<String, String>) -> usize {
    let mut unresolved = resolve_unit(&mut test.unit, units);
    normalize_bands(&test.name, &mut test.normal_values);
    for parameter in &mut test.parameters {
        unresolved += resolve_unit(&mut parameter.unit, units);
        normalize_bands(&parameter.name, &mut parameter.normal_values);
    }
    for reference in &mut test.tests {
        if let TestRef::Inline(included) = reference {
            unresolved += normalize_test(included, units);
        }
    }
    unresolved
}

fn resolve_unit(unit: &mut Unit, units: &HashMap<String, String>) -> usize {
    let Unit::Unresolved(id) = unit else {
        return 0;
    };
    match units.get(id.as_str()) {
        Some(name) => {
            *unit = Unit::Named(name.clone());
            0
        }
        None => 1,
    }
}

fn normalize_bands(owner: &str, bands: &mut [NormalValueBand]) {
    for band in bands.iter_mut().filter(|band| !band.is_consistent()) {
        warn!(
            parameter = owner,
            "reference band has lower value above upper value; swapping bounds"
        );
        std::mem::swap(&mut band.lower_value, &mut band.upper_value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lab_model::TestType;

    fn catalog() -> Catalog {
        Catalog::new(vec![
            TestDefinition::new("S. Bilirubin (Total)", TestType::Single).with_id("t1"),
            TestDefinition::new("Haemoglobin", TestType::Single).with_id("t2"),
            TestDefinition::new("Liver Function Test", TestType::Panel).with_id("t3"),
        ])
    }

    #[test]
    fn find_by_name_ignores_dots_case_and_spacing() {
        let catalog = catalog();
        assert_eq!(
            catalog.find_by_name("s bilirubin (total)").map(|t| t.name.as_str()),
            Some("S. Bilirubin (Total)")
        );
        assert_eq!(
            catalog.find_by_name("HAEMOGLOBIN").and_then(|t| t.id.as_deref()),
            Some("t2")
        );
    }

    #[test]
    fn find_by_name_falls_back_to_containment() {
        let catalog = catalog();
        assert_eq!(
            catalog.find_by_name("Liver Function").and_then(|t| t.id.as_deref()),
            Some("t3")
        );
        assert_eq!(
            catalog.find_by_name("Haemoglobin (Hb)").and_then(|t| t.id.as_deref()),
            Some("t2")
        );
        assert!(catalog.find_by_name("  ").is_none());
        assert!(catalog.require("Lipid Profile").is_err());
    }

    #[test]
    fn resolve_ref_by_id_then_name() {
        let catalog = catalog();
        assert_eq!(
            catalog
                .resolve_ref(&TestRef::Id("t2".to_string()))
                .map(|t| t.name.as_str()),
            Some("Haemoglobin")
        );
        assert_eq!(
            catalog
                .resolve_ref(&TestRef::Id("Haemoglobin".to_string()))
                .and_then(|t| t.id.as_deref()),
            Some("t2")
        );
        assert!(catalog.resolve_ref(&TestRef::Id("missing".to_string())).is_none());
    }

    #[test]
    fn inverted_bands_are_swapped() {
        let test = TestDefinition::new("Glucose", TestType::Single)
            .with_band(NormalValueBand::numeric(110.0, 70.0));
        let catalog = Catalog::new(vec![test]);
        let band = &catalog.tests()[0].normal_values[0];
        assert_eq!((band.lower_value, band.upper_value), (Some(70.0), Some(110.0)));
    }
}
