//! Report assembly and the per-report editing session.
//!
//! [`assemble_test`] runs the whole pipeline for one test definition:
//! panel expansion, regrouping, range resolution, status classification and
//! a formula pass. [`ReportSession`] keeps the assembled tests of one report
//! and is the only write path for result edits afterwards.

use lab_model::{
    EngineOptions, Gender, LabError, PatientContext, ResolvedParameter, Result, ResultStatus,
    TestDefinition, TestReport, canonical_label, compact_test_name,
};
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::formula::{FormulaOutcome, ReentrancyGuard, apply_formulas, invalidate_dependents};
use crate::grouping::regroup;
use crate::normalization::patient_days;
use crate::panel::expand_test;
use crate::range::apply_range;
use crate::status::classify;

/// Build the rows of one test for a patient.
pub fn assemble_test(
    test: &TestDefinition,
    catalog: &Catalog,
    patient: &PatientContext,
    options: &EngineOptions,
) -> TestReport {
    let mut parameters = regroup(&expand_test(test, catalog));
    refresh_ranges(&mut parameters, patient_days(patient), patient.gender, options);
    let guard = ReentrancyGuard::new();
    apply_formulas(&mut parameters, &guard, options);
    debug!(test = %test.name, rows = parameters.len(), "test assembled");
    TestReport {
        test_name: test.name.trim().to_string(),
        category: test.category.clone(),
        test_type: test.test_type,
        parameters,
    }
}

fn refresh_ranges(
    rows: &mut [ResolvedParameter],
    days: i64,
    gender: Gender,
    options: &EngineOptions,
) {
    for row in rows {
        apply_range(row, days, gender, options);
        row.status = classify(row, options);
    }
}

/// Address of one row inside a [`ReportSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParameterRef {
    pub test: usize,
    pub index: usize,
}

/// Working state of one report being edited.
///
/// Owns its rows exclusively; two sessions never share rows or the formula
/// guard.
#[derive(Debug)]
pub struct ReportSession {
    patient: PatientContext,
    options: EngineOptions,
    tests: Vec<TestReport>,
    formula_guard: ReentrancyGuard,
}

impl ReportSession {
    /// Start an empty report.
    ///
    /// # Errors
    ///
    /// Returns [`LabError::InvalidPatient`] when the patient age is invalid.
    pub fn new(patient: PatientContext, options: EngineOptions) -> Result<Self> {
        patient.validate()?;
        Ok(Self {
            patient,
            options,
            tests: Vec::new(),
            formula_guard: ReentrancyGuard::new(),
        })
    }

    /// Link receipt item names to catalog tests and assemble each match.
    /// Unmatched names are logged and skipped.
    pub fn from_receipt<I, S>(
        catalog: &Catalog,
        patient: PatientContext,
        options: EngineOptions,
        items: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut session = Self::new(patient, options)?;
        let mut skipped = 0usize;
        for item in items {
            let item = item.as_ref();
            match catalog.find_by_name(item) {
                Some(test) => {
                    session.add_test(test, catalog);
                }
                None => {
                    warn!(item, "receipt item has no catalog test");
                    skipped += 1;
                }
            }
        }
        info!(tests = session.tests.len(), skipped, "report linked from receipt");
        Ok(session)
    }

    /// Assemble `test` and append it; returns its index.
    pub fn add_test(&mut self, test: &TestDefinition, catalog: &Catalog) -> usize {
        self.tests
            .push(assemble_test(test, catalog, &self.patient, &self.options));
        self.tests.len() - 1
    }

    pub fn patient(&self) -> &PatientContext {
        &self.patient
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn tests(&self) -> &[TestReport] {
        &self.tests
    }

    /// Test by name, compared loosely like receipt lines.
    pub fn test(&self, name: &str) -> Option<&TestReport> {
        self.test_index(name).map(|idx| &self.tests[idx])
    }

    fn test_index(&self, name: &str) -> Option<usize> {
        let key = canonical_label(name);
        self.tests
            .iter()
            .position(|test| canonical_label(&test.test_name) == key)
            .or_else(|| {
                let compact = compact_test_name(name);
                self.tests
                    .iter()
                    .position(|test| compact_test_name(&test.test_name) == compact)
            })
    }

    /// Every row of the report with its test, in display order.
    pub fn rows(&self) -> impl Iterator<Item = (&TestReport, &ResolvedParameter)> {
        self.tests
            .iter()
            .flat_map(|test| test.parameters.iter().map(move |row| (test, row)))
    }

    pub fn row(&self, at: ParameterRef) -> Option<&ResolvedParameter> {
        self.tests.get(at.test)?.parameters.get(at.index)
    }

    /// Locate a parameter by test and parameter name.
    ///
    /// # Errors
    ///
    /// [`LabError::UnknownTest`] or [`LabError::UnknownParameter`].
    pub fn find_parameter(&self, test: &str, parameter: &str) -> Result<ParameterRef> {
        self.find_parameter_in(test, None, parameter)
    }

    /// Like [`ReportSession::find_parameter`], restricted to one included
    /// test of a panel when `outer_group` is given. Needed when included
    /// tests share a parameter name.
    ///
    /// # Errors
    ///
    /// [`LabError::UnknownTest`] or [`LabError::UnknownParameter`].
    pub fn find_parameter_in(
        &self,
        test: &str,
        outer_group: Option<&str>,
        parameter: &str,
    ) -> Result<ParameterRef> {
        let test_idx = self
            .test_index(test)
            .ok_or_else(|| LabError::UnknownTest(test.trim().to_string()))?;
        let index = self.tests[test_idx]
            .position_in(outer_group, parameter)
            .ok_or_else(|| LabError::UnknownParameter {
                test: self.tests[test_idx].test_name.clone(),
                parameter: match outer_group {
                    Some(outer) => format!("{} / {}", outer.trim(), parameter.trim()),
                    None => parameter.trim().to_string(),
                },
            })?;
        Ok(ParameterRef {
            test: test_idx,
            index,
        })
    }

    fn editable_row(&mut self, at: ParameterRef) -> Result<&mut ResolvedParameter> {
        let test = self
            .tests
            .get_mut(at.test)
            .ok_or_else(|| LabError::Message(format!("no test at index {}", at.test)))?;
        let test_name = test.test_name.clone();
        let row = test
            .parameters
            .get_mut(at.index)
            .ok_or_else(|| LabError::UnknownParameter {
                test: test_name,
                parameter: format!("#{}", at.index),
            })?;
        if row.is_formula() {
            return Err(LabError::ReadOnlyParameter(row.name.clone()));
        }
        Ok(row)
    }

    /// Write one value without re-running formulas.
    fn write_result(&mut self, at: ParameterRef, value: &str) -> Result<()> {
        let options = self.options.clone();
        let row = self.editable_row(at)?;
        if value.trim().is_empty() {
            row.clear_result();
        } else if row.is_dropdown() {
            row.select_option(value);
        } else {
            row.result = value.trim().to_string();
            row.selected_option_id = None;
        }
        row.status = classify(row, &options);
        let (outer_group, name) = (row.outer_group.clone(), row.name.clone());
        invalidate_dependents(&mut self.tests[at.test].parameters, &outer_group, &name);
        Ok(())
    }

    fn recompute_formulas(&mut self, test: usize) -> FormulaOutcome {
        let Self {
            tests,
            options,
            formula_guard,
            ..
        } = self;
        apply_formulas(&mut tests[test].parameters, formula_guard, options)
    }

    /// Edit a manual or dropdown result and recompute the test's formulas.
    ///
    /// An empty value clears the result. Returns the row's new status.
    ///
    /// # Errors
    ///
    /// [`LabError::ReadOnlyParameter`] for formula rows, or an addressing
    /// error when `at` does not point at a row.
    pub fn set_result(&mut self, at: ParameterRef, value: &str) -> Result<ResultStatus> {
        self.write_result(at, value)?;
        self.recompute_formulas(at.test);
        Ok(self.tests[at.test].parameters[at.index].status)
    }

    /// Choose a dropdown label. Labels outside the option list are kept as
    /// free text.
    pub fn select_option(&mut self, at: ParameterRef, label: &str) -> Result<ResultStatus> {
        let options = self.options.clone();
        let row = self.editable_row(at)?;
        row.select_option(label);
        row.status = classify(row, &options);
        let (outer_group, name) = (row.outer_group.clone(), row.name.clone());
        invalidate_dependents(&mut self.tests[at.test].parameters, &outer_group, &name);
        self.recompute_formulas(at.test);
        Ok(self.tests[at.test].parameters[at.index].status)
    }

    /// Clear a manual or dropdown result along with every formula that
    /// depends on it.
    pub fn clear_result(&mut self, at: ParameterRef) -> Result<()> {
        self.set_result(at, "").map(|_| ())
    }

    /// Preload many results of one test, then run a single formula pass.
    ///
    /// Stops at the first addressing error; values written before it stay.
    pub fn apply_results<'a, I>(&mut self, test: &str, results: I) -> Result<FormulaOutcome>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.apply_scoped_results(
            test,
            results
                .into_iter()
                .map(|(parameter, value)| (None, parameter, value)),
        )
    }

    /// [`ReportSession::apply_results`] with an optional included-test name
    /// per value, as `(outer_group, parameter, value)`.
    pub fn apply_scoped_results<'a, I>(&mut self, test: &str, results: I) -> Result<FormulaOutcome>
    where
        I: IntoIterator<Item = (Option<&'a str>, &'a str, &'a str)>,
    {
        let mut test_idx = None;
        let mut written = 0usize;
        for (outer_group, parameter, value) in results {
            let at = self.find_parameter_in(test, outer_group, parameter)?;
            self.write_result(at, value)?;
            test_idx = Some(at.test);
            written += 1;
        }
        let Some(test_idx) = test_idx else {
            return Ok(FormulaOutcome::default());
        };
        let outcome = self.recompute_formulas(test_idx);
        debug!(test, written, passes = outcome.passes, "results applied");
        Ok(outcome)
    }

    /// Switch patient demographics and re-derive every range and status.
    /// Expanded rows and entered results are kept.
    pub fn update_patient(&mut self, patient: PatientContext) -> Result<()> {
        patient.validate()?;
        self.patient = patient;
        let days = patient_days(&self.patient);
        let gender = self.patient.gender;
        for idx in 0..self.tests.len() {
            refresh_ranges(&mut self.tests[idx].parameters, days, gender, &self.options);
            self.recompute_formulas(idx);
        }
        debug!(tests = self.tests.len(), "patient context updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lab_model::{AgeUnit, NormalValueBand, ParameterDefinition, TestType};

    fn protein_test() -> TestDefinition {
        TestDefinition::new("Protein Panel", TestType::Multiple)
            .with_parameter(
                ParameterDefinition::new("Total Protein", 1.0)
                    .with_unit("g/dL")
                    .with_band(NormalValueBand::numeric(6.0, 8.3)),
            )
            .with_parameter(
                ParameterDefinition::new("Albumin", 2.0)
                    .with_unit("g/dL")
                    .with_band(NormalValueBand::numeric(3.5, 5.0)),
            )
            .with_parameter(
                ParameterDefinition::new("Globulin", 3.0)
                    .with_unit("g/dL")
                    .with_formula("{Total Protein} - {Albumin}")
                    .with_band(NormalValueBand::numeric(2.0, 3.5)),
            )
    }

    fn session() -> ReportSession {
        let patient = PatientContext::new(35.0, AgeUnit::Years, Gender::Male).unwrap();
        let mut session = ReportSession::new(patient, EngineOptions::default()).unwrap();
        session.add_test(&protein_test(), &Catalog::default());
        session
    }

    #[test]
    fn edits_flow_into_formulas() {
        let mut session = session();
        let protein = session.find_parameter("protein panel", "Total Protein").unwrap();
        let albumin = session.find_parameter("Protein Panel", "albumin").unwrap();
        assert_eq!(session.set_result(protein, "7.0").unwrap(), ResultStatus::Normal);
        assert_eq!(session.set_result(albumin, "3").unwrap(), ResultStatus::Low);

        let globulin = session.find_parameter("Protein Panel", "Globulin").unwrap();
        let row = session.row(globulin).unwrap();
        assert_eq!(row.result, "4");
        assert_eq!(row.status, ResultStatus::High);
    }

    #[test]
    fn formula_rows_are_read_only() {
        let mut session = session();
        let globulin = session.find_parameter("Protein Panel", "Globulin").unwrap();
        assert!(matches!(
            session.set_result(globulin, "1"),
            Err(LabError::ReadOnlyParameter(name)) if name == "Globulin"
        ));
    }

    #[test]
    fn unknown_addresses_are_errors() {
        let session = session();
        assert!(matches!(
            session.find_parameter("Lipid", "HDL"),
            Err(LabError::UnknownTest(_))
        ));
        assert!(matches!(
            session.find_parameter("Protein Panel", "HDL"),
            Err(LabError::UnknownParameter { .. })
        ));
    }

    #[test]
    fn invalid_patient_is_rejected() {
        let patient = PatientContext {
            age_value: -1.0,
            age_unit: AgeUnit::Years,
            gender: Gender::Any,
        };
        assert!(ReportSession::new(patient, EngineOptions::default()).is_err());
    }
}
