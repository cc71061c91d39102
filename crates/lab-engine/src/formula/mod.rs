//! Formula evaluation for derived parameters.
//!
//! Formula rows reference other rows of the same test by name, e.g.
//! `Globulin = {Total Protein} - {Albumin}`. Inside a panel the scope is the
//! included test (`outer_group`). Evaluation substitutes current
//! numeric results, checks that only arithmetic remains, and evaluates with
//! the restricted parser in [`expr`]. Passes repeat until nothing changes or
//! the pass cap is reached, which lets formulas of formulas settle.
//!
//! Failures never propagate: an unresolved token, a rejected character or a
//! non-finite value clears the row and leaves it Pending.

pub mod expr;
pub mod names;

use std::cell::Cell;
use std::collections::HashMap;

use lab_model::{EngineOptions, ResolvedParameter};
use tracing::{debug, trace};

use crate::normalization::{format_fixed, format_numeric, round_to};
use crate::status::classify;

pub use expr::{BinaryOp, Expr, FormulaError};
pub use names::{NameLookup, Substitution, formula_references, substitute, token_refers_to};

/// Single-writer flag for one report's formula state.
///
/// Each report session owns its own guard; nothing is global.
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    active: Cell<bool>,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the guard; None while another holder is active.
    pub fn enter(&self) -> Option<GuardToken<'_>> {
        if self.active.replace(true) {
            None
        } else {
            Some(GuardToken { flag: &self.active })
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }
}

/// Releases the guard on drop.
#[derive(Debug)]
pub struct GuardToken<'a> {
    flag: &'a Cell<bool>,
}

impl Drop for GuardToken<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

/// Summary of one evaluation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormulaOutcome {
    /// Passes executed.
    pub passes: usize,
    /// Row results that changed across all passes.
    pub changed: usize,
    /// The run was skipped because an evaluation was already in flight.
    pub skipped: bool,
}

/// Evaluate one formula against a lookup; returns the display string.
///
/// # Errors
///
/// Returns a [`FormulaError`] when a token is unresolved, the substituted
/// text is not plain arithmetic, or the value is not finite.
pub fn evaluate_formula(
    formula: &str,
    lookup: &NameLookup,
    row: &ResolvedParameter,
    options: &EngineOptions,
) -> Result<String, FormulaError> {
    let substitution = substitute(formula, lookup);
    if let Some((position, ch)) = substitution
        .expression
        .char_indices()
        .find(|(_, ch)| !expr::is_allowed_char(*ch))
    {
        return Err(FormulaError::UnexpectedCharacter { ch, position });
    }
    // syntax errors take precedence over unresolved names
    let value = expr::evaluate(&substitution.expression)?;
    if !substitution.is_complete() {
        return Err(FormulaError::UnresolvedReference(substitution.unresolved));
    }
    let rounded = round_to(value, options.decimal_places);
    if is_ratio(row) {
        Ok(format_fixed(rounded, options.decimal_places))
    } else {
        Ok(format_numeric(rounded))
    }
}

fn is_ratio(row: &ResolvedParameter) -> bool {
    row.unit.to_lowercase().contains("ratio") || row.name.to_lowercase().contains("ratio")
}

/// Recompute every formula row of one test in place.
///
/// Runs up to `options.effective_formula_passes()` passes and stops early
/// after a pass without changes. Returns a skipped outcome when `guard` is
/// already held.
pub fn apply_formulas(
    rows: &mut [ResolvedParameter],
    guard: &ReentrancyGuard,
    options: &EngineOptions,
) -> FormulaOutcome {
    let Some(_token) = guard.enter() else {
        trace!("formula evaluation already in flight");
        return FormulaOutcome {
            skipped: true,
            ..FormulaOutcome::default()
        };
    };
    let formula_rows: Vec<usize> = (0..rows.len())
        .filter(|&idx| rows[idx].is_formula() && rows[idx].formula.is_some())
        .collect();
    let mut outcome = FormulaOutcome::default();
    if formula_rows.is_empty() {
        return outcome;
    }

    for pass in 1..=options.effective_formula_passes() {
        outcome.passes = pass;
        let lookups = scoped_lookups(rows, &formula_rows);
        let mut changed = 0usize;
        for &idx in &formula_rows {
            let row = &rows[idx];
            let formula = row.formula.as_deref().unwrap_or_default();
            let lookup = &lookups[&row.outer_group];
            let next = match evaluate_formula(formula, lookup, row, options) {
                Ok(value) => value,
                Err(error) => {
                    trace!(parameter = %row.name, %error, "formula left blank");
                    String::new()
                }
            };
            let row = &mut rows[idx];
            if row.result != next {
                row.result = next;
                changed += 1;
            }
            row.status = classify(row, options);
        }
        outcome.changed += changed;
        debug!(pass, changed, "formula pass complete");
        if changed == 0 {
            break;
        }
    }
    outcome
}

/// One lookup per included test that owns a formula row, built from the
/// values at the start of the pass.
fn scoped_lookups(
    rows: &[ResolvedParameter],
    formula_rows: &[usize],
) -> HashMap<String, NameLookup> {
    let mut lookups = HashMap::new();
    for &idx in formula_rows {
        let scope = &rows[idx].outer_group;
        if !lookups.contains_key(scope) {
            lookups.insert(scope.clone(), NameLookup::from_scope(rows, scope));
        }
    }
    lookups
}

/// Clear formula rows of `outer_group` that depend on `name`, following
/// chains of formulas.
///
/// Returns the number of rows cleared.
pub fn invalidate_dependents(
    rows: &mut [ResolvedParameter],
    outer_group: &str,
    name: &str,
) -> usize {
    let mut pending = vec![name.to_string()];
    let mut cleared = vec![false; rows.len()];
    let mut count = 0usize;
    while let Some(changed) = pending.pop() {
        for (idx, row) in rows.iter_mut().enumerate() {
            if cleared[idx] || !row.is_formula() || row.outer_group != outer_group {
                continue;
            }
            let Some(formula) = row.formula.as_deref() else {
                continue;
            };
            let depends = formula_references(formula)
                .iter()
                .any(|token| token_refers_to(token, &changed));
            if depends {
                cleared[idx] = true;
                row.clear_result();
                pending.push(row.name.clone());
                count += 1;
            }
        }
    }
    if count > 0 {
        debug!(parameter = name, outer_group, cleared = count, "dependent formulas cleared");
    }
    count
}
