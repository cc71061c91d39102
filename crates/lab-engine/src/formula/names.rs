//! Parameter-name lookup and `{token}` substitution.
//!
//! Formula authors reference parameters loosely: `{Total Protein}` for a
//! parameter named `TotalProtein`, `{Hb}` for `Hb (Haemoglobin)`. Each name
//! is therefore indexed under four keys and a token matches when any of its
//! keys hits.

use std::collections::HashMap;

use lab_model::ResolvedParameter;

use crate::normalization::{format_numeric, parse_f64};

/// The four lookup keys of a name: lower-case, alphanumeric-only,
/// parenthesis-stripped, and alphanumeric-only of the stripped form.
pub fn name_keys(name: &str) -> [String; 4] {
    let lower = collapse(&name.to_lowercase());
    let stripped = collapse(&strip_parenthesized(&lower));
    let alnum = alphanumeric(&lower);
    let stripped_alnum = alphanumeric(&stripped);
    [lower, alnum, stripped, stripped_alnum]
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn alphanumeric(text: &str) -> String {
    text.chars().filter(|ch| ch.is_alphanumeric()).collect()
}

/// Drops `( ... )` segments, including nested ones.
fn strip_parenthesized(text: &str) -> String {
    let mut depth = 0usize;
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '(' => depth += 1,
            ')' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    out
}

/// True when a formula token and a parameter name share a lookup key.
pub fn token_refers_to(token: &str, name: &str) -> bool {
    let token_keys = name_keys(token);
    let name_keys = name_keys(name);
    token_keys
        .iter()
        .filter(|key| !key.is_empty())
        .any(|key| name_keys.contains(key))
}

/// Numeric results of a test, indexed by every key form of their names.
#[derive(Debug, Clone, Default)]
pub struct NameLookup {
    values: HashMap<String, f64>,
}

impl NameLookup {
    /// Index every row whose result parses as a finite number.
    pub fn from_rows(rows: &[ResolvedParameter]) -> Self {
        Self::collect(rows)
    }

    /// Like [`NameLookup::from_rows`], limited to rows of one included test.
    ///
    /// Panel rows from different included tests may share names; a formula
    /// only sees its own `outer_group`.
    pub fn from_scope(rows: &[ResolvedParameter], outer_group: &str) -> Self {
        Self::collect(rows.iter().filter(|row| row.outer_group == outer_group))
    }

    fn collect<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a ResolvedParameter>,
    {
        let mut lookup = Self::default();
        for row in rows {
            if let Some(value) = parse_f64(&row.result) {
                lookup.insert(&row.name, value);
            }
        }
        lookup
    }

    /// Earlier names keep their keys when two names collide.
    pub fn insert(&mut self, name: &str, value: f64) {
        for key in name_keys(name) {
            if !key.is_empty() {
                self.values.entry(key).or_insert(value);
            }
        }
    }

    pub fn get(&self, token: &str) -> Option<f64> {
        name_keys(token)
            .iter()
            .filter(|key| !key.is_empty())
            .find_map(|key| self.values.get(key).copied())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// `{token}` names in a formula, in order of appearance.
pub fn formula_references(formula: &str) -> Vec<String> {
    let mut references = Vec::new();
    let mut rest = formula;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            break;
        };
        references.push(after[..close].trim().to_string());
        rest = &after[close + 1..];
    }
    references
}

/// Result of substituting names into a formula.
#[derive(Debug, Clone, PartialEq)]
pub struct Substitution {
    /// Arithmetic text; unresolved tokens are written as `0`.
    pub expression: String,
    /// Tokens that had no numeric value.
    pub unresolved: Vec<String>,
}

impl Substitution {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Strip an optional leading `label =`, map `×`/`÷` to `*`/`/` and replace
/// every `{token}` with its value.
pub fn substitute(formula: &str, lookup: &NameLookup) -> Substitution {
    let body = match formula.split_once('=') {
        Some((label, body)) if !label.contains('{') => body,
        _ => formula,
    };
    let body = body.replace('×', "*").replace('÷', "/");

    let mut expression = String::with_capacity(body.len());
    let mut unresolved = Vec::new();
    let mut rest = body.as_str();
    while let Some(open) = rest.find('{') {
        expression.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            // unterminated token: keep the brace so validation rejects it
            expression.push_str(&rest[open..]);
            rest = "";
            break;
        };
        let token = after[..close].trim();
        match lookup.get(token) {
            Some(value) if value < 0.0 => {
                expression.push_str(&format!("({})", format_numeric(value)));
            }
            Some(value) => expression.push_str(&format_numeric(value)),
            None => {
                unresolved.push(token.to_string());
                expression.push('0');
            }
        }
        rest = &after[close + 1..];
    }
    expression.push_str(rest);
    Substitution {
        expression,
        unresolved,
    }
}
