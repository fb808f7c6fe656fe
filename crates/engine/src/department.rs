//! Department-suffix stripping for provincial agency names.
//!
//! Provincial Summary rows name agencies as `<AGENCY> <DEPARTMENT>`
//! ("MI AGENCIA PIURA SUR"). The department list comes from the Detail sheet
//! and is matched longest-first, so "PIURA" never shadows "PIURA SUR".

use std::cmp::Reverse;
use std::collections::HashSet;

use crate::table::Cell;

/// Distinct department names, longest first. Ties keep first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepartmentVocabulary {
    departments: Vec<String>,
}

impl DepartmentVocabulary {
    pub fn from_cells<'a>(cells: impl IntoIterator<Item = &'a Cell>) -> Self {
        let mut seen = HashSet::new();
        let mut departments: Vec<String> = cells
            .into_iter()
            .map(|c| c.to_text().trim().to_string())
            .filter(|d| !d.is_empty() && seen.insert(d.to_uppercase()))
            .collect();
        departments.sort_by_key(|d| Reverse(d.chars().count()));
        Self { departments }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.departments
    }

    pub fn len(&self) -> usize {
        self.departments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.departments.is_empty()
    }

    pub fn strip(&self, raw_name: &str) -> String {
        strip_department(raw_name, &self.departments)
    }
}

/// Remove a trailing `<whitespace><department>` from `raw_name`.
///
/// `departments_longest_first` must already be sorted by descending length;
/// the first match wins. Comparison ignores case. Without a match the name is
/// returned trimmed.
pub fn strip_department<S: AsRef<str>>(raw_name: &str, departments_longest_first: &[S]) -> String {
    let name = raw_name.trim();
    for dept in departments_longest_first {
        let dept = dept.as_ref().trim();
        if dept.is_empty() {
            continue;
        }
        if let Some(prefix) = strip_suffix_ignore_case(name, dept) {
            if prefix.ends_with(char::is_whitespace) {
                return prefix.trim().to_string();
            }
        }
    }
    name.to_string()
}

fn strip_suffix_ignore_case<'a>(name: &'a str, suffix: &str) -> Option<&'a str> {
    let mut name_chars = name.char_indices().rev();
    let mut cut = name.len();
    for s in suffix.chars().rev() {
        let (idx, c) = name_chars.next()?;
        if !c.to_lowercase().eq(s.to_lowercase()) {
            return None;
        }
        cut = idx;
    }
    Some(&name[..cut])
}
