//! Name canonicalization for agency and advisor matching.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;

/// Canonical form of an agency or advisor name.
///
/// Uppercase, accented vowels folded to ASCII (precomposed or decomposed),
/// `.` `,` `-` removed, whitespace runs collapsed to one space, trimmed.
/// Idempotent.
pub fn normalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_space = false;

    for c in name.chars().flat_map(char::to_uppercase) {
        let c = fold_accent(c);
        if is_combining_mark(c) {
            // Decomposed Ñ stays Ñ; any other mark is dropped.
            if c == COMBINING_TILDE && out.ends_with('N') && !pending_space {
                out.pop();
                out.push('Ñ');
            }
            continue;
        }
        if matches!(c, '.' | ',' | '-') {
            continue;
        }
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(c);
    }
    out
}

/// Fold the accented vowels that show up in Peruvian business names.
/// `Ñ` is a distinct letter and is kept.
fn fold_accent(c: char) -> char {
    match c {
        'Á' | 'À' | 'Â' | 'Ä' => 'A',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'Ó' | 'Ò' | 'Ô' | 'Ö' => 'O',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        other => other,
    }
}

const COMBINING_TILDE: char = '\u{0303}';

fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036F}').contains(&c)
}

/// File-name stem for an agency: alphanumerics, spaces and underscores only,
/// trailing whitespace removed.
pub fn sanitize_file_stem(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '_')
        .collect();
    kept.trim_end().to_string()
}

/// Identity of an agency. Equality and hashing use the normalized form only;
/// `display` keeps the first-seen human-readable spelling for output naming.
#[derive(Debug, Clone, Serialize)]
pub struct AgencyKey {
    display: String,
    normalized: String,
}

impl AgencyKey {
    pub fn new(display: &str) -> Self {
        let display = display.trim().to_string();
        let normalized = normalize(&display);
        Self { display, normalized }
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }
}

impl PartialEq for AgencyKey {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for AgencyKey {}

impl Hash for AgencyKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized.hash(state);
    }
}

impl fmt::Display for AgencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}
