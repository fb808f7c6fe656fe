//! Agencies that appear in the Detail sheet under several advisor names.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::SegmentError;
use crate::normalize::{normalize, AgencyKey};
use crate::table::RawTable;

/// Canonical agency → set of advisor names that count as that agency.
///
/// Keys and members are stored normalized. A name may belong to at most one
/// canonical agency.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasMap {
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl AliasMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from configured `(canonical, [aliases])` pairs. Rejects a name
    /// claimed by two canonical agencies.
    pub fn from_entries<K, V, I>(entries: I) -> Result<Self, SegmentError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: IntoIterator,
        V::Item: AsRef<str>,
    {
        let mut map: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut owner: HashMap<String, String> = HashMap::new();

        for (canonical, aliases) in entries {
            let key = normalize(canonical.as_ref());
            if key.is_empty() {
                return Err(SegmentError::Config("alias map has an empty agency name".into()));
            }
            let set = map.entry(key.clone()).or_default();
            for alias in aliases {
                let alias = normalize(alias.as_ref());
                if alias.is_empty() {
                    continue;
                }
                if let Some(existing) = owner.get(&alias) {
                    if *existing != key {
                        return Err(SegmentError::Config(format!(
                            "alias '{alias}' is listed under both '{existing}' and '{key}'"
                        )));
                    }
                }
                owner.insert(alias.clone(), key.clone());
                set.insert(alias);
            }
        }

        Ok(Self { entries: map })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn aliases(&self, key: &AgencyKey) -> Option<&BTreeSet<String>> {
        self.entries.get(key.normalized())
    }

    /// True when the normalized advisor name belongs to `key`.
    pub fn matches(&self, key: &AgencyKey, normalized_advisor: &str) -> bool {
        match self.aliases(key) {
            Some(set) => set.contains(normalized_advisor),
            None => key.normalized() == normalized_advisor,
        }
    }

    /// Canonical names that have aliases configured.
    pub fn canonical_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// Detail row indices attributed to `key`, in Detail order.
///
/// With configured aliases a row matches when its normalized advisor is in the
/// alias set; otherwise it must equal the key. Never a substring match.
pub fn resolve_detail_rows(
    key: &AgencyKey,
    aliases: &AliasMap,
    detail: &RawTable,
    advisor_col: usize,
) -> Vec<usize> {
    let advisors: Vec<String> = detail
        .column_values(advisor_col)
        .map(|c| normalize(&c.to_text()))
        .collect();
    resolve_rows(key, aliases, &advisors)
}

/// Same as [`resolve_detail_rows`] over pre-normalized advisor names.
pub fn resolve_rows(key: &AgencyKey, aliases: &AliasMap, normalized_advisors: &[String]) -> Vec<usize> {
    normalized_advisors
        .iter()
        .enumerate()
        .filter(|(_, advisor)| !advisor.is_empty() && aliases.matches(key, advisor))
        .map(|(i, _)| i)
        .collect()
}
