use std::collections::{BTreeSet, HashMap};

use crate::constants::aliases::DEFAULT_ALIASES;
use crate::errors::PipelineError;
use crate::types::FieldName;
use crate::utils::normalize_column;

/// Immutable mapping from canonical fields to accepted raw-name variants.
///
/// Aliases are stored normalized. Construction rejects tables where an alias
/// shadows a canonical field name or is claimed by two different fields.
#[derive(Clone, Debug)]
pub struct AliasTable {
    fields: Vec<FieldName>,
    variants: HashMap<FieldName, BTreeSet<String>>,
    reverse: HashMap<String, FieldName>,
}

impl AliasTable {
    /// Build and validate a table from `(canonical, aliases)` entries.
    ///
    /// Canonical names keep the order they are given in.
    pub fn new<I, F, A, S>(entries: I) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = (F, A)>,
        F: Into<FieldName>,
        A: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut fields = Vec::new();
        let mut variants: HashMap<FieldName, BTreeSet<String>> = HashMap::new();
        for (canonical, aliases) in entries {
            let canonical = canonical.into();
            let normalized: BTreeSet<String> = aliases
                .into_iter()
                .map(|alias| normalize_column(alias.as_ref()))
                .collect();
            if !variants.contains_key(&canonical) {
                fields.push(canonical.clone());
            }
            variants.entry(canonical).or_default().extend(normalized);
        }

        let mut reverse = HashMap::new();
        for canonical in &fields {
            for alias in &variants[canonical] {
                if variants.contains_key(alias) {
                    return Err(PipelineError::Configuration(format!(
                        "alias '{alias}' of '{canonical}' shadows canonical field '{alias}'"
                    )));
                }
                if let Some(previous) = reverse.insert(alias.clone(), canonical.clone()) {
                    return Err(PipelineError::Configuration(format!(
                        "alias '{alias}' is claimed by both '{previous}' and '{canonical}'"
                    )));
                }
            }
        }

        Ok(Self {
            fields,
            variants,
            reverse,
        })
    }

    /// Canonical field names in table order.
    pub fn fields(&self) -> &[FieldName] {
        &self.fields
    }

    /// Normalized aliases registered for `canonical`.
    pub fn aliases_of(&self, canonical: &str) -> Option<&BTreeSet<String>> {
        self.variants.get(canonical)
    }

    /// Canonical field for an already-normalized name, if it is an alias.
    pub fn lookup(&self, normalized: &str) -> Option<&str> {
        self.reverse.get(normalized).map(String::as_str)
    }

    /// True if `name` is one of the canonical fields.
    pub fn is_canonical(&self, name: &str) -> bool {
        self.variants.contains_key(name)
    }
}

impl AliasTable {
    /// Table covering every published schema revision.
    pub fn builtin() -> Result<Self, PipelineError> {
        Self::new(DEFAULT_ALIASES.iter().map(|(field, aliases)| (*field, aliases.iter())))
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::builtin().unwrap_or_else(|err| unreachable!("built-in alias table is invalid: {err}"))
    }
}
