use crate::schema::AliasTable;
use crate::types::FieldName;
use crate::utils::normalize_column;

/// Resolves raw column headers to canonical field names.
#[derive(Clone, Debug, Default)]
pub struct Canonicalizer {
    aliases: AliasTable,
}

impl Canonicalizer {
    /// Create a canonicalizer over a validated alias table.
    pub fn new(aliases: AliasTable) -> Self {
        Self { aliases }
    }

    /// The underlying alias table.
    pub fn alias_table(&self) -> &AliasTable {
        &self.aliases
    }

    /// Resolve `raw` to its canonical field, or return it normalized.
    ///
    /// Unknown columns pass through instead of erroring, so extra columns
    /// such as `bikeid` or `tripduration` survive canonicalization.
    pub fn canonicalize(&self, raw: &str) -> FieldName {
        let normalized = normalize_column(raw);
        match self.aliases.lookup(&normalized) {
            Some(canonical) => canonical.to_string(),
            None => normalized,
        }
    }

    /// Canonicalize every header in order.
    pub fn canonicalize_headers<'a, I>(&self, headers: I) -> Vec<FieldName>
    where
        I: IntoIterator<Item = &'a str>,
    {
        headers
            .into_iter()
            .map(|header| self.canonicalize(header))
            .collect()
    }
}
