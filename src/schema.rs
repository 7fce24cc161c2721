use anyhow::{Result, bail};
use std::collections::BTreeSet;

use crate::source::FeatureSource;

/// Union of the attribute names of every merged layer. Kept sorted so the
/// written output does not depend on hash ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombinedSchema {
    fields: BTreeSet<String>,
}

impl CombinedSchema {
    pub fn unify<S: FeatureSource>(sources: &[S]) -> Result<Self> {
        if sources.is_empty() {
            bail!("Merge: Cannot unify the schema of zero layers");
        }
        let fields = sources
            .iter()
            .flat_map(|source| source.fields().iter().cloned())
            .collect();
        Ok(Self { fields })
    }

    pub fn with_field(mut self, name: &str) -> Self {
        self.fields.insert(name.to_string());
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}
