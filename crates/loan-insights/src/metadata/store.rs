//! Editable descriptions.

use super::catalog::DescriptionCatalog;
use std::collections::HashMap;

/// Caller-owned description edits layered over a catalog.
///
/// Reads fall through to the catalog until a column is edited. Only
/// [`DescriptionStore::set`] writes; nothing is persisted implicitly.
#[derive(Debug, Clone, Default)]
pub struct DescriptionStore {
    initial: DescriptionCatalog,
    edits: HashMap<String, String>,
    dataset_description: String,
}

impl DescriptionStore {
    pub fn new(initial: DescriptionCatalog, dataset_description: impl Into<String>) -> Self {
        Self {
            initial,
            edits: HashMap::new(),
            dataset_description: dataset_description.into(),
        }
    }

    /// Current description of a column.
    pub fn get(&self, column: &str) -> String {
        match self.edits.get(column) {
            Some(edited) => edited.clone(),
            None => self.initial.describe(column),
        }
    }

    pub fn set(&mut self, column: impl Into<String>, description: impl Into<String>) {
        self.edits.insert(column.into(), description.into());
    }

    /// Drop an edit, restoring the catalog value.
    pub fn reset(&mut self, column: &str) -> bool {
        self.edits.remove(column).is_some()
    }

    pub fn is_edited(&self, column: &str) -> bool {
        self.edits.contains_key(column)
    }

    pub fn dataset_description(&self) -> &str {
        &self.dataset_description
    }

    pub fn set_dataset_description(&mut self, description: impl Into<String>) {
        self.dataset_description = description.into();
    }
}
