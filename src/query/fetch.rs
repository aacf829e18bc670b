use super::{Predicate, SortDescriptor};

/// Describes which objects of one entity a context should return.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub entity_name: String,
    pub predicate: Predicate,
    pub sort_descriptors: Vec<SortDescriptor>,
    pub fetch_limit: Option<usize>,
}

impl FetchRequest {
    pub fn new(entity_name: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            predicate: Predicate::True,
            sort_descriptors: Vec::new(),
            fetch_limit: None,
        }
    }

    pub fn predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn sort_by(mut self, descriptors: Vec<SortDescriptor>) -> Self {
        self.sort_descriptors = descriptors;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.fetch_limit = Some(limit);
        self
    }
}
