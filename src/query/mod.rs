pub mod fetch;
pub mod predicate;
pub mod sort;

pub use fetch::FetchRequest;
pub use predicate::{ComparisonOp, Predicate};
pub use sort::{SortDescriptor, compare_by};
