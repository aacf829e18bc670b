// ============================================================================
// Change Set Module
// ============================================================================

pub mod change;

pub use change::{Change, ChangeCounts, ChangeSet};
