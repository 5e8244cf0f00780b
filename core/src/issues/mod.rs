pub mod aggregator;
pub mod taxonomy;

pub use aggregator::{IssueAggregator, IssueEntry};
pub use taxonomy::{IssueTaxonomy, TaxonomyEntry};
