//! Test doubles for facetmap.
//!
//! The mocks evaluate where clauses with the real predicate language, so a
//! fragment the engine renders wrongly fails loudly instead of matching
//! everything.

pub mod fixture;
mod mock;

pub use fixture::Fixture;
pub use mock::{
    extent_of, MockDatasetProvider, MockQueryProvider, MockThemeDetector, MockView, Operation,
};
