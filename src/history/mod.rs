//! History screen: logged intakes with filters, day grouping, and adherence
//! statistics.

pub mod aggregates;
pub mod fetch;
pub mod types;

pub use aggregates::*;
pub use fetch::*;
pub use types::*;
