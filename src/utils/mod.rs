// Utility functions
pub mod error;
pub mod multi_select;
pub mod mutation_guard;
pub mod query;
pub mod row_expansion;

pub use error::*;
pub use multi_select::*;
pub use mutation_guard::*;
pub use row_expansion::*;
