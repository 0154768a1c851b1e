//! Graph storage layer
//!
//! Column- and row-oriented compressed views, in-degree, and the builder that
//! materializes all three from an edge list.

pub mod degree;
pub mod graph;
pub mod view;

pub use degree::InDegree;
pub use graph::{NodeId, SageGraph};
pub use view::{ColumnView, RowView};
