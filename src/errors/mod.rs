//! Error types shared by every graph operation.

mod graph_error;

pub use graph_error::{GraphError, Result};
