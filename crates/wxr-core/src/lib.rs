//! Core building blocks shared by the runtime and its C ABI layer:
//! the result taxonomy, generation-tagged handle tables and configuration.

pub mod config;
pub mod error;
pub mod handle_table;

pub use error::{Status, XrError, XrResult};
pub use handle_table::{HandleTable, ObjectKind};
