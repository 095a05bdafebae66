//! Data models shared across the conversion service.

mod format;
mod job;
mod metadata;

pub use format::*;
pub use job::*;
pub use metadata::*;
