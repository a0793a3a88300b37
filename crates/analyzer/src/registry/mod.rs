//! Parser registry: which parser owns a file.
//!
//! Built once at startup and passed by reference; resolution only reads.

pub mod pattern;
pub mod table;

pub use pattern::{FilePattern, FilePatternSet, RegistryError};
pub use table::{ParserRegistry, Priority, RegistrationInfo, ResolvedParser};
