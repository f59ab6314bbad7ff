//! Tag to folder mapping.
//!
//! A [`PathMapper`] owns the mapping table and turns tags into target folder
//! paths, falling back to a path derived from the tag itself.

pub mod resolver;
pub mod table;
pub mod validator;

pub use resolver::{MappingType, PathMapper, PathMappingResult};
pub use table::{MappingTable, TagPathMapping};
pub use validator::{PathValidation, derive_default_path, sanitize_component, validate_path};
