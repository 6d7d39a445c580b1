//! Placeholder substitution
//!
//! Output paths and copied file contents may contain `{{KEY}}` placeholders
//! which are resolved against an [`AttributeLookup`]. Values inserted into
//! file paths are passed through [`clean_file_name`] so that attribute values
//! can never introduce directory separators or characters that are invalid
//! on common filesystems.

pub mod filename;
pub mod substitutor;

pub use filename::clean_file_name;
pub use substitutor::{substitute, substitute_path, AttributeLookup};
