//! Output directory bookkeeping.

pub mod index;
pub mod writer;

pub use index::{IndexParseError, OutputIndex, INDEX_FILE_NAME};
pub use writer::OutputDirectoryWriter;
