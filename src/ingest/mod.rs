mod archive;
mod content_type;

pub use archive::{BundleEntry, GameBundle, IngestError, ingest_upload};
pub use content_type::{content_type_for, file_extension};
