mod storage;

pub use storage::{BlobError, BlobStorage, ObjectInfo, is_valid_object_key};
