mod atomic;
mod file_storage;
mod models;

pub use atomic::write_atomic;
pub use file_storage::{
    change_password, read_document, write_document, BodyFormat, FileKind, OpenedDocument,
    SaveOptions, StorageError, StorageResult,
};
pub use models::*;
