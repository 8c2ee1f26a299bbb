pub mod encryption;
pub mod rtf;
pub mod storage;
