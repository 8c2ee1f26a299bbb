//! Bidirectional rich markup codec
//!
//! `export` serializes the document model into the RTF-style tagged text
//! the editor exchanges with other applications; `import` parses that form
//! back. The importer is deliberately tolerant: any input produces a
//! document, and unrecognized markup degrades to plain text instead of an
//! error.

pub mod export;
pub mod import;

pub use export::document_to_rtf;
pub use import::rtf_to_document;
