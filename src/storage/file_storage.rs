use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::encryption::{self, EncryptionError};
use crate::rtf;

use super::atomic::write_atomic;
use super::models::Document;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encryption error: {0}")]
    Encryption(#[from] EncryptionError),

    #[error("A password is required for encrypted files")]
    PasswordRequired,
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// What a file holds, decided by its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    PlainText,
    RichMarkup,
    Encrypted,
}

impl FileKind {
    /// Classify a path: `rtf` is rich markup, `scrb` is an encrypted
    /// container, anything else is plain text
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("rtf") => FileKind::RichMarkup,
            Some("scrb") => FileKind::Encrypted,
            _ => FileKind::PlainText,
        }
    }
}

/// Which serialization lives inside an encrypted container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyFormat {
    Plain,
    #[default]
    Rich,
}

/// A parsed document plus how it was stored on disk
#[derive(Debug, Clone, PartialEq)]
pub struct OpenedDocument {
    pub document: Document,
    pub kind: FileKind,
    pub body: BodyFormat,
}

/// How to serialize a document on save
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// Required when the destination is an encrypted container
    pub password: Option<String>,
    /// Serialization placed inside the container
    pub encrypted_body: BodyFormat,
}

/// Open a file and parse it into a document.
///
/// Key derivation and decryption run on the blocking pool.
pub async fn read_document(
    path: impl AsRef<Path>,
    password: Option<&str>,
) -> StorageResult<OpenedDocument> {
    let path = path.as_ref().to_path_buf();
    let password = password.map(str::to_string);

    tokio::task::spawn_blocking(move || read_document_sync(&path, password.as_deref()))
        .await
        .map_err(task_failed)?
}

/// Serialize a document and write it to disk atomically.
///
/// The destination extension decides the serialization; writing a container
/// without a password in the options is an error.
pub async fn write_document(
    path: impl AsRef<Path>,
    document: &Document,
    options: &SaveOptions,
) -> StorageResult<()> {
    let path = path.as_ref().to_path_buf();
    let document = document.clone();
    let options = options.clone();

    tokio::task::spawn_blocking(move || write_document_sync(&path, &document, &options))
        .await
        .map_err(task_failed)?
}

/// Re-seal a container under a new password without touching its contents.
///
/// Always writes the current container version, so this also upgrades
/// legacy files.
pub async fn change_password(
    path: impl AsRef<Path>,
    old_password: &str,
    new_password: &str,
) -> StorageResult<()> {
    let path = path.as_ref().to_path_buf();
    let old_password = old_password.to_string();
    let new_password = new_password.to_string();

    tokio::task::spawn_blocking(move || change_password_sync(&path, &old_password, &new_password))
        .await
        .map_err(task_failed)?
}

fn task_failed(e: tokio::task::JoinError) -> StorageError {
    StorageError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        format!("Task failed: {}", e),
    ))
}

/// Extension decides the kind, except that container bytes win on reads:
/// a renamed container still opens as one
fn detect_kind(path: &Path, bytes: &[u8]) -> FileKind {
    if encryption::is_container(bytes) {
        FileKind::Encrypted
    } else {
        FileKind::from_path(path)
    }
}

fn read_document_sync(path: &Path, password: Option<&str>) -> StorageResult<OpenedDocument> {
    let bytes = fs::read(path)?;
    let kind = detect_kind(path, &bytes);
    log::debug!("Read {} bytes from {:?} as {:?}", bytes.len(), path, kind);

    match kind {
        FileKind::Encrypted => {
            let password = password.ok_or(StorageError::PasswordRequired)?;
            let plaintext = encryption::open(&bytes, password)?;
            // containers carry no body marker; the markup header prefix of
            // the plaintext is the discriminator
            let (document, body) = if plaintext.starts_with("{\\rtf") {
                (rtf::rtf_to_document(&plaintext), BodyFormat::Rich)
            } else {
                (Document::from_plain_text(&plaintext), BodyFormat::Plain)
            };
            Ok(OpenedDocument { document, kind, body })
        }
        FileKind::RichMarkup => {
            let text = String::from_utf8_lossy(&bytes);
            Ok(OpenedDocument {
                document: rtf::rtf_to_document(&text),
                kind,
                body: BodyFormat::Rich,
            })
        }
        FileKind::PlainText => {
            let text = String::from_utf8_lossy(&bytes);
            Ok(OpenedDocument {
                document: Document::from_plain_text(&text),
                kind,
                body: BodyFormat::Plain,
            })
        }
    }
}

fn write_document_sync(path: &Path, document: &Document, options: &SaveOptions) -> StorageResult<()> {
    let kind = FileKind::from_path(path);

    let bytes = match kind {
        FileKind::PlainText => document.to_plain_text().into_bytes(),
        FileKind::RichMarkup => rtf::document_to_rtf(document).into_bytes(),
        FileKind::Encrypted => {
            let password = options
                .password
                .as_deref()
                .ok_or(StorageError::PasswordRequired)?;
            let plaintext = match options.encrypted_body {
                BodyFormat::Rich => rtf::document_to_rtf(document),
                BodyFormat::Plain => document.to_plain_text(),
            };
            encryption::seal(&plaintext, password)?
        }
    };

    write_atomic(path, &bytes)?;
    log::debug!("Wrote {} bytes to {:?} as {:?}", bytes.len(), path, kind);
    Ok(())
}

fn change_password_sync(path: &Path, old: &str, new: &str) -> StorageResult<()> {
    let bytes = fs::read(path)?;
    let plaintext = encryption::open(&bytes, old)?;
    let resealed = encryption::seal(&plaintext, new)?;
    write_atomic(path, &resealed)?;
    log::info!("Rekeyed {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::{BlockAttrs, InlineAttrs};

    fn sample_doc() -> Document {
        let mut doc = Document::new();
        doc.push_run("Styled ", InlineAttrs::default());
        doc.push_run(
            "bold",
            InlineAttrs {
                bold: true,
                ..Default::default()
            },
        );
        doc.push_break(BlockAttrs::default());
        doc
    }

    #[tokio::test]
    async fn test_plain_text_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt");
        let doc = Document::from_plain_text("hello\nworld\n");

        write_document(&path, &doc, &SaveOptions::default())
            .await
            .unwrap();
        let opened = read_document(&path, None).await.unwrap();

        assert_eq!(opened.kind, FileKind::PlainText);
        assert_eq!(opened.body, BodyFormat::Plain);
        assert_eq!(opened.document, doc);
    }

    #[tokio::test]
    async fn test_rich_markup_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.rtf");
        let doc = sample_doc();

        write_document(&path, &doc, &SaveOptions::default())
            .await
            .unwrap();
        let opened = read_document(&path, None).await.unwrap();

        assert_eq!(opened.kind, FileKind::RichMarkup);
        assert_eq!(opened.body, BodyFormat::Rich);
        assert_eq!(opened.document, doc);
    }

    #[tokio::test]
    async fn test_extension_matching_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("NOTE.RTF");
        assert_eq!(FileKind::from_path(&path), FileKind::RichMarkup);

        let doc = sample_doc();
        write_document(&path, &doc, &SaveOptions::default())
            .await
            .unwrap();
        let opened = read_document(&path, None).await.unwrap();
        assert_eq!(opened.kind, FileKind::RichMarkup);
        assert_eq!(opened.document, doc);
    }

    #[tokio::test]
    async fn test_encrypted_rich_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.scrb");
        let doc = sample_doc();
        let options = SaveOptions {
            password: Some("hunter2".to_string()),
            encrypted_body: BodyFormat::Rich,
        };

        write_document(&path, &doc, &options).await.unwrap();
        let opened = read_document(&path, Some("hunter2")).await.unwrap();

        assert_eq!(opened.kind, FileKind::Encrypted);
        assert_eq!(opened.body, BodyFormat::Rich);
        assert_eq!(opened.document, doc);
    }

    #[tokio::test]
    async fn test_encrypted_plain_body_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.scrb");
        let doc = Document::from_plain_text("no formatting here\n");
        let options = SaveOptions {
            password: Some("pw".to_string()),
            encrypted_body: BodyFormat::Plain,
        };

        write_document(&path, &doc, &options).await.unwrap();
        let opened = read_document(&path, Some("pw")).await.unwrap();

        assert_eq!(opened.body, BodyFormat::Plain);
        assert_eq!(opened.document, doc);
    }

    #[tokio::test]
    async fn test_read_encrypted_without_password() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.scrb");
        let options = SaveOptions {
            password: Some("pw".to_string()),
            ..Default::default()
        };
        write_document(&path, &sample_doc(), &options).await.unwrap();

        let err = read_document(&path, None).await.unwrap_err();
        assert!(matches!(err, StorageError::PasswordRequired));
    }

    #[tokio::test]
    async fn test_write_encrypted_without_password() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.scrb");

        let err = write_document(&path, &sample_doc(), &SaveOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::PasswordRequired));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_read_encrypted_with_wrong_password() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.scrb");
        let options = SaveOptions {
            password: Some("right".to_string()),
            ..Default::default()
        };
        write_document(&path, &sample_doc(), &options).await.unwrap();

        let err = read_document(&path, Some("wrong")).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Encryption(EncryptionError::AuthenticationFailed)
        ));
    }

    #[tokio::test]
    async fn test_renamed_container_is_still_recognized() {
        let dir = tempfile::tempdir().unwrap();
        let scrb = dir.path().join("secret.scrb");
        let renamed = dir.path().join("innocent.txt");
        let options = SaveOptions {
            password: Some("pw".to_string()),
            ..Default::default()
        };
        write_document(&scrb, &sample_doc(), &options).await.unwrap();
        fs::copy(&scrb, &renamed).unwrap();

        let opened = read_document(&renamed, Some("pw")).await.unwrap();
        assert_eq!(opened.kind, FileKind::Encrypted);
        assert_eq!(opened.document, sample_doc());
    }

    #[tokio::test]
    async fn test_garbage_with_container_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.scrb");
        fs::write(&path, b"not a container at all").unwrap();

        let err = read_document(&path, Some("pw")).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Encryption(EncryptionError::CorruptFormat)
        ));
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_document(dir.path().join("absent.txt"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
    }

    #[tokio::test]
    async fn test_change_password() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.scrb");
        let doc = sample_doc();
        let options = SaveOptions {
            password: Some("old".to_string()),
            ..Default::default()
        };
        write_document(&path, &doc, &options).await.unwrap();

        change_password(&path, "old", "new").await.unwrap();

        let err = read_document(&path, Some("old")).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Encryption(EncryptionError::AuthenticationFailed)
        ));
        let opened = read_document(&path, Some("new")).await.unwrap();
        assert_eq!(opened.document, doc);
    }

    #[tokio::test]
    async fn test_change_password_on_plain_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt");
        fs::write(&path, "just text").unwrap();

        let err = change_password(&path, "a", "b").await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Encryption(EncryptionError::CorruptFormat)
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), "just text");
    }

    #[tokio::test]
    async fn test_foreign_rtf_is_parsed_not_echoed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foreign.rtf");
        fs::write(
            &path,
            "{\\rtf1\\ansi{\\fonttbl{\\f0\\fswiss Times New Roman;}}{\\b Bold\\par}Plain\\par}",
        )
        .unwrap();

        let opened = read_document(&path, None).await.unwrap();
        assert_eq!(opened.document.to_plain_text(), "Bold\nPlain\n");
    }

    #[tokio::test]
    async fn test_non_markup_rtf_extension_degrades_to_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mislabeled.rtf");
        fs::write(&path, "plain content, wrong extension").unwrap();

        let opened = read_document(&path, None).await.unwrap();
        assert_eq!(opened.kind, FileKind::RichMarkup);
        assert_eq!(
            opened.document.to_plain_text(),
            "plain content, wrong extension\n"
        );
    }
}
