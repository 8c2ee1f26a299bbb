use std::fs;
use std::path::Path;

use anyhow::Result;

use scribe_lib::encryption::{container_info, is_container};
use scribe_lib::storage::FileKind;

pub fn run(file: &Path) -> Result<()> {
    let bytes = fs::read(file)?;

    if is_container(&bytes) {
        let info = container_info(&bytes)?;
        println!("kind: encrypted container");
        println!("version: {}", info.version);
        println!("authenticated: {}", info.authenticated);
        println!("iv: {}", info.iv);
        println!("salt: {}", info.salt);
        println!("ciphertext: {} bytes", info.ciphertext_len);
        return Ok(());
    }

    let kind = match FileKind::from_path(file) {
        FileKind::PlainText => "plain text",
        FileKind::RichMarkup => "rich markup",
        FileKind::Encrypted => "encrypted container (invalid header)",
    };
    println!("kind: {}", kind);
    println!("size: {} bytes", bytes.len());
    Ok(())
}
