use std::path::Path;

use anyhow::{bail, Result};

use scribe_lib::storage::{read_document, write_document, BodyFormat, FileKind, SaveOptions};

use crate::BodyArg;

pub async fn run(
    input: &Path,
    output: &Path,
    password: Option<&str>,
    out_password: Option<&str>,
    body: &BodyArg,
) -> Result<()> {
    if FileKind::from_path(output) == FileKind::Encrypted && out_password.is_none() {
        bail!("Writing an encrypted file requires --out-password");
    }

    let opened = read_document(input, password).await?;

    let options = SaveOptions {
        password: out_password.map(str::to_string),
        encrypted_body: match body {
            BodyArg::Plain => BodyFormat::Plain,
            BodyArg::Rich => BodyFormat::Rich,
        },
    };
    write_document(output, &opened.document, &options).await?;

    println!("Converted {} -> {}", input.display(), output.display());
    Ok(())
}
