use std::path::Path;

use anyhow::Result;

use scribe_lib::storage::read_document;

use crate::OutputFormat;

pub async fn run(file: &Path, password: Option<&str>, format: &OutputFormat) -> Result<()> {
    let opened = read_document(file, password).await?;

    match format {
        OutputFormat::Plain => print!("{}", opened.document.to_plain_text()),
        OutputFormat::Json => println!("{}", opened.document.to_delta_json()?),
    }

    Ok(())
}
