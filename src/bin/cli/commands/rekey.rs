use std::path::Path;

use anyhow::Result;

use scribe_lib::storage::change_password;

pub async fn run(file: &Path, old_password: &str, new_password: &str) -> Result<()> {
    change_password(file, old_password, new_password).await?;
    println!("Password changed for {}", file.display());
    Ok(())
}
