mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "scribe-cli", about = "Scribe document conversion and encryption CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum BodyArg {
    Plain,
    Rich,
}

#[derive(Subcommand)]
enum Command {
    /// Print a document as plain text or delta JSON
    Cat {
        /// Plain text, rich markup, or encrypted file
        file: PathBuf,
        /// Password for encrypted files
        #[arg(long)]
        password: Option<String>,
        /// Output format
        #[arg(long, default_value = "plain")]
        format: OutputFormat,
    },

    /// Convert a document; the output extension picks the target kind
    Convert {
        /// Source file
        input: PathBuf,
        /// Destination file (.txt, .rtf, or .scrb)
        output: PathBuf,
        /// Password for reading an encrypted source
        #[arg(long)]
        password: Option<String>,
        /// Password for writing an encrypted destination
        #[arg(long)]
        out_password: Option<String>,
        /// Serialization inside an encrypted destination
        #[arg(long, default_value = "rich")]
        body: BodyArg,
    },

    /// Change the password of an encrypted file
    Rekey {
        /// Encrypted file to re-seal
        file: PathBuf,
        /// Current password
        #[arg(long)]
        old_password: String,
        /// New password
        #[arg(long)]
        new_password: String,
    },

    /// Describe a file without decrypting it
    Inspect {
        /// File to examine
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Cat {
            file,
            password,
            format,
        } => {
            commands::cat::run(&file, password.as_deref(), &format).await?;
        }
        Command::Convert {
            input,
            output,
            password,
            out_password,
            body,
        } => {
            commands::convert::run(
                &input,
                &output,
                password.as_deref(),
                out_password.as_deref(),
                &body,
            )
            .await?;
        }
        Command::Rekey {
            file,
            old_password,
            new_password,
        } => {
            commands::rekey::run(&file, &old_password, &new_password).await?;
        }
        Command::Inspect { file } => {
            commands::inspect::run(&file)?;
        }
    }

    Ok(())
}
