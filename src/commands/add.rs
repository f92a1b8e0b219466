use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Args;
use serde_json::Value;
use tokio::io::AsyncReadExt;
use tokio::{fs, io};
use tracing::info;

use nestbin::{AppError, Fields};

use crate::App;

#[derive(Args)]
pub struct AddArgs {
    /// File holding the paste content; stdin when omitted.
    file: Option<PathBuf>,
    #[arg(long = "type")]
    kind: Option<String>,
    #[arg(long)]
    summary: Option<String>,
    #[arg(long)]
    user: Option<String>,
    /// Lifetime in seconds, or `never`.
    #[arg(long)]
    expires: Option<String>,
    /// Id of the paste this one follows up on.
    #[arg(long)]
    parent: Option<String>,
}

pub async fn run(app: App, args: AddArgs) -> anyhow::Result<()> {
    let content = match &args.file {
        Some(path) => fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut content = String::new();
            io::stdin()
                .read_to_string(&mut content)
                .await
                .context("failed to read stdin")?;
            content
        }
    };

    let mut fields = Fields::new();
    fields.insert("content".into(), Value::String(content));
    for (name, value) in [
        ("type", args.kind),
        ("summary", args.summary),
        ("user", args.user),
        ("expires", args.expires),
        ("parent", args.parent),
    ] {
        if let Some(value) = value {
            fields.insert(name.into(), Value::String(value));
        }
    }

    // submit the way a grouped form would
    if let Some(key) = &app.config.form.belongs_to {
        fields = Fields::from_iter([(key.clone(), Value::Object(fields))]);
    }

    match app.pastes.add(&fields).await {
        Ok(id) => {
            info!("stored paste '{id}'");
            println!("{id}");
            Ok(())
        }
        Err(AppError::Rejected(errors)) => {
            eprintln!("{}", serde_json::to_string_pretty(&errors)?);
            bail!("paste rejected: {errors}")
        }
        Err(error) => Err(error.into()),
    }
}
