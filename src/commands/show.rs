use anyhow::bail;

use nestbin::AppError;

use crate::App;

pub async fn run(app: App, id: &str) -> anyhow::Result<()> {
    match app.pastes.get(id).await {
        Ok(paste) => {
            println!("{}", serde_json::to_string_pretty(&paste)?);
            Ok(())
        }
        Err(AppError::NotFound) => bail!("no active paste with id '{id}'"),
        Err(error) => Err(error.into()),
    }
}
