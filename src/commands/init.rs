use tracing::info;

use crate::App;

pub async fn run(app: App) -> anyhow::Result<()> {
    app.database.create_schema().await?;
    info!("paste table ready");
    Ok(())
}
