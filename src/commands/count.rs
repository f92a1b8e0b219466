use crate::App;

pub async fn run(app: App) -> anyhow::Result<()> {
    println!("{}", app.pastes.fetch_active_count().await?);
    Ok(())
}
