use clap::Args;

use nestbin::ListCriteria;

use crate::App;

#[derive(Args)]
pub struct ListArgs {
    /// Offset of the first paste; only used together with --count.
    #[arg(long)]
    start: Option<String>,
    /// Page size; only used together with --start.
    #[arg(long)]
    count: Option<String>,
    /// Column to sort by, prefixed with `-` for descending order.
    #[arg(long, allow_hyphen_values = true)]
    sort: Option<String>,
}

pub async fn run(app: App, args: ListArgs) -> anyhow::Result<()> {
    let criteria = match args {
        ListArgs {
            start: None,
            count: None,
            sort: None,
        } => None,
        ListArgs { start, count, sort } => Some(ListCriteria { start, count, sort }),
    };

    let pastes = app.pastes.fetch_active(criteria.as_ref()).await?;
    println!("{}", serde_json::to_string_pretty(&pastes)?);
    Ok(())
}
