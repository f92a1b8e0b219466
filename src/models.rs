use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Raw or normalized paste input, keyed by field name.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Storage format for `created` and `expires`. Fixed width, so text order is
/// chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

pub fn now_timestamp() -> String {
    format_timestamp(&Utc::now())
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PasteRow {
    pub id: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub summary: String,
    pub user: String,
    pub content: String,
    pub created: String,
    pub expires: Option<String>,
    pub parent: Option<String>,
}

/// The projection used by active paste listings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PasteSummary {
    pub id: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub summary: String,
    pub user: String,
    pub created: String,
    pub expires: Option<String>,
}

/// A paste as returned by lookup, with its ancestry and active children.
#[derive(Debug, Clone, Serialize)]
pub struct PasteView {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub summary: String,
    pub user: String,
    pub content: String,
    pub created: String,
    pub expires: Option<String>,
    /// Only set while the referenced paste is active.
    pub parent_id: Option<String>,
    pub parent: Option<Box<PasteView>>,
    pub children: Vec<String>,
}

impl PasteView {
    pub fn new(row: PasteRow, children: Vec<String>) -> Self {
        PasteView {
            id: row.id,
            kind: row.kind,
            summary: row.summary,
            user: row.user,
            content: row.content,
            created: row.created,
            expires: row.expires,
            parent_id: row.parent.filter(|p| !p.is_empty()),
            parent: None,
            children,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn timestamps_sort_as_text() {
        let early = Utc.with_ymd_and_hms(2023, 9, 30, 23, 59, 59).unwrap();
        let late = Utc.with_ymd_and_hms(2023, 10, 1, 0, 0, 0).unwrap();
        assert_eq!(format_timestamp(&early), "2023-09-30 23:59:59");
        assert!(format_timestamp(&early) < format_timestamp(&late));
    }

    #[test]
    fn empty_parent_is_no_parent() {
        let row = PasteRow {
            id: "abc".into(),
            kind: "text".into(),
            summary: String::new(),
            user: String::new(),
            content: "hi".into(),
            created: "2023-01-01 00:00:00".into(),
            expires: None,
            parent: Some(String::new()),
        };
        assert_eq!(PasteView::new(row, vec![]).parent_id, None);
    }
}
