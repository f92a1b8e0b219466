//! Paging and ordering requests for active paste listings.

use serde::{Deserialize, Deserializer};

use crate::db::select::Direction;

/// Optional refinements for a listing. Values arrive from user input, so
/// numbers are kept as text until they are checked.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListCriteria {
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub start: Option<String>,
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub count: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub count: u64,
    pub start: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOrder {
    pub column: String,
    pub direction: Direction,
}

impl ListCriteria {
    /// The requested page, if both bounds are plain non-negative integers.
    pub fn page(&self) -> Option<Page> {
        let start = parse_exact(self.start.as_deref()?)?;
        let count = parse_exact(self.count.as_deref()?)?;
        Some(Page { count, start })
    }

    /// The requested order. A leading `-` sorts descending. The column is not
    /// checked against the table here.
    pub fn sort_order(&self) -> Option<SortOrder> {
        let sort = self.sort.as_deref()?;
        let (column, direction) = match sort.strip_prefix('-') {
            Some(column) => (column, Direction::Desc),
            None => (sort, Direction::Asc),
        };
        Some(SortOrder {
            column: column.to_owned(),
            direction,
        })
    }
}

/// Values past `i64::MAX` are rejected: neither SQLite nor Postgres takes a
/// larger `LIMIT` or `OFFSET`.
fn parse_exact(value: &str) -> Option<u64> {
    // `i64::from_str` accepts a leading `+` or `-`
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: i64 = value.parse().ok()?;
    u64::try_from(value).ok()
}

fn scalar_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_json::Value;

    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn criteria(value: serde_json::Value) -> ListCriteria {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn page_needs_both_bounds() {
        assert_eq!(
            criteria(json!({ "start": 2, "count": 5 })).page(),
            Some(Page { count: 5, start: 2 })
        );
        assert_eq!(
            criteria(json!({ "start": "0", "count": "10" })).page(),
            Some(Page { count: 10, start: 0 })
        );
        assert_eq!(criteria(json!({ "start": 2 })).page(), None);
        assert_eq!(criteria(json!({ "count": 5 })).page(), None);
    }

    #[test]
    fn page_rejects_inexact_numbers() {
        let starts = [
            json!("abc"),
            json!("2.5"),
            json!(2.5),
            json!(-1),
            json!(" 2"),
            json!("+2"),
            json!(""),
            json!("9223372036854775808"),
            json!("18446744073709551615"),
        ];
        for start in starts {
            let c = criteria(json!({ "start": start, "count": 5 }));
            assert_eq!(c.page(), None, "start = {:?}", c.start);
        }
        assert_eq!(criteria(json!({ "start": 0, "count": "5x" })).page(), None);
        assert_eq!(
            criteria(json!({ "start": 0, "count": "9223372036854775808" })).page(),
            None
        );
    }

    #[test]
    fn page_accepts_the_largest_sql_integer() {
        assert_eq!(
            criteria(json!({ "start": 0, "count": "9223372036854775807" })).page(),
            Some(Page {
                count: i64::MAX as u64,
                start: 0
            })
        );
    }

    #[test]
    fn sort_direction_from_prefix() {
        let order = criteria(json!({ "sort": "-created" })).sort_order().unwrap();
        assert_eq!(order.column, "created");
        assert_eq!(order.direction, Direction::Desc);

        let order = criteria(json!({ "sort": "user" })).sort_order().unwrap();
        assert_eq!(order.column, "user");
        assert_eq!(order.direction, Direction::Asc);

        assert_eq!(ListCriteria::default().sort_order(), None);
    }
}
