//! A small SELECT builder.
//!
//! Predicates are written with `?` placeholders and rendered for the backend
//! in use. Identifiers are always double-quoted, since `user` is reserved on
//! Postgres.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// How bind parameters are spelled in the rendered SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholders {
    /// `?` (SQLite, MySQL)
    Question,
    /// `$1`, `$2`, ... (Postgres)
    Numbered,
}

impl Placeholders {
    /// The marker for the `n`th parameter, counting from 1.
    pub fn nth(self, n: usize) -> String {
        match self {
            Placeholders::Question => "?".to_owned(),
            Placeholders::Numbered => format!("${n}"),
        }
    }
}

#[derive(Debug, Clone)]
enum Projection {
    Columns(Vec<String>),
    Count,
}

#[derive(Debug, Clone)]
pub struct Select {
    table: String,
    projection: Projection,
    filters: Vec<(String, Vec<String>)>,
    order: Vec<(String, Direction)>,
    limit: Option<(u64, u64)>,
}

impl Select {
    pub fn from(table: &str, columns: &[&str]) -> Self {
        Self::new(
            table,
            Projection::Columns(columns.iter().map(|c| c.to_string()).collect()),
        )
    }

    /// `SELECT COUNT(*) AS "count"`
    pub fn count(table: &str) -> Self {
        Self::new(table, Projection::Count)
    }

    fn new(table: &str, projection: Projection) -> Self {
        Select {
            table: table.to_owned(),
            projection,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    /// Add a predicate, AND-ed with the others. Each `?` in `predicate` takes
    /// the next value of `params`.
    ///
    /// # Panics
    ///
    /// If the number of `?` in `predicate` differs from the number of params.
    pub fn filter<I, P>(mut self, predicate: &str, params: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        let params: Vec<String> = params.into_iter().map(Into::into).collect();
        let marks = predicate.matches('?').count();
        assert_eq!(
            marks,
            params.len(),
            "{predicate:?} has {marks} placeholders but {} params",
            params.len()
        );
        self.filters.push((predicate.to_owned(), params));
        self
    }

    pub fn order(mut self, column: &str, direction: Direction) -> Self {
        self.order.push((column.to_owned(), direction));
        self
    }

    pub fn limit(mut self, count: u64, offset: u64) -> Self {
        self.limit = Some((count, offset));
        self
    }

    pub fn is_ordered(&self) -> bool {
        !self.order.is_empty()
    }

    /// Render to SQL text and its parameters in bind order.
    pub fn render(&self, placeholders: Placeholders) -> (String, Vec<&str>) {
        let mut sql = String::from("SELECT ");
        match &self.projection {
            Projection::Columns(columns) => {
                let columns: Vec<String> = columns.iter().map(|c| quote(c)).collect();
                sql.push_str(&columns.join(", "));
            }
            Projection::Count => sql.push_str("COUNT(*) AS \"count\""),
        }
        sql.push_str(" FROM ");
        sql.push_str(&quote(&self.table));

        let mut params = Vec::new();
        for (i, (predicate, values)) in self.filters.iter().enumerate() {
            sql.push_str(if i == 0 { " WHERE (" } else { " AND (" });
            // `filter` checked that every `?` has a value
            let mut values = values.iter();
            for c in predicate.chars() {
                if c != '?' {
                    sql.push(c);
                } else if let Some(value) = values.next() {
                    params.push(value.as_str());
                    sql.push_str(&placeholders.nth(params.len()));
                }
            }
            sql.push(')');
        }

        if !self.order.is_empty() {
            let order: Vec<String> = self
                .order
                .iter()
                .map(|(column, direction)| format!("{} {}", quote(column), direction.as_sql()))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.join(", "));
        }

        if let Some((count, offset)) = self.limit {
            sql.push_str(&format!(" LIMIT {count} OFFSET {offset}"));
        }

        (sql, params)
    }
}

pub(crate) fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACTIVE: &str = "\"expires\" IS NULL OR \"expires\" = '' OR \"expires\" > ?";

    #[test]
    fn renders_question_placeholders() {
        let select = Select::from("paste", &["id", "user"])
            .filter("\"id\" = ?", ["abc"])
            .filter(ACTIVE, ["2023-01-01 00:00:00"])
            .order("created", Direction::Desc);
        let (sql, params) = select.render(Placeholders::Question);
        assert_eq!(
            sql,
            "SELECT \"id\", \"user\" FROM \"paste\" WHERE (\"id\" = ?) AND (\"expires\" IS NULL OR \
             \"expires\" = '' OR \"expires\" > ?) ORDER BY \"created\" DESC"
        );
        assert_eq!(params, ["abc", "2023-01-01 00:00:00"]);
    }

    #[test]
    fn renders_numbered_placeholders_in_bind_order() {
        let select = Select::from("paste", &["id"])
            .filter("\"parent\" = ?", ["p"])
            .filter(ACTIVE, ["now"]);
        let (sql, params) = select.render(Placeholders::Numbered);
        assert!(sql.contains("\"parent\" = $1"));
        assert!(sql.ends_with("\"expires\" > $2)"));
        assert_eq!(params, ["p", "now"]);
    }

    #[test]
    fn renders_count_and_limit() {
        let select = Select::count("paste").limit(5, 2);
        assert!(!select.is_ordered());
        let (sql, params) = select.render(Placeholders::Question);
        assert_eq!(sql, "SELECT COUNT(*) AS \"count\" FROM \"paste\" LIMIT 5 OFFSET 2");
        assert!(params.is_empty());
    }

    #[test]
    #[should_panic(expected = "has 2 placeholders but 1 params")]
    fn filter_rejects_missing_params() {
        let _ = Select::from("paste", &["id"]).filter("\"id\" = ? OR \"parent\" = ?", ["abc"]);
    }

    #[test]
    #[should_panic(expected = "has 0 placeholders but 1 params")]
    fn filter_rejects_extra_params() {
        let _ = Select::from("paste", &["id"]).filter("\"expires\" IS NULL", ["now"]);
    }

    #[test]
    fn quotes_embedded_quotes() {
        assert_eq!(quote("we\"ird"), "\"we\"\"ird\"");
    }
}
