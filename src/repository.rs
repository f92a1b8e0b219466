//! Paste creation, lookup and listing on top of a [`Validator`] and a [`Store`].

use std::collections::HashSet;

use serde_json::Value;
use tracing::debug;

use crate::criteria::ListCriteria;
use crate::db::select::{Direction, Select};
use crate::db::{Store, TABLE};
use crate::error::{AppError, AppResult};
use crate::form::Validator;
use crate::models::{now_timestamp, Fields, PasteRow, PasteSummary, PasteView};

/// Pastes that have not expired at the bound time.
const ACTIVE: &str = "\"expires\" IS NULL OR \"expires\" = '' OR \"expires\" > ?";

const ROW_COLUMNS: &[&str] = &[
    "id", "type", "summary", "user", "content", "created", "expires", "parent",
];
const SUMMARY_COLUMNS: &[&str] = &["id", "type", "summary", "user", "created", "expires"];

#[derive(Debug, Clone, Copy)]
pub struct RepositoryOptions {
    /// How many ancestors `get` nests as full records. Past this depth the
    /// next ancestor is only checked for being active.
    pub max_parent_depth: usize,
}

impl Default for RepositoryOptions {
    fn default() -> Self {
        RepositoryOptions {
            max_parent_depth: 1,
        }
    }
}

pub struct PasteRepository<V, S> {
    form: V,
    store: S,
    options: RepositoryOptions,
}

impl<V: Validator, S: Store> PasteRepository<V, S> {
    pub fn new(form: V, store: S, options: RepositoryOptions) -> Self {
        PasteRepository {
            form,
            store,
            options,
        }
    }

    pub fn form(&self) -> &V {
        &self.form
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validate `data` and store it as a new paste, returning its id.
    ///
    /// Input grouped under the form's belongs-to key is unwrapped first.
    /// Rejected input inserts nothing.
    pub async fn add(&self, data: &Fields) -> AppResult<String> {
        let belongs_to = self.form.belongs_to();
        let data = nested(data, belongs_to);

        let values = self.form.validate(data).map_err(|errors| {
            debug!("paste rejected: {errors}");
            AppError::Rejected(errors)
        })?;

        self.store.insert(nested(&values, belongs_to)).await
    }

    /// Look up an active paste with its ancestry and active children.
    pub async fn get(&self, id: &str) -> AppResult<PasteView> {
        let now = now_timestamp();
        let root = self.find(id, &now).await?.ok_or(AppError::NotFound)?;

        // walk up from the paste, stopping at missing, expired or repeated ids
        let mut visited = HashSet::from([root.id.clone()]);
        let mut chain = vec![root];
        let mut dangling = false;
        loop {
            let Some(parent_id) = chain.last().and_then(parent_of) else {
                break;
            };
            if !visited.insert(parent_id.clone()) {
                debug!("cyclic parent '{parent_id}'");
                dangling = true;
                break;
            }
            let Some(parent) = self.find(&parent_id, &now).await? else {
                dangling = true;
                break;
            };
            if chain.len() > self.options.max_parent_depth {
                // only needed to know the last nested parent_id is live
                break;
            }
            chain.push(parent);
        }

        let mut view: Option<PasteView> = None;
        let depth = chain.len();
        for (i, row) in chain.into_iter().enumerate().rev() {
            let children = self.children(&row.id, &now).await?;
            let mut current = PasteView::new(row, children);
            if i == depth - 1 && dangling {
                current.parent_id = None;
            }
            current.parent = view.take().map(Box::new);
            view = Some(current);
        }
        view.ok_or(AppError::NotFound)
    }

    /// Active pastes, newest first unless `criteria` says otherwise.
    pub async fn fetch_active(
        &self,
        criteria: Option<&ListCriteria>,
    ) -> AppResult<Vec<PasteSummary>> {
        let select = Select::from(TABLE, SUMMARY_COLUMNS).filter(ACTIVE, [now_timestamp()]);
        let select = match criteria {
            Some(criteria) => self.refine(select, criteria).await?,
            None => select.order("created", Direction::Desc),
        };
        self.store.fetch_all(&select).await
    }

    /// Number of active pastes. Paging and sorting do not change it.
    pub async fn fetch_active_count(&self) -> AppResult<i64> {
        let select = Select::count(TABLE).filter(ACTIVE, [now_timestamp()]);
        self.store.fetch_one(&select).await
    }

    async fn refine(&self, mut select: Select, criteria: &ListCriteria) -> AppResult<Select> {
        if let Some(page) = criteria.page() {
            select = select.limit(page.count, page.start);
        }

        if let Some(order) = criteria.sort_order() {
            if self.store.columns().await?.contains(&order.column) {
                select = select.order(&order.column, order.direction);
            } else {
                debug!("ignoring sort on unknown column '{}'", order.column);
            }
        }

        if !select.is_ordered() {
            select = select.order("created", Direction::Desc);
        }
        Ok(select)
    }

    async fn find(&self, id: &str, now: &str) -> AppResult<Option<PasteRow>> {
        let select = Select::from(TABLE, ROW_COLUMNS)
            .filter("\"id\" = ?", [id])
            .filter(ACTIVE, [now]);
        self.store.fetch_row(&select).await
    }

    async fn children(&self, id: &str, now: &str) -> AppResult<Vec<String>> {
        let select = Select::from(TABLE, &["id"])
            .filter("\"parent\" = ?", [id])
            .filter(ACTIVE, [now])
            .order("created", Direction::Asc)
            .order("id", Direction::Asc);
        self.store.fetch_col(&select).await
    }
}

fn parent_of(row: &PasteRow) -> Option<String> {
    row.parent.clone().filter(|p| !p.is_empty())
}

/// The sub-map under `key`, if there is one.
fn nested<'a>(fields: &'a Fields, key: Option<&str>) -> &'a Fields {
    match key.and_then(|key| fields.get(key)) {
        Some(Value::Object(inner)) => inner,
        _ => fields,
    }
}
