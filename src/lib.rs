//! Storage and retrieval of pastes: validated creation, lookup with parent
//! and child links, and listings of pastes that have not expired.

pub mod config;
pub mod criteria;
pub mod db;
pub mod error;
pub mod form;
pub mod keys;
pub mod models;
pub mod repository;

pub use config::Config;
pub use criteria::ListCriteria;
pub use db::{Database, Store};
pub use error::{AppError, AppResult};
pub use form::{PasteForm, ValidationErrors, Validator};
pub use models::{Fields, PasteSummary, PasteView};
pub use repository::{PasteRepository, RepositoryOptions};
