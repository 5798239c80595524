//! Revision and approval workflow engine for handbook articles.
//!
//! This crate has no storage or transport dependencies. The `db` crate
//! plugs PostgreSQL in behind [`store::VersionedRecordStore`].

pub mod article;
pub mod error;
pub mod lookup;
pub mod state_machine;
pub mod store;
pub mod types;
pub mod workflow;

pub use article::{Article, ArticleFilter, ArticleInput, ArticleStatus, EditorClaim, NewArticle};
pub use error::CoreError;
pub use lookup::LookupResolver;
pub use store::{MemoryArticleStore, VersionedRecordStore};
pub use workflow::WorkflowService;
