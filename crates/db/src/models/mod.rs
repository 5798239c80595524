//! Database row models.
//!
//! Rows are decoded with `FromRow` and converted into the domain types of
//! `handbook_core`, rejecting values the schema should never contain.

pub mod article;

pub use article::ArticleRow;
