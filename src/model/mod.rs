//! Data models for Paprika.
//!
//! - Article (persisted row)
//! - NewArticle (validated write payload)
//! - KeyScheme (slug vs file-path identity)
//! - DeleteMode (soft vs hard delete)

pub mod article;

pub use article::{
    Article, DeleteMode, FILE_HASH_LEN, Frontmatter, KeyScheme, MAX_FILE_PATH_LEN, MAX_SLUG_LEN,
    MAX_TITLE_LEN, NewArticle, from_millis, parse_file_date,
};
