//! # Statement Builders Module
//!
//! The four fluent statement builders. Each one accumulates validated
//! options, renders its SQL exactly once through the
//! [`crate::sql_builder::SqlBuilder`] and executes it on the connection it
//! was given — a pooled connection when obtained from a
//! [`crate::Repository`], the transaction's connection when obtained from a
//! [`crate::Transaction`].

pub mod delete;
pub mod insert;
pub mod select;
pub mod update;

pub use delete::Delete;
pub use insert::Insert;
pub use select::Select;
pub use update::Update;
