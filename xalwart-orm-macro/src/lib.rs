//! # xalwart ORM Procedural Macros
//!
//! This crate provides the `#[derive(Model)]` macro for xalwart-orm. It is
//! re-exported by the main crate and not meant to be used directly.
//!
//! ## Supported Attributes
//!
//! ### Table name
//! ```rust,ignore
//! #[derive(Model, Debug, Clone, Default)]
//! #[orm(table = "persons")]
//! struct Person { /* ... */ }
//! ```
//! Overrides the table name. The default is the snake_case of the struct
//! name (`PersonProfile` becomes `person_profile`).
//!
//! ### Primary key
//! ```rust,ignore
//! #[orm(primary_key)]
//! id: i64,
//! ```
//! Marks the field as the primary key. Exactly one field per model must
//! carry this attribute.
//!
//! ### Keeping the primary key in write statements
//! ```rust,ignore
//! #[derive(Model, Debug, Clone, Default)]
//! #[orm(include_pk)]
//! struct Person { /* ... */ }
//! ```
//! By default the primary key is omitted from `INSERT` column lists and
//! `UPDATE` SET lists (`OMIT_PK = true`); `include_pk` flips that for the
//! record type.
//!
//! ### Non-column fields
//! ```rust,ignore
//! #[orm(skip)]
//! cars: Vec<Car>,
//! ```
//! Excludes the field from the column set entirely. Relation containers
//! filled by `one_to_many`/`many_to_one`/`many_to_many` hooks go here.
//!
//! ## Generated Items
//!
//! Besides the `Model` implementation, the macro generates a
//! `{model}_cols` module with one typed
//! `xalwart_orm::Column<Model, FieldType>` constant per field, named after
//! the field in upper case:
//!
//! ```rust,ignore
//! use person_cols as cols;
//!
//! let cond = cols::AGE.ge(18) & cols::NAME.like("J%");
//! ```
//!
//! The model struct itself must implement `Default`; result rows
//! materialise by assigning parsed cells onto a default-constructed value,
//! and `NULL` cells leave the default in place.

// ============================================================================
// External Crate Imports
// ============================================================================

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

// ============================================================================
// Module Declarations
// ============================================================================

/// Implementation of the `Model` derive expansion.
mod derive_model;

// ============================================================================
// Macro Definitions
// ============================================================================

/// Derives the `Model` trait and the typed column-reference module.
#[proc_macro_derive(Model, attributes(orm))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    derive_model::expand(ast).into()
}
