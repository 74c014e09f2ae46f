//! # Model Derive Macro Implementation
//!
//! Expands `#[derive(Model)]`: builds the column descriptor table with one
//! literal-rendering getter and one cell-parsing setter per field, and the
//! `{model}_cols` module of typed column references.

// ============================================================================
// External Crate Imports
// ============================================================================

use heck::ToSnakeCase;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields};

// ============================================================================
// Macro Expansion Function
// ============================================================================

/// Expands the `#[derive(Model)]` macro.
pub fn expand(ast: DeriveInput) -> TokenStream {
    let struct_name = &ast.ident;

    // Ensure input is a struct with named fields
    let fields = if let Data::Struct(data) = &ast.data {
        if let Fields::Named(fields) = &data.fields {
            fields
        } else {
            panic!("Model must have named fields");
        }
    } else {
        panic!("Model must be a struct")
    };

    // ========================================================================
    // Parse Struct-Level Attributes
    // ========================================================================

    let mut table_name = struct_name.to_string().to_snake_case();
    let mut include_pk = false;

    for attr in &ast.attrs {
        if attr.path().is_ident("orm") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("table") {
                    let value: syn::LitStr = meta.value()?.parse()?;
                    table_name = value.value();
                }
                if meta.path.is_ident("include_pk") {
                    include_pk = true;
                }
                Ok(())
            })
            .expect("Failed to parse orm attributes");
        }
    }

    let omit_pk = !include_pk;

    // ========================================================================
    // Generate Column Descriptors
    // ========================================================================

    let mut pk_count = 0usize;
    let mut pk_name = String::new();

    // Fields marked #[orm(skip)] are not columns: relation containers and
    // other derived values live there, untouched by row materialisation.
    let column_fields: Vec<_> = fields
        .named
        .iter()
        .filter(|f| {
            let mut skip = false;
            for attr in &f.attrs {
                if attr.path().is_ident("orm") {
                    attr.parse_nested_meta(|meta| {
                        if meta.path.is_ident("skip") {
                            skip = true;
                        }
                        Ok(())
                    })
                    .expect("Failed to parse orm attributes");
                }
            }
            !skip
        })
        .collect();

    let column_defs = column_fields
        .iter()
        .map(|f| {
            let field_name = f.ident.as_ref().expect("named field");
            // Strip the "r#" prefix if present (for Rust keywords used as
            // field names)
            let column_name = field_name.to_string().trim_start_matches("r#").to_string();

            let mut is_primary_key = false;
            for attr in &f.attrs {
                if attr.path().is_ident("orm") {
                    attr.parse_nested_meta(|meta| {
                        if meta.path.is_ident("primary_key") {
                            is_primary_key = true;
                        }
                        Ok(())
                    })
                    .expect("Failed to parse orm attributes");
                }
            }

            if is_primary_key {
                pk_count += 1;
                pk_name = column_name.clone();
            }

            quote! {
                xalwart_orm::ColumnMeta {
                    name: #column_name,
                    primary_key: #is_primary_key,
                    get: |model| xalwart_orm::ToSqlLiteral::to_sql_literal(&model.#field_name),
                    set: |model, text| {
                        model.#field_name = xalwart_orm::FromSqlText::from_sql_text(text)?;
                        Ok(())
                    },
                }
            }
        })
        .collect::<Vec<_>>();

    if pk_count != 1 {
        panic!(
            "Model '{struct_name}' must have exactly one #[orm(primary_key)] field, found {pk_count}"
        );
    }

    // ========================================================================
    // Generate Typed Column Constants
    // ========================================================================

    let cols_module = format_ident!("{}_cols", struct_name.to_string().to_snake_case());
    let column_constants = column_fields.iter().map(|f| {
        let field_name = f.ident.as_ref().expect("named field");
        let field_type = &f.ty;
        let column_name = field_name.to_string().trim_start_matches("r#").to_string();
        let const_name = format_ident!(
            "{}",
            column_name.to_uppercase(),
            span = field_name.span()
        );
        quote! {
            pub const #const_name: xalwart_orm::Column<#struct_name, #field_type> =
                xalwart_orm::Column::new(#column_name);
        }
    });

    // ========================================================================
    // Generate Complete Model Implementation
    // ========================================================================

    quote! {
        impl xalwart_orm::Model for #struct_name {
            const TABLE_NAME: &'static str = #table_name;
            const OMIT_PK: bool = #omit_pk;

            fn columns() -> Vec<xalwart_orm::ColumnMeta<Self>> {
                vec![#(#column_defs),*]
            }

            fn pk_name() -> &'static str {
                #pk_name
            }
        }

        /// Typed column references for the model, named after its fields in
        /// upper case. Use with the query DSL:
        ///
        /// ```rust,ignore
        /// use person_cols as cols;
        /// let cond = cols::AGE.ge(18);
        /// ```
        pub mod #cols_module {
            use super::*;

            #(#column_constants)*
        }
    }
}
