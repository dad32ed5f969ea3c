//! Core data types for the pipeline.
//!
//! Defines the values passed between stages:
//! - `SchemaSnapshot`: schema text and table names for one question
//! - `ExecutableQuery`: terminated SQL ready for execution
//! - `RowSet` / `Answer`: what a question produces
//! - `AskError`: error types for all operations

pub mod error;
pub mod query;

pub use error::{AskError, Result};
pub use query::{
    cell_text, Answer, ExecutableQuery, RowSet, SchemaSnapshot, SynthesisRequest, ALL_TABLES_SENTINEL,
};
