#![forbid(unsafe_code)]

//! # asinsight
//!
//! Natural-language analytics assistant for the Amazon sales & traffic
//! fact table.
//!
//! One question goes in; a generative model turns it into a single read-only
//! SQL statement grounded in the fixed table schema; the statement runs
//! against the analytical store under row and time caps; a second model call
//! explains the rows that came back. The answer carries provenance (which
//! model produced it) and every failure is typed data, never a crash.
//!
//! The generated SQL is treated as hostile input: a textual read-only gate,
//! a read-only store connection, and a single-table database each stand
//! between the model and the data.

pub mod executor;
pub mod gateway;
pub mod insight;
pub mod pipeline;
pub mod prompts;
pub mod schema;
pub mod sqlgen;

pub use executor::{CellValue, ExecutionError, QueryExecutor, QueryResult};
pub use gateway::{
    CandidateModels, Completion, CompletionGateway, GatewayError, GeminiClient, ModelGateway,
    ProviderError,
};
pub use insight::{explain_result, ExplanationError, Insight};
pub use pipeline::{Assistant, Outcome, Stage};
pub use prompts::Language;
pub use schema::{TimeWindow, FACT_TABLE, RESULT_ROW_CAP};
pub use sqlgen::{synthesize_query, GeneratedQuery, SynthesisError};
