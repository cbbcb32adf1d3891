//! Pipeline orchestrator: question in, one immutable `Outcome` out.
//!
//! Synthesizing → Executing → Explaining, strictly in order. A failed stage
//! terminates the run as typed data; nothing here retries, re-enters a
//! stage, or patches a generated statement. Each run is independent — the
//! assistant holds no session memory.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, warn};

use crate::executor::{ExecutionError, QueryExecutor};
use crate::gateway::{CompletionGateway, GatewayError, ModelGateway};
use crate::insight::explain_result;
use crate::prompts::Language;
use crate::schema::TimeWindow;
use crate::sqlgen::synthesize_query;

/// Stage a run failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Synthesize,
    Execute,
    Explain,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Synthesize => "synthesize",
            Stage::Execute => "execute",
            Stage::Explain => "explain",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal artifact of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum Outcome {
    Answered {
        explanation: String,
        /// Model that produced the explanation. `None` only for the
        /// zero-row short-circuit, where no model wrote the text.
        model: Option<String>,
        sql: String,
        row_count: usize,
    },
    Failed {
        stage: Stage,
        reason: String,
        /// Present from the synthesis stage onward, so a degraded result
        /// can still show what was executed.
        sql: Option<String>,
        /// Present once execution succeeded.
        row_count: Option<usize>,
    },
}

impl Outcome {
    pub fn is_answered(&self) -> bool {
        matches!(self, Outcome::Answered { .. })
    }
}

/// The analytics assistant: the one operation the presentation layer calls.
pub struct Assistant {
    gateway: Arc<dyn CompletionGateway>,
    executor: QueryExecutor,
}

impl Assistant {
    pub fn new(gateway: Arc<dyn CompletionGateway>, executor: QueryExecutor) -> Self {
        Self { gateway, executor }
    }

    /// Build the production assistant from process configuration.
    ///
    /// A missing API key fails here, before any network call is attempted.
    pub fn from_env(executor: QueryExecutor) -> Result<Self, GatewayError> {
        let gateway = ModelGateway::from_env()?;
        Ok(Self::new(Arc::new(gateway), executor))
    }

    /// Run the full pipeline for one question.
    pub async fn answer(&self, question: &str, window: TimeWindow, language: Language) -> Outcome {
        let today = Utc::now().date_naive();

        debug!(window_days = window.days(), "synthesizing query");
        let query = match synthesize_query(self.gateway.as_ref(), question, window, today).await {
            Ok(q) => q,
            Err(e) => {
                warn!(stage = %Stage::Synthesize, error = %e, "pipeline failed");
                return Outcome::Failed {
                    stage: Stage::Synthesize,
                    reason: e.to_string(),
                    sql: None,
                    row_count: None,
                };
            }
        };

        debug!(model = %query.model, "executing generated statement");
        let result = match self.executor.run(&query).await {
            Ok(r) => r,
            Err(ExecutionError::NoRows) => {
                debug!("query matched no rows, skipping insight step");
                return Outcome::Answered {
                    explanation: language.no_data_message().to_string(),
                    model: None,
                    sql: query.sql,
                    row_count: 0,
                };
            }
            Err(e) => {
                warn!(stage = %Stage::Execute, error = %e, "pipeline failed");
                return Outcome::Failed {
                    stage: Stage::Execute,
                    reason: e.to_string(),
                    sql: Some(query.sql),
                    row_count: None,
                };
            }
        };

        debug!(rows = result.row_count(), "explaining result");
        match explain_result(self.gateway.as_ref(), question, &result, language).await {
            Ok(insight) => Outcome::Answered {
                explanation: insight.text,
                model: Some(insight.model),
                sql: query.sql,
                row_count: result.row_count(),
            },
            Err(e) => {
                warn!(stage = %Stage::Explain, error = %e, "pipeline degraded");
                Outcome::Failed {
                    stage: Stage::Explain,
                    reason: e.to_string(),
                    sql: Some(query.sql),
                    row_count: Some(result.row_count()),
                }
            }
        }
    }
}
