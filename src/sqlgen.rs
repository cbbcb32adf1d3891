//! Query synthesizer: free-text question → one read-only SQL statement.

use chrono::NaiveDate;
use thiserror::Error;

use crate::gateway::{CompletionGateway, GatewayError};
use crate::prompts::{sql_generation_prompt, strip_code_fences};
use crate::schema::TimeWindow;

/// A generated statement plus the model that produced it. Created per
/// pipeline run and discarded after execution; never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedQuery {
    pub sql: String,
    pub model: String,
}

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The model answered, but nothing was left after cleanup.
    #[error("model {model} returned an empty statement")]
    EmptyCompletion { model: String },
}

/// Build the schema-grounded prompt, call the gateway once, and sanitize the
/// completion into a single executable statement.
///
/// The statement's grammar is deliberately not validated here; the executor
/// and the store's own permissions are the enforcement points.
pub async fn synthesize_query(
    gateway: &dyn CompletionGateway,
    question: &str,
    window: TimeWindow,
    today: NaiveDate,
) -> Result<GeneratedQuery, SynthesisError> {
    let prompt = sql_generation_prompt(question, window.lower_bound(today));
    let completion = gateway.generate(&prompt).await?;

    let sql = strip_code_fences(&completion.text);
    if sql.is_empty() {
        return Err(SynthesisError::EmptyCompletion {
            model: completion.model,
        });
    }

    Ok(GeneratedQuery {
        sql,
        model: completion.model,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Completion;
    use async_trait::async_trait;

    struct FixedGateway(&'static str);

    #[async_trait]
    impl CompletionGateway for FixedGateway {
        async fn generate(&self, _prompt: &str) -> Result<Completion, GatewayError> {
            Ok(Completion {
                text: self.0.to_string(),
                model: "test-model".to_string(),
            })
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    #[tokio::test]
    async fn fenced_completion_is_cleaned() {
        let gateway = FixedGateway("```sql\nSELECT date FROM sales_traffic_report LIMIT 50\n```");
        let query = synthesize_query(&gateway, "q", TimeWindow::Days7, today())
            .await
            .unwrap();
        assert_eq!(query.sql, "SELECT date FROM sales_traffic_report LIMIT 50");
        assert_eq!(query.model, "test-model");
        assert!(!query.sql.contains("```"));
    }

    #[tokio::test]
    async fn blank_after_cleanup_is_its_own_failure() {
        let gateway = FixedGateway("```\n```");
        let err = synthesize_query(&gateway, "q", TimeWindow::Days7, today())
            .await
            .unwrap_err();
        assert!(matches!(err, SynthesisError::EmptyCompletion { .. }));
    }
}
