//! Insight synthesizer: executed rows → grounded natural-language answer.

use thiserror::Error;

use crate::executor::QueryResult;
use crate::gateway::{CompletionGateway, GatewayError};
use crate::prompts::{insight_prompt, Language};

/// Rows included in the insight prompt. The prompt payload is size-bounded
/// and model cost/latency scales with it, so anything beyond this is
/// replaced by a truncation note stating the true total.
pub const RENDERED_ROW_LIMIT: usize = 30;

/// The explanation plus the model that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insight {
    pub text: String,
    pub model: String,
}

#[derive(Debug, Error)]
pub enum ExplanationError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Render the result as a bounded textual table for the prompt.
pub fn render_result_table(result: &QueryResult) -> String {
    let mut lines = Vec::with_capacity(result.rows.len().min(RENDERED_ROW_LIMIT) + 2);
    lines.push(result.columns.join(" | "));

    for row in result.rows.iter().take(RENDERED_ROW_LIMIT) {
        lines.push(
            row.iter()
                .map(|cell| cell.to_string())
                .collect::<Vec<_>>()
                .join(" | "),
        );
    }

    if result.rows.len() > RENDERED_ROW_LIMIT {
        lines.push(format!(
            "(showing first {} of {} rows)",
            RENDERED_ROW_LIMIT,
            result.rows.len()
        ));
    }

    lines.join("\n")
}

/// Build the insight prompt and make the second, independent gateway call.
///
/// The candidate roster is the same one the query synthesizer used; which
/// candidate survives may differ between the two calls.
pub async fn explain_result(
    gateway: &dyn CompletionGateway,
    question: &str,
    result: &QueryResult,
    language: Language,
) -> Result<Insight, ExplanationError> {
    let table = render_result_table(result);
    let prompt = insight_prompt(question, &result.sql, &table, language);
    let completion = gateway.generate(&prompt).await?;

    Ok(Insight {
        text: completion.text,
        model: completion.model,
    })
}
