//! Prompt builders for the two gateway call sites.
//!
//! The SQL-generation prompt is schema-grounded; the insight prompt is
//! schema-free and carries the executed statement plus its rows. Both are
//! plain text the gateway forwards verbatim.

use chrono::NaiveDate;

use crate::schema::{describe_schema, FACT_TABLE, RESULT_ROW_CAP};

/// Response language for the insight step. The core only carries the tag;
/// display-string localization stays at the presentation boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    Russian,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::English, Language::Russian];

    pub fn tag(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Russian => "ru",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "en" => Some(Language::English),
            "ru" => Some(Language::Russian),
            _ => None,
        }
    }

    fn directive(self) -> &'static str {
        match self {
            Language::English => "Respond in English.",
            Language::Russian => "Отвечай на русском языке.",
        }
    }

    /// Fixed text for the zero-row short-circuit.
    pub fn no_data_message(self) -> &'static str {
        match self {
            Language::English => "No data found for the selected period.",
            Language::Russian => "Нет данных за выбранный период.",
        }
    }
}

/// Build the schema-grounded SQL-generation prompt.
pub fn sql_generation_prompt(question: &str, lower_bound: NaiveDate) -> String {
    format!(
        "You are a SQL analyst for an Amazon marketplace sales & traffic dashboard.\n\
         \n\
         The only table available is `{table}` with these columns:\n\
         {schema}\n\
         \n\
         Rules:\n\
         - Reply with exactly one SQLite SELECT statement and nothing else.\n\
         - No markdown fences, no commentary before or after the statement.\n\
         - Query only the `{table}` table.\n\
         - Always filter with `date >= '{lower_bound}'` (combine with AND if the question needs more filters).\n\
         - Always end the statement with `LIMIT {cap}`.\n\
         - Dates are ISO 'YYYY-MM-DD' strings.\n\
         \n\
         Question: {question}",
        table = FACT_TABLE,
        schema = describe_schema(),
        lower_bound = lower_bound.format("%Y-%m-%d"),
        cap = RESULT_ROW_CAP,
        question = question,
    )
}

/// Build the insight prompt around the executed statement and its rows.
pub fn insight_prompt(question: &str, sql: &str, table: &str, language: Language) -> String {
    format!(
        "{directive}\n\
         \n\
         A business user asked: {question}\n\
         \n\
         This SQL was executed against the sales & traffic fact table:\n\
         {sql}\n\
         \n\
         It returned:\n\
         {table}\n\
         \n\
         Answer in three parts:\n\
         1. A direct answer to the question.\n\
         2. Key observations worth the user's attention.\n\
         3. Actionable recommendations.\n\
         Keep the whole response under roughly 220 words.",
        directive = language.directive(),
        question = question,
        sql = sql,
        table = table,
    )
}

/// Strip Markdown code-fence lines and surrounding whitespace from a raw
/// completion. No grammar validation happens here; execution is the
/// enforcement point.
pub fn strip_code_fences(raw: &str) -> String {
    raw.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
