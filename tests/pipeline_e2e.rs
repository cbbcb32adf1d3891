use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection;
use tempfile::tempdir;

use asinsight::gateway::{
    Completion, CompletionGateway, GatewayError, ModelAttempt, ProviderError,
};
use asinsight::{Assistant, Language, Outcome, QueryExecutor, Stage, TimeWindow};

/// Gateway scripted with a fixed sequence of responses: first call is the
/// query synthesis, second (if any) the insight.
struct ScriptedGateway {
    responses: Mutex<VecDeque<Result<Completion, GatewayError>>>,
    calls: AtomicUsize,
}

impl ScriptedGateway {
    fn new(responses: Vec<Result<Completion, GatewayError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionGateway for ScriptedGateway {
    async fn generate(&self, _prompt: &str) -> Result<Completion, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("gateway called more often than scripted")
    }
}

fn ok(text: &str, model: &str) -> Result<Completion, GatewayError> {
    Ok(Completion {
        text: text.to_string(),
        model: model.to_string(),
    })
}

fn exhausted() -> Result<Completion, GatewayError> {
    Err(GatewayError::Exhausted {
        attempts: vec![ModelAttempt {
            model: "model-a".into(),
            error: ProviderError::api(429, Some("RESOURCE_EXHAUSTED".into()), "quota"),
        }],
    })
}

fn seed_db(dir: &tempfile::TempDir, rows: usize) -> PathBuf {
    let path = dir.path().join("facts.sqlite");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE sales_traffic_report (
            date TEXT NOT NULL,
            child_asin TEXT NOT NULL,
            sessions INTEGER,
            units_ordered INTEGER,
            ordered_product_sales REAL
        );",
    )
    .unwrap();
    for i in 0..rows {
        conn.execute(
            "INSERT INTO sales_traffic_report VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                format!("2025-06-{:02}", (i % 28) + 1),
                format!("B0{i:08}"),
                100 + i as i64,
                5 + i as i64,
                19.99 * (i as f64 + 1.0),
            ],
        )
        .unwrap();
    }
    path
}

const GOOD_SQL: &str =
    "SELECT date, ordered_product_sales FROM sales_traffic_report WHERE date >= '2020-01-01' LIMIT 50";

#[tokio::test]
async fn full_pipeline_answers_with_provenance() {
    let dir = tempdir().unwrap();
    let gateway = ScriptedGateway::new(vec![
        ok(&format!("```sql\n{GOOD_SQL}\n```"), "model-a"),
        ok("Sales are healthy and growing.", "model-b"),
    ]);
    let assistant = Assistant::new(gateway.clone(), QueryExecutor::new(seed_db(&dir, 3)));

    let outcome = assistant
        .answer("how are sales?", TimeWindow::Days30, Language::English)
        .await;

    assert_eq!(
        outcome,
        Outcome::Answered {
            explanation: "Sales are healthy and growing.".into(),
            model: Some("model-b".into()),
            sql: GOOD_SQL.into(),
            row_count: 3,
        }
    );
    assert_eq!(gateway.calls(), 2);
}

#[tokio::test]
async fn zero_rows_short_circuits_without_an_insight_call() {
    let dir = tempdir().unwrap();
    let gateway = ScriptedGateway::new(vec![ok(
        "SELECT date FROM sales_traffic_report WHERE date >= '2999-01-01' LIMIT 50",
        "model-a",
    )]);
    let assistant = Assistant::new(gateway.clone(), QueryExecutor::new(seed_db(&dir, 3)));

    let outcome = assistant
        .answer("sales next millennium?", TimeWindow::Days7, Language::English)
        .await;

    match outcome {
        Outcome::Answered {
            explanation,
            model,
            row_count,
            ..
        } => {
            assert_eq!(explanation, "No data found for the selected period.");
            assert_eq!(model, None);
            assert_eq!(row_count, 0);
        }
        other => panic!("expected Answered, got {other:?}"),
    }
    assert_eq!(gateway.calls(), 1, "insight step must not run on zero rows");
}

#[tokio::test]
async fn zero_rows_message_follows_the_language_tag() {
    let dir = tempdir().unwrap();
    let gateway = ScriptedGateway::new(vec![ok(
        "SELECT date FROM sales_traffic_report WHERE date >= '2999-01-01' LIMIT 50",
        "model-a",
    )]);
    let assistant = Assistant::new(gateway, QueryExecutor::new(seed_db(&dir, 3)));

    let outcome = assistant
        .answer("продажи?", TimeWindow::Days7, Language::Russian)
        .await;

    match outcome {
        Outcome::Answered { explanation, .. } => {
            assert_eq!(explanation, "Нет данных за выбранный период.");
        }
        other => panic!("expected Answered, got {other:?}"),
    }
}

#[tokio::test]
async fn synthesis_exhaustion_fails_the_run_before_any_execution() {
    let dir = tempdir().unwrap();
    let gateway = ScriptedGateway::new(vec![exhausted()]);
    let assistant = Assistant::new(gateway.clone(), QueryExecutor::new(seed_db(&dir, 3)));

    let outcome = assistant
        .answer("how are sales?", TimeWindow::Days30, Language::English)
        .await;

    match outcome {
        Outcome::Failed {
            stage,
            sql,
            row_count,
            ..
        } => {
            assert_eq!(stage, Stage::Synthesize);
            assert_eq!(sql, None);
            assert_eq!(row_count, None);
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert_eq!(gateway.calls(), 1);
}

#[tokio::test]
async fn execution_failure_never_reaches_the_insight_step() {
    let dir = tempdir().unwrap();
    let gateway = ScriptedGateway::new(vec![ok(
        "SELEC date FROM sales_traffic_report LIMIT 50",
        "model-a",
    )]);
    let assistant = Assistant::new(gateway.clone(), QueryExecutor::new(seed_db(&dir, 3)));

    let outcome = assistant
        .answer("how are sales?", TimeWindow::Days30, Language::English)
        .await;

    match outcome {
        Outcome::Failed {
            stage, sql, row_count, ..
        } => {
            assert_eq!(stage, Stage::Execute);
            assert_eq!(sql.as_deref(), Some("SELEC date FROM sales_traffic_report LIMIT 50"));
            assert_eq!(row_count, None);
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert_eq!(gateway.calls(), 1, "no insight call after an execution failure");
}

#[tokio::test]
async fn explain_failure_degrades_but_keeps_query_and_rows() {
    let dir = tempdir().unwrap();
    let gateway = ScriptedGateway::new(vec![ok(GOOD_SQL, "model-a"), exhausted()]);
    let assistant = Assistant::new(gateway.clone(), QueryExecutor::new(seed_db(&dir, 5)));

    let outcome = assistant
        .answer("how are sales?", TimeWindow::Days30, Language::English)
        .await;

    match outcome {
        Outcome::Failed {
            stage,
            reason,
            sql,
            row_count,
        } => {
            assert_eq!(stage, Stage::Explain);
            assert_eq!(sql.as_deref(), Some(GOOD_SQL));
            assert_eq!(row_count, Some(5));
            assert!(reason.contains("candidate models failed"));
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert_eq!(gateway.calls(), 2);
}

#[tokio::test]
async fn identical_runs_produce_equal_outcomes() {
    let dir = tempdir().unwrap();
    let db = seed_db(&dir, 3);

    let mut outcomes = Vec::new();
    for _ in 0..2 {
        let gateway = ScriptedGateway::new(vec![
            ok(GOOD_SQL, "model-a"),
            ok("Steady growth across the window.", "model-a"),
        ]);
        let assistant = Assistant::new(gateway, QueryExecutor::new(&db));
        outcomes.push(
            assistant
                .answer("trend?", TimeWindow::Days90, Language::English)
                .await,
        );
    }

    assert_eq!(outcomes[0], outcomes[1]);
    assert!(outcomes[0].is_answered());
}
