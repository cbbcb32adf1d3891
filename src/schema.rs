//! Fixed schema of the sales & traffic fact table, plus the reporting
//! time window.
//!
//! The descriptor exists to ground prompts. It is never executed and never
//! mutated; the store itself is the authority on what a statement may touch.

use chrono::{Duration, NaiveDate};

/// The one fact table the assistant may query. One row per (date, product).
pub const FACT_TABLE: &str = "sales_traffic_report";

/// Rows the generated statement is asked to cap itself at, and the hard cap
/// the executor enforces regardless.
pub const RESULT_ROW_CAP: usize = 50;

/// Semantic type of a fact-table column, as described to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Date,
    Identifier,
    Text,
    Count,
    Money,
    Percent,
}

impl ColumnKind {
    fn as_str(self) -> &'static str {
        match self {
            ColumnKind::Date => "date",
            ColumnKind::Identifier => "identifier",
            ColumnKind::Text => "text",
            ColumnKind::Count => "count",
            ColumnKind::Money => "money",
            ColumnKind::Percent => "percent",
        }
    }
}

/// One fact-table column with the aggregation note the model needs to use
/// it sensibly.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub note: &'static str,
}

/// The full column set, in the store's order.
pub const FACT_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec { name: "date", kind: ColumnKind::Date, note: "report day, ISO YYYY-MM-DD" },
    ColumnSpec { name: "parent_asin", kind: ColumnKind::Identifier, note: "parent product ASIN" },
    ColumnSpec { name: "child_asin", kind: ColumnKind::Identifier, note: "child product ASIN, group/filter by this" },
    ColumnSpec { name: "title", kind: ColumnKind::Text, note: "product title" },
    ColumnSpec { name: "sku", kind: ColumnKind::Identifier, note: "seller SKU" },
    ColumnSpec { name: "sessions", kind: ColumnKind::Count, note: "visits, sum over rows" },
    ColumnSpec { name: "sessions_b2b", kind: ColumnKind::Count, note: "B2B share of sessions, sum" },
    ColumnSpec { name: "browser_sessions", kind: ColumnKind::Count, note: "desktop browser sessions, sum" },
    ColumnSpec { name: "mobile_app_sessions", kind: ColumnKind::Count, note: "mobile app sessions, sum" },
    ColumnSpec { name: "session_percentage", kind: ColumnKind::Percent, note: "share of account sessions, average" },
    ColumnSpec { name: "page_views", kind: ColumnKind::Count, note: "page views, sum" },
    ColumnSpec { name: "page_views_b2b", kind: ColumnKind::Count, note: "B2B page views, sum" },
    ColumnSpec { name: "browser_page_views", kind: ColumnKind::Count, note: "desktop browser page views, sum" },
    ColumnSpec { name: "mobile_app_page_views", kind: ColumnKind::Count, note: "mobile app page views, sum" },
    ColumnSpec { name: "page_views_percentage", kind: ColumnKind::Percent, note: "share of account page views, average" },
    ColumnSpec { name: "buy_box_percentage", kind: ColumnKind::Percent, note: "buy box ownership, average not sum" },
    ColumnSpec { name: "buy_box_percentage_b2b", kind: ColumnKind::Percent, note: "B2B buy box ownership, average" },
    ColumnSpec { name: "unit_session_percentage", kind: ColumnKind::Percent, note: "conversion rate (CVR), average not sum" },
    ColumnSpec { name: "unit_session_percentage_b2b", kind: ColumnKind::Percent, note: "B2B conversion rate, average" },
    ColumnSpec { name: "units_ordered", kind: ColumnKind::Count, note: "units sold, sum" },
    ColumnSpec { name: "units_ordered_b2b", kind: ColumnKind::Count, note: "B2B units sold, sum" },
    ColumnSpec { name: "ordered_product_sales", kind: ColumnKind::Money, note: "revenue in USD, sum" },
    ColumnSpec { name: "ordered_product_sales_b2b", kind: ColumnKind::Money, note: "B2B revenue in USD, sum" },
    ColumnSpec { name: "total_order_items", kind: ColumnKind::Count, note: "order line items, sum" },
    ColumnSpec { name: "total_order_items_b2b", kind: ColumnKind::Count, note: "B2B order line items, sum" },
];

/// Render the schema as prompt text, one line per column.
pub fn describe_schema() -> String {
    FACT_COLUMNS
        .iter()
        .map(|c| format!("- {} ({}): {}", c.name, c.kind.as_str(), c.note))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Reporting window: the last N days, from the dashboard's fixed choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    Days7,
    Days14,
    Days30,
    Days60,
    Days90,
}

impl TimeWindow {
    pub const ALL: [TimeWindow; 5] = [
        TimeWindow::Days7,
        TimeWindow::Days14,
        TimeWindow::Days30,
        TimeWindow::Days60,
        TimeWindow::Days90,
    ];

    pub fn days(self) -> i64 {
        match self {
            TimeWindow::Days7 => 7,
            TimeWindow::Days14 => 14,
            TimeWindow::Days30 => 30,
            TimeWindow::Days60 => 60,
            TimeWindow::Days90 => 90,
        }
    }

    pub fn from_days(days: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|w| w.days() == days)
    }

    /// Inclusive lower bound of the window: `today - N days`.
    pub fn lower_bound(self, today: NaiveDate) -> NaiveDate {
        today - Duration::days(self.days())
    }
}
