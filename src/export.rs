//! Export of changed products to a spreadsheet.
//!
//! Only products whose last reconciliation moved the counter are exported.
//! The spreadsheet service and its OAuth provider are external; they are
//! reached through the [`TokenProvider`] and [`SheetAppender`] seams. A
//! failed call is reported once and never retried.

use crate::config::SheetTarget;
use crate::error::{Result, TrackerError};
use crate::types::{Snapshot, Timestamp};
use chrono::TimeZone;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Display;
use tracing::{info, warn};

/// Rendering of the timestamp column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Bytes escaped in path segments: everything but RFC 3986 unreserved.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Sheet values are interpreted as if typed by a user (numbers stay numbers).
pub const VALUE_INPUT_OPTION: &str = "USER_ENTERED";

/// Column headers, in the order [`ExportRow::to_sheet_row`] emits cells.
pub const SHEET_COLUMNS: [&str; 5] = [
    "Timestamp",
    "Product",
    "Total Sales",
    "Today's Sales",
    "Sales Difference",
];

/// One product queued for export.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRow {
    pub name: String,
    pub total_sales: u64,
    pub todays_sales: u64,
    pub sales_difference: i64,
    pub product_url: String,
    /// When the export was prepared.
    pub timestamp: Timestamp,
}

impl ExportRow {
    /// Cells of the appended row: timestamp, name, total, today, difference.
    pub fn to_sheet_row<Tz>(&self, tz: &Tz) -> Vec<Value>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        vec![
            Value::from(self.timestamp.with_timezone(tz).format(TIMESTAMP_FORMAT).to_string()),
            Value::from(self.name.clone()),
            Value::from(self.total_sales),
            Value::from(self.todays_sales),
            Value::from(self.sales_difference),
        ]
    }
}

/// Products with a non-zero difference, in snapshot order.
///
/// An empty result is a normal outcome; the caller decides whether to
/// tell anyone.
pub fn select_for_export(snapshot: &Snapshot, now: Timestamp) -> Vec<ExportRow> {
    snapshot
        .changed_products()
        .map(|p| ExportRow {
            name: p.name.clone(),
            total_sales: p.total_sales,
            todays_sales: p.todays_sales,
            sales_difference: p.sales_difference,
            product_url: p.product_url.clone(),
            timestamp: now,
        })
        .collect()
}

/// Body of a spreadsheet append call.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AppendRequest {
    /// A1 range the rows are appended after, e.g. `Sheet1`.
    #[serde(skip)]
    pub range: String,

    #[serde(skip)]
    pub value_input_option: &'static str,

    pub values: Vec<Vec<Value>>,
}

impl AppendRequest {
    pub fn new<Tz>(target: &SheetTarget, rows: &[ExportRow], tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        Self {
            range: target.sheet_name.clone(),
            value_input_option: VALUE_INPUT_OPTION,
            values: rows.iter().map(|r| r.to_sheet_row(tz)).collect(),
        }
    }

    /// Path of the append call relative to the API root.
    pub fn path(&self, target: &SheetTarget) -> String {
        format!(
            "spreadsheets/{}/values/{}:append?valueInputOption={}",
            utf8_percent_encode(&target.spreadsheet_id, PATH_SEGMENT),
            utf8_percent_encode(&self.range, PATH_SEGMENT),
            self.value_input_option
        )
    }

    /// JSON body: `{"values": [[...], ...]}`.
    pub fn body(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn row_count(&self) -> usize {
        self.values.len()
    }
}

/// What the spreadsheet reported back.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendResponse {
    pub updated_rows: usize,
}

/// Source of bearer tokens for the spreadsheet API.
pub trait TokenProvider {
    fn token(&self) -> Result<String>;
}

/// Performs the authenticated append call.
pub trait SheetAppender {
    fn append(
        &self,
        token: &str,
        target: &SheetTarget,
        request: &AppendRequest,
    ) -> Result<AppendResponse>;
}

/// Result of an export attempt that did not fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportOutcome {
    /// No product changed; no call was made.
    NothingToExport,
    /// Rows were appended.
    Exported {
        rows: Vec<ExportRow>,
        response: AppendResponse,
    },
}

impl ExportOutcome {
    pub fn exported_rows(&self) -> usize {
        match self {
            ExportOutcome::NothingToExport => 0,
            ExportOutcome::Exported { rows, .. } => rows.len(),
        }
    }
}

/// Select changed products and append them to `target`.
///
/// Token failures surface as [`TrackerError::Auth`], append failures as
/// [`TrackerError::Export`].
pub fn export_snapshot<Tz>(
    snapshot: &Snapshot,
    now: Timestamp,
    tz: &Tz,
    target: &SheetTarget,
    tokens: &dyn TokenProvider,
    appender: &dyn SheetAppender,
) -> Result<ExportOutcome>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let rows = select_for_export(snapshot, now);
    if rows.is_empty() {
        info!("No products with sales changes to export");
        return Ok(ExportOutcome::NothingToExport);
    }

    let token = tokens.token().map_err(|e| match e {
        TrackerError::Auth(_) => e,
        other => TrackerError::Auth(other.to_string()),
    })?;

    let request = AppendRequest::new(target, &rows, tz);
    let response = appender.append(&token, target, &request).map_err(|e| {
        warn!(error = %e, rows = rows.len(), "Sheet append failed");
        match e {
            TrackerError::Export(_) => e,
            other => TrackerError::Export(other.to_string()),
        }
    })?;

    info!(rows = rows.len(), sheet = %target.sheet_name, "Exported changed products");
    Ok(ExportOutcome::Exported { rows, response })
}
