//! Table Service models.
//!
//! Database records, the loaded table aggregate used by the roll resolver,
//! and the camelCase wire DTOs exchanged over HTTP.

use crate::errors::TableError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// User id recorded when a session is created without one.
pub const ANONYMOUS_USER_ID: &str = "Anonymous";

/// Column type label used when none is supplied.
pub const DEFAULT_COLUMN_TYPE: &str = "text";

/// Health check response.
///
/// Returned by the `/health` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service health status ("healthy" or "unhealthy").
    pub status: String,

    /// Database connectivity status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

// ============================================================================
// Roll mode and overrides
// ============================================================================

/// How a roll picks values from a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollMode {
    /// One random row supplies every column.
    Row,

    /// Every column draws independently from its own value pool.
    Column,
}

impl RollMode {
    /// Returns the string representation of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            RollMode::Row => "row",
            RollMode::Column => "column",
        }
    }
}

impl fmt::Display for RollMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RollMode {
    type Err = TableError;

    /// Case-insensitive parse of `row` / `column`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("row") {
            Ok(RollMode::Row)
        } else if s.eq_ignore_ascii_case("column") {
            Ok(RollMode::Column)
        } else {
            Err(TableError::BadRequest(
                "Mode must be either 'row' or 'column'.".to_string(),
            ))
        }
    }
}

/// A caller-supplied forced value for a named column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnOverride {
    /// Column name, matched case-insensitively.
    #[serde(alias = "columnName")]
    pub column: String,

    /// Value to force.
    #[serde(default)]
    pub value: String,
}

impl ColumnOverride {
    pub fn new(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

// ============================================================================
// Database records
// ============================================================================

/// Table row as stored in the `tables` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TableRecord {
    pub table_id: Uuid,
    pub title: String,
    pub source: String,
    pub license: String,
    pub description: String,
    pub dice_range: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Column definition.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ColumnRecord {
    pub column_id: Uuid,
    pub table_id: Uuid,
    pub name: String,
    pub column_type: String,
    pub position: i32,
}

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RowValueRecord {
    pub value_id: Uuid,
    pub row_id: Uuid,
    pub column_id: Uuid,
    pub value: String,
}

/// A table row together with its values, in storage order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRecord {
    pub row_id: Uuid,
    pub table_id: Uuid,
    pub position: i32,
    pub values: Vec<RowValueRecord>,
}

impl RowRecord {
    /// First value stored for `column_id` in this row.
    pub fn value_for(&self, column_id: Uuid) -> Option<&str> {
        self.values
            .iter()
            .find(|v| v.column_id == column_id)
            .map(|v| v.value.as_str())
    }
}

/// A fully loaded table: columns and rows (with values) in position order.
#[derive(Debug, Clone)]
pub struct TableAggregate {
    pub table: TableRecord,
    pub columns: Vec<ColumnRecord>,
    pub rows: Vec<RowRecord>,
    pub tags: Vec<String>,
}

impl TableAggregate {
    /// First column whose name matches `name`, see [`find_column_by_name`].
    pub fn column_by_name(&self, name: &str) -> Option<&ColumnRecord> {
        find_column_by_name(&self.columns, name)
    }
}

/// First column in `columns` whose name matches `name` case-insensitively,
/// ignoring surrounding whitespace on both sides.
pub fn find_column_by_name<'a>(columns: &'a [ColumnRecord], name: &str) -> Option<&'a ColumnRecord> {
    let needle = name.trim().to_lowercase();
    columns
        .iter()
        .find(|c| c.name.trim().to_lowercase() == needle)
}

/// Session as stored in the `sessions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRecord {
    pub session_id: Uuid,
    pub user_id: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Roll header as stored in the `rolls` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RollRecord {
    pub roll_id: Uuid,
    pub session_id: Uuid,
    pub table_id: Uuid,
    pub table_title: String,
    pub mode: String,
    pub rolled_at: DateTime<Utc>,
}

/// Roll result joined with the current name of its column.
///
/// `column_name` is `None` when the column no longer exists.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RollResultRecord {
    pub result_id: Uuid,
    pub roll_id: Uuid,
    pub column_id: Uuid,
    pub value: String,
    pub column_name: Option<String>,
}

impl RollResultRecord {
    /// Column name for display, falling back to the column id.
    pub fn display_name(&self) -> String {
        self.column_name
            .clone()
            .unwrap_or_else(|| self.column_id.to_string())
    }
}

/// A roll together with its per-column results.
#[derive(Debug, Clone)]
pub struct LoggedRoll {
    pub roll: RollRecord,
    pub results: Vec<RollResultRecord>,
}

// ============================================================================
// Table API models
// ============================================================================

/// Scalar view of a table, used in listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSummary {
    pub id: Uuid,
    pub title: String,
    pub source: String,
    pub license: String,
    pub description: String,
    pub dice_range: String,
}

impl From<TableRecord> for TableSummary {
    fn from(record: TableRecord) -> Self {
        Self {
            id: record.table_id,
            title: record.title,
            source: record.source,
            license: record.license,
            description: record.description,
            dice_range: record.dice_range,
        }
    }
}

/// Column as returned over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnResponse {
    pub id: Uuid,
    pub table_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
}

impl From<ColumnRecord> for ColumnResponse {
    fn from(record: ColumnRecord) -> Self {
        Self {
            id: record.column_id,
            table_id: record.table_id,
            name: record.name,
            column_type: record.column_type,
        }
    }
}

/// Row value as returned over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowValueResponse {
    pub id: Uuid,
    pub row_id: Uuid,
    pub column_id: Uuid,
    pub value: String,
}

/// Row as returned over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowResponse {
    pub id: Uuid,
    pub table_id: Uuid,
    pub values: Vec<RowValueResponse>,
}

impl From<RowRecord> for RowResponse {
    fn from(record: RowRecord) -> Self {
        Self {
            id: record.row_id,
            table_id: record.table_id,
            values: record
                .values
                .into_iter()
                .map(|v| RowValueResponse {
                    id: v.value_id,
                    row_id: v.row_id,
                    column_id: v.column_id,
                    value: v.value,
                })
                .collect(),
        }
    }
}

/// Full table as returned over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableResponse {
    pub id: Uuid,
    pub title: String,
    pub source: String,
    pub license: String,
    pub description: String,
    pub dice_range: String,
    pub columns: Vec<ColumnResponse>,
    pub rows: Vec<RowResponse>,
    pub tags: Vec<String>,
}

impl From<TableAggregate> for TableResponse {
    fn from(aggregate: TableAggregate) -> Self {
        let TableAggregate {
            table,
            columns,
            rows,
            tags,
        } = aggregate;
        Self {
            id: table.table_id,
            title: table.title,
            source: table.source,
            license: table.license,
            description: table.description,
            dice_range: table.dice_range,
            columns: columns.into_iter().map(ColumnResponse::from).collect(),
            rows: rows.into_iter().map(RowResponse::from).collect(),
            tags,
        }
    }
}

/// New column definition.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewColumn {
    #[serde(default)]
    pub name: String,

    #[serde(rename = "type", default)]
    pub column_type: Option<String>,
}

impl NewColumn {
    /// Column type label, defaulting to `text` when absent or blank.
    pub fn column_type(&self) -> &str {
        match self.column_type.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => DEFAULT_COLUMN_TYPE,
        }
    }
}

/// New row: values keyed by column name (case-insensitive).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRow {
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

/// Request for creating a table with its columns, rows and tags.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTableRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub dice_range: Option<String>,
    #[serde(default)]
    pub columns: Vec<NewColumn>,
    #[serde(default)]
    pub rows: Vec<NewRow>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CreateTableRequest {
    /// Validate the request.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Title is required.".to_string());
        }

        validate_column_names(self.columns.iter().map(|c| c.name.as_str()))?;

        for row in &self.rows {
            for name in row.values.keys() {
                let needle = name.trim().to_lowercase();
                let known = self
                    .columns
                    .iter()
                    .any(|c| c.name.trim().to_lowercase() == needle);
                if !known {
                    return Err(format!("Row references unknown column '{}'.", name));
                }
            }
        }

        Ok(())
    }
}

/// Reject blank names and names that collide case-insensitively.
pub fn validate_column_names<'a>(names: impl Iterator<Item = &'a str>) -> Result<(), String> {
    let mut seen = HashSet::new();
    for name in names {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err("Column Name is required.".to_string());
        }
        if !seen.insert(trimmed.to_lowercase()) {
            return Err(format!("Duplicate column name '{}'.", trimmed));
        }
    }
    Ok(())
}

/// Request for updating a table's scalar fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTableRequest {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub dice_range: Option<String>,
}

impl UpdateTableRequest {
    /// Validate the request against the id in the route.
    pub fn validate(&self, route_id: Uuid) -> Result<(), String> {
        if let Some(body_id) = self.id {
            if !body_id.is_nil() && body_id != route_id {
                return Err("ID mismatch between route and body.".to_string());
            }
        }
        if self.title.trim().is_empty() {
            return Err("Title is required.".to_string());
        }
        Ok(())
    }
}

/// Query string for table listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableSearchQuery {
    pub search: Option<String>,
}

/// Request and response body for replacing a table's tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagsBody {
    #[serde(default)]
    pub tags: Vec<String>,
}

// ============================================================================
// Roll API models
// ============================================================================

/// Request for rolling against a table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollRequest {
    #[serde(default)]
    pub table_id: Option<Uuid>,
    #[serde(default)]
    pub session_id: Option<Uuid>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub overrides: Option<Vec<ColumnOverride>>,
}

/// A roll request whose required fields are present.
#[derive(Debug, Clone)]
pub struct ValidRollRequest {
    pub table_id: Uuid,
    pub session_id: Uuid,
    pub mode: String,
    pub overrides: Vec<ColumnOverride>,
}

impl RollRequest {
    /// Check that table id, session id and mode are present.
    ///
    /// The mode value itself is validated by the resolver.
    pub fn validate(self) -> Result<ValidRollRequest, &'static str> {
        const MISSING: &str = "Missing required parameters.";

        let table_id = self.table_id.filter(|id| !id.is_nil()).ok_or(MISSING)?;
        let session_id = self.session_id.filter(|id| !id.is_nil()).ok_or(MISSING)?;
        let mode = self
            .mode
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .ok_or(MISSING)?;

        Ok(ValidRollRequest {
            table_id,
            session_id,
            mode,
            overrides: self.overrides.unwrap_or_default(),
        })
    }
}

/// Response for a recorded roll.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollResponse {
    pub roll_id: Uuid,
    pub table_id: Uuid,
    pub table_title: String,
    pub mode: String,
    pub timestamp: DateTime<Utc>,
    /// Column name to value.
    pub results: BTreeMap<String, String>,
}

/// Roll result as returned in roll listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollResultResponse {
    pub id: Uuid,
    pub roll_id: Uuid,
    pub column_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,
    pub value: String,
}

/// Roll as returned in session views and roll listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollLogEntry {
    pub roll_id: Uuid,
    pub session_id: Uuid,
    pub table_id: Uuid,
    pub table_title: String,
    pub mode: String,
    pub timestamp: DateTime<Utc>,
    pub results: Vec<RollResultResponse>,
}

impl From<LoggedRoll> for RollLogEntry {
    fn from(logged: LoggedRoll) -> Self {
        let LoggedRoll { roll, results } = logged;
        Self {
            roll_id: roll.roll_id,
            session_id: roll.session_id,
            table_id: roll.table_id,
            table_title: roll.table_title,
            mode: roll.mode,
            timestamp: roll.rolled_at,
            results: results
                .into_iter()
                .map(|r| RollResultResponse {
                    id: r.result_id,
                    roll_id: r.roll_id,
                    column_id: r.column_id,
                    column_name: r.column_name,
                    value: r.value,
                })
                .collect(),
        }
    }
}

// ============================================================================
// Session API models
// ============================================================================

/// Request for creating a session.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl CreateSessionRequest {
    /// Validate that name and description are present.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.name.trim().is_empty() || self.description.trim().is_empty() {
            return Err("Name and Description are required.");
        }
        Ok(())
    }

    /// User id to record, defaulting to [`ANONYMOUS_USER_ID`].
    pub fn effective_user_id(&self) -> &str {
        match self.user_id.as_deref() {
            Some(id) if !id.trim().is_empty() => id,
            _ => ANONYMOUS_USER_ID,
        }
    }
}

/// Session as returned over HTTP, with its roll log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub user_id: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub rolls: Vec<RollLogEntry>,
}

impl SessionResponse {
    pub fn new(session: SessionRecord, rolls: Vec<LoggedRoll>) -> Self {
        Self {
            session_id: session.session_id,
            user_id: session.user_id,
            name: session.name,
            description: session.description,
            created_at: session.created_at,
            rolls: rolls.into_iter().map(RollLogEntry::from).collect(),
        }
    }
}
