//! Request and response shapes for the Anomalo public API.
//!
//! Response fields are `Option` so that an absent field stays distinguishable
//! from a real zero, empty string or `false`. Where the API has returned
//! differently shaped objects over time, the most complete shape is modeled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Treat an explicit `null` list like a missing one.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PingResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ping: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// A user reference as embedded in `created_by` / `last_edited_by`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecentInterval {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_run_checks_job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_period_end: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_period_start: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecentStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_intervals: Option<Vec<RecentInterval>>,
}

/// Monitoring configuration of a table as reported by `get_table_information`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_cadence_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_column_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_after: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_channel_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_columns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fresh_after: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_cadence_run_at_duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_skip_expr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub always_alert_on_errors: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<UserRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edited_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edited_by: Option<UserRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack_users: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetTableResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitored: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_channel: Option<NotificationChannel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_status: Option<RecentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warehouse: Option<Warehouse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<TableConfig>,
}

/// Body of `configure_table`.
///
/// `check_cadence_type` is always sent; `None` serializes as `null`, which
/// clears the cadence. Every other unset field is left out of the body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigureTableRequest {
    pub table_id: i64,
    pub check_cadence_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_column_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_after: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_channel_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_columns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fresh_after: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_cadence_run_at_duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_skip_expr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub always_alert_on_errors: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigureTableResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_refreshed: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_modified: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_message_html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_system_check: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_level: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckConfig {
    #[serde(rename = "_metadata", default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<CheckMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,
}

/// A data-quality check attached to a table.
///
/// `check_id` changes whenever the check is edited; `check_static_id` and
/// `ref` are the natural keys callers use to follow a check across edits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Check {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_static_id: Option<i64>,
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub check_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<CheckConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<UserRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edited_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edited_by: Option<UserRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triage_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_notification_channel_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetChecksResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub checks: Vec<Check>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCheckRequest {
    pub table_id: i64,
    pub check_type: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCheckResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_id: Option<i64>,
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub check_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_static_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteCheckRequest {
    pub table_id: i64,
    pub check_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteCheckResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_count: Option<i64>,
}

/// Body of `run_checks`. Without `check_ids` every check on the table runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunChecksRequest {
    pub table_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunChecksResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_checks_job_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationChannel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetNotificationChannelsResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub notification_channels: Vec<NotificationChannel>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeOrganizationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}
