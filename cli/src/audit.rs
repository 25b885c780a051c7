//! One-line audit records for engine API usage.
//!
//! An entry is the common fields followed by the event-specific fields,
//! space separated, with `-` standing in for any empty value:
//!
//! ```text
//! 2024-01-01T00:00:00Z 0 alice "unix:///var/run/docker.sock" "berth/0.3.0" GetClient 1 unix:///var/run/docker.sock 1.17
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::info;

use crate::engine::ApiVersion;

pub const GET_CLIENT_EVENT_TYPE: &str = "GetClient";
pub const FIND_VERSIONS_EVENT_TYPE: &str = "FindAvailableVersions";

const GET_CLIENT_AUDIT_LOG_VERSION: u32 = 1;
const FIND_VERSIONS_AUDIT_LOG_VERSION: u32 = 1;

const EMPTY_FIELD: &str = "-";

/// Fields shared by every audit entry.
#[derive(Debug, Clone)]
pub struct CommonFields {
    pub event_time: DateTime<Utc>,
    pub result_code: i32,
    pub source: String,
    pub target: String,
    pub agent: String,
}

impl CommonFields {
    pub fn new(result_code: i32, target: &str) -> Self {
        Self {
            event_time: Utc::now(),
            result_code,
            source: std::env::var("USER").unwrap_or_default(),
            target: target.to_string(),
            agent: format!("berth/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn format(&self) -> String {
        format!(
            "{} {} {} {} {}",
            self.event_time.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.result_code,
            populate_field(&self.source),
            populate_field(&quoted(&self.target)),
            populate_field(&quoted(&self.agent)),
        )
    }
}

/// Event-specific details.
#[derive(Debug, Clone)]
pub enum AuditEvent {
    GetClient {
        endpoint: String,
        version: ApiVersion,
    },
    FindAvailableVersions {
        endpoint: String,
        available: Vec<ApiVersion>,
    },
}

impl AuditEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            AuditEvent::GetClient { .. } => GET_CLIENT_EVENT_TYPE,
            AuditEvent::FindAvailableVersions { .. } => FIND_VERSIONS_EVENT_TYPE,
        }
    }

    pub fn format(&self) -> String {
        match self {
            AuditEvent::GetClient { endpoint, version } => format!(
                "{} {} {} {}",
                GET_CLIENT_EVENT_TYPE,
                GET_CLIENT_AUDIT_LOG_VERSION,
                populate_field(endpoint),
                version
            ),
            AuditEvent::FindAvailableVersions {
                endpoint,
                available,
            } => {
                let available = available
                    .iter()
                    .map(ApiVersion::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                format!(
                    "{} {} {} {}",
                    FIND_VERSIONS_EVENT_TYPE,
                    FIND_VERSIONS_AUDIT_LOG_VERSION,
                    populate_field(endpoint),
                    populate_field(&available)
                )
            }
        }
    }
}

pub fn format_entry(common: &CommonFields, event: &AuditEvent) -> String {
    format!("{} {}", common.format(), event.format())
}

/// Emits an audit entry under the `berth::audit` target.
pub fn record(result_code: i32, event: &AuditEvent) {
    let endpoint = match event {
        AuditEvent::GetClient { endpoint, .. } => endpoint,
        AuditEvent::FindAvailableVersions { endpoint, .. } => endpoint,
    };
    let entry = format_entry(&CommonFields::new(result_code, endpoint), event);
    info!(target: "berth::audit", event_type = event.event_type(), "{}", entry);
}

fn quoted(value: &str) -> String {
    if value.is_empty() {
        String::new()
    } else {
        format!("\"{}\"", value)
    }
}

fn populate_field(field: &str) -> &str {
    if field.is_empty() {
        EMPTY_FIELD
    } else {
        field
    }
}
