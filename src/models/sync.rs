use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncType {
    Full,
    Incremental,
}

impl SyncType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncType::Full => "full",
            SyncType::Incremental => "incremental",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "full" => Some(SyncType::Full),
            "incremental" => Some(SyncType::Incremental),
            _ => None,
        }
    }
}

impl fmt::Display for SyncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single persisted watermark row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMetadata {
    /// RFC 3339 lower bound for the next incremental fetch.
    pub last_sync_timestamp: String,
    /// Epoch milliseconds.
    pub last_sync_completed_at: i64,
    pub total_articles_synced: i64,
    pub sync_type: SyncType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncStatus {
    NeverSynced,
    Synced(SyncMetadata),
}

/// Per-kind write counts of one reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ReconcileStats {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
}

impl ReconcileStats {
    pub fn total_written(&self) -> usize {
        self.inserted + self.updated + self.unchanged
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_type: Option<SyncType>,
    pub duration_ms: i64,
    pub fetched: usize,
    pub stats: ReconcileStats,
    pub previous_watermark: Option<String>,
    pub new_watermark: Option<String>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.sync_type.map(|t| t.as_str()).unwrap_or("none");
        if self.success {
            write!(
                f,
                "{} sync ok in {}ms: {} inserted, {} updated, {} unchanged, {} deleted",
                kind,
                self.duration_ms,
                self.stats.inserted,
                self.stats.updated,
                self.stats.unchanged,
                self.stats.deleted
            )
        } else {
            write!(
                f,
                "{} sync failed after {}ms: {}",
                kind,
                self.duration_ms,
                self.error.as_deref().unwrap_or("unknown error")
            )
        }
    }
}
