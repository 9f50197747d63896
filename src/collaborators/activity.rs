//! Per-conversation activity log.

use std::path::PathBuf;
use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use tokio::io::AsyncWriteExt;

use crate::error::Result;

/// Records user-visible actions of a conversation.
#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn record(
        &self,
        conversation_id: &str,
        action: &str,
        details: &serde_json::Value,
    ) -> Result<()>;
}

/// Record an action, logging instead of failing.
pub async fn record_activity(
    sink: &dyn ActivityLog,
    conversation_id: &str,
    action: &str,
    details: serde_json::Value,
) {
    if let Err(e) = sink.record(conversation_id, action, &details).await {
        log::warn!("Activity log write for '{}' failed: {}", conversation_id, e);
    }
}

/// Appends one text file per conversation under a directory.
#[derive(Debug, Clone)]
pub struct FileActivityLog {
    dir: PathBuf,
}

impl FileActivityLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the file for a conversation.
    pub fn path_for(&self, conversation_id: &str) -> PathBuf {
        self.dir.join(format!("{}.txt", sanitize_id(conversation_id)))
    }
}

#[async_trait]
impl ActivityLog for FileActivityLog {
    async fn record(
        &self,
        conversation_id: &str,
        action: &str,
        details: &serde_json::Value,
    ) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let entry = format!(
            "{} - {}\nDetails: {}\n\n",
            Utc::now().to_rfc3339(),
            action,
            serde_json::to_string(details)?
        );

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(conversation_id))
            .await?;
        file.write_all(entry.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Reduce an id to a safe file stem.
fn sanitize_id(id: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let unsafe_runs = UNSAFE
        .get_or_init(|| Regex::new(r"[^A-Za-z0-9_-]+").expect("file stem pattern is valid"));
    let cleaned = unsafe_runs.replace_all(id.trim(), "_");
    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        "anonymous".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_sanitize_id() {
        assert_eq!(sanitize_id("12345_alice"), "12345_alice");
        assert_eq!(sanitize_id("../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize_id("  "), "anonymous");
        assert_eq!(sanitize_id("7 @trader.fx"), "7_trader_fx");
        assert_eq!(sanitize_id("-1001_desk-bot"), "-1001_desk-bot");
    }

    #[tokio::test]
    async fn test_appends_entries() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileActivityLog::new(dir.path().join("user_logs"));

        log.record("42_bob", "Selected currency", &json!({"currency": "USD"}))
            .await
            .unwrap();
        log.record("42_bob", "Selected impact", &json!({"impact": "high"}))
            .await
            .unwrap();

        let content = std::fs::read_to_string(log.path_for("42_bob")).unwrap();
        let entries: Vec<_> = content.split("\n\n").filter(|e| !e.is_empty()).collect();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].contains(" - Selected currency\nDetails: {\"currency\":\"USD\"}"));
        assert!(entries[1].ends_with("Details: {\"impact\":\"high\"}"));
        assert!(content.ends_with("\n\n"));
    }

    #[tokio::test]
    async fn test_record_activity_swallows_errors() {
        let dir = tempfile::tempdir().unwrap();
        // A file where the directory should be makes create_dir_all fail.
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, "x").unwrap();

        let log = FileActivityLog::new(&blocker);
        record_activity(&log, "1", "Started", json!({})).await;
        assert!(log.record("1", "Started", &json!({})).await.is_err());
    }
}
