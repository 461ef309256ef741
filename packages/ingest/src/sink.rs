//! Notification sinks.
//!
//! Dispatch is best-effort: a failed `notify` is logged and counted by the
//! orchestrator and never touches stored records. Sinks may be shared by
//! concurrent county runs.

use std::path::{Path, PathBuf};

use arrest_leads_ingest_models::NotificationPayload;
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Errors that can occur while dispatching a notification.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Writing to the sink's destination failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The payload could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The sink refused the payload.
    #[error("notification rejected: {message}")]
    Rejected {
        /// Description of why.
        message: String,
    },
}

/// Destination for lead notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Delivers one payload.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] if delivery fails. No retries are expected
    /// beyond what the sink does itself.
    async fn notify(&self, payload: &NotificationPayload) -> Result<(), DispatchError>;
}

/// Writes each lead's highlights to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn notify(&self, payload: &NotificationPayload) -> Result<(), DispatchError> {
        let h = &payload.highlights;
        log::info!(
            "[{}] {} lead: {} ({}) score {}",
            payload.county.display_name(),
            payload.tier,
            payload.full_name,
            payload.booking_number,
            payload.score
        );
        if !h.charges.is_empty() {
            log::info!("  Charges: {}", h.charges);
        }
        if !h.bond.is_empty() {
            log::info!("  Bond: {}", h.bond);
        }
        if !h.court.is_empty() {
            log::info!("  Court: {}", h.court);
        }
        if !h.key_charges.is_empty() {
            log::info!("  Flags: {}", h.key_charges.join(", "));
        }
        Ok(())
    }
}

/// Appends one JSON document per line to an outbox file.
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    write: Mutex<()>,
}

impl JsonLinesSink {
    /// The file and its parent directory are created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl NotificationSink for JsonLinesSink {
    async fn notify(&self, payload: &NotificationPayload) -> Result<(), DispatchError> {
        let mut line = serde_json::to_vec(payload)?;
        line.push(b'\n');

        let _guard = self.write.lock().await;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrest_leads_arrest_models::{County, Tier};
    use arrest_leads_ingest_models::Highlights;

    use super::*;

    fn payload(booking_number: &str) -> NotificationPayload {
        NotificationPayload {
            run_id: uuid::Uuid::new_v4(),
            county: County::Lee,
            booking_number: booking_number.to_string(),
            natural_key: format!("Lee|{booking_number}"),
            full_name: "SMITH, JOHN".to_string(),
            score: 90,
            tier: Tier::Hot,
            reasons: vec!["Currently in custody".to_string()],
            highlights: Highlights {
                charges: "DUI".to_string(),
                ..Highlights::default()
            },
            detail_url: String::new(),
            mugshot_url: String::new(),
            search_links: Vec::new(),
        }
    }

    #[tokio::test]
    async fn log_sink_always_succeeds() {
        assert!(LogSink.notify(&payload("1")).await.is_ok());
    }

    #[tokio::test]
    async fn json_lines_sink_appends_concurrently() {
        let dir = std::env::temp_dir().join(format!("arrest-leads-outbox-{}", uuid::Uuid::new_v4()));
        let sink = Arc::new(JsonLinesSink::new(dir.join("outbox.jsonl")));

        let writes = (0..8).map(|i| {
            let sink = sink.clone();
            tokio::spawn(async move { sink.notify(&payload(&i.to_string())).await })
        });
        for write in futures::future::join_all(writes).await {
            write.unwrap().unwrap();
        }

        let contents = tokio::fs::read_to_string(sink.path()).await.unwrap();
        let lines: Vec<NotificationPayload> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 8);
        assert!(lines.iter().all(|p| p.tier == Tier::Hot));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
