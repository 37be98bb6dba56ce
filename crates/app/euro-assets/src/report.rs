use std::{sync::Mutex, time::Duration};

use async_trait::async_trait;
use posthog_rs::Event;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::ErrorKind;

const CAPTURE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMetadata {
    pub attachment_name: Option<String>,
    pub raw_message: String,
    pub kind: ErrorKind,
}

/// Structured failure handed to the error-reporting sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub context: String,
    pub severity: Severity,
    pub metadata: ErrorMetadata,
}

/// Short-lived message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    #[serde(rename = "durationMs", serialize_with = "as_millis")]
    pub duration: Duration,
}

fn as_millis<S: serde::Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u128(duration.as_millis())
}

#[async_trait]
pub trait ErrorReporter: Send + Sync {
    async fn report(&self, report: ErrorReport);
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification);
}

/// Writes reports to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

#[async_trait]
impl ErrorReporter for TracingReporter {
    async fn report(&self, report: ErrorReport) {
        let attachment = report.metadata.attachment_name.as_deref().unwrap_or("-");
        match report.severity {
            Severity::Error => error!(
                context = %report.context,
                attachment,
                kind = ?report.metadata.kind,
                "{}",
                report.metadata.raw_message
            ),
            Severity::Warning => warn!(
                context = %report.context,
                attachment,
                kind = ?report.metadata.kind,
                "{}",
                report.metadata.raw_message
            ),
        }
    }
}

/// Logs every report and, when enabled, captures it as an `attachment_error`
/// event on the global PostHog client.
#[derive(Debug, Clone)]
pub struct PosthogReporter {
    enabled: bool,
    distinct_id: Option<String>,
}

impl PosthogReporter {
    pub fn new(enabled: bool, distinct_id: Option<String>) -> Self {
        Self {
            enabled,
            distinct_id,
        }
    }

    fn event(&self, report: &ErrorReport) -> Event {
        let mut event = match &self.distinct_id {
            Some(id) => Event::new("attachment_error", id),
            None => Event::new_anon("attachment_error"),
        };
        event.insert_prop("context", &report.context).ok();
        event.insert_prop("severity", report.severity).ok();
        event.insert_prop("kind", report.metadata.kind).ok();
        if let Some(name) = &report.metadata.attachment_name {
            event.insert_prop("attachment_name", name).ok();
        }
        event
            .insert_prop("raw_message", &report.metadata.raw_message)
            .ok();
        event
    }
}

#[async_trait]
impl ErrorReporter for PosthogReporter {
    async fn report(&self, report: ErrorReport) {
        let event = self.event(&report);
        TracingReporter.report(report).await;

        if !self.enabled {
            return;
        }

        match tokio::time::timeout(CAPTURE_TIMEOUT, posthog_rs::capture(event)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("Failed to capture posthog event: {}", e),
            Err(_) => debug!("Posthog capture timed out"),
        }
    }
}

/// Shows notifications as log lines, for hosts without a toast surface.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: Notification) {
        info!("{}", notification.title);
    }
}

/// Keeps every report in memory.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<ErrorReport>>,
}

impl RecordingReporter {
    pub fn reports(&self) -> Vec<ErrorReport> {
        self.reports
            .lock()
            .map(|reports| reports.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ErrorReporter for RecordingReporter {
    async fn report(&self, report: ErrorReport) {
        if let Ok(mut reports) = self.reports.lock() {
            reports.push(report);
        }
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .map(|notifications| notifications.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: Notification) {
        if let Ok(mut notifications) = self.notifications.lock() {
            notifications.push(notification);
        }
    }
}
