//! Event sinks for issuer lifecycle notices.
//!
//! Publishing is fire-and-forget: sinks log their own failures and never
//! hand an error back to the reconciler.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::{
    Client,
    runtime::events::{Event, EventType, Recorder, Reporter},
};
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use crate::cancel::run_cancellable;

/// Kubernetes caps event notes at 1KiB.
const MAX_NOTE_BYTES: usize = 1024;
const EVENT_ACTION: &str = "AccountSetup";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventSeverity {
    Normal,
    Warning,
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(
        &self,
        cancel: &CancellationToken,
        object: &ObjectReference,
        severity: EventSeverity,
        reason: &str,
        message: &str,
    );
}

/// Publishes core/v1 events against the issuer object.
#[derive(Clone)]
pub struct KubeEventSink {
    client: Client,
    reporter: Reporter,
}

impl KubeEventSink {
    pub fn new(client: Client, controller: impl Into<String>) -> Self {
        Self {
            client,
            reporter: Reporter {
                controller: controller.into(),
                instance: std::env::var("HOSTNAME").ok(),
            },
        }
    }
}

#[async_trait]
impl EventSink for KubeEventSink {
    async fn emit(
        &self,
        cancel: &CancellationToken,
        object: &ObjectReference,
        severity: EventSeverity,
        reason: &str,
        message: &str,
    ) {
        let recorder = Recorder::new(self.client.clone(), self.reporter.clone(), object.clone());
        let event = build_event(severity, reason, message);

        let publish = async {
            recorder
                .publish(event)
                .await
                .map_err(|err| err.to_string())
        };
        let published = run_cancellable(cancel, publish, || "cancelled".to_string()).await;
        if let Err(err) = published {
            warn!(
                "[events] failed to publish {reason} for {}: {err}",
                describe(object)
            );
        }
    }
}

/// Writes events to the log only.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogEventSink;

#[async_trait]
impl EventSink for LogEventSink {
    async fn emit(
        &self,
        _cancel: &CancellationToken,
        object: &ObjectReference,
        severity: EventSeverity,
        reason: &str,
        message: &str,
    ) {
        match severity {
            EventSeverity::Normal => info!("[events] {} {reason}: {message}", describe(object)),
            EventSeverity::Warning => warn!("[events] {} {reason}: {message}", describe(object)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedEvent {
    pub object_name: Option<String>,
    pub severity: EventSeverity,
    pub reason: String,
    pub message: String,
}

/// Keeps every emitted event in memory.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<RecordedEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl EventSink for MemoryEventSink {
    async fn emit(
        &self,
        _cancel: &CancellationToken,
        object: &ObjectReference,
        severity: EventSeverity,
        reason: &str,
        message: &str,
    ) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedEvent {
                object_name: object.name.clone(),
                severity,
                reason: reason.to_string(),
                message: message.to_string(),
            });
    }
}

fn build_event(severity: EventSeverity, reason: &str, message: &str) -> Event {
    Event {
        type_: match severity {
            EventSeverity::Normal => EventType::Normal,
            EventSeverity::Warning => EventType::Warning,
        },
        reason: reason.to_string(),
        note: Some(truncate_note(message).to_string()),
        action: EVENT_ACTION.to_string(),
        secondary: None,
    }
}

fn describe(object: &ObjectReference) -> String {
    format!(
        "{}/{}/{}",
        object.kind.as_deref().unwrap_or("?"),
        object.namespace.as_deref().unwrap_or("-"),
        object.name.as_deref().unwrap_or("?")
    )
}

fn truncate_note(message: &str) -> &str {
    if message.len() <= MAX_NOTE_BYTES {
        return message;
    }
    let mut end = MAX_NOTE_BYTES;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    &message[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer_ref() -> ObjectReference {
        ObjectReference {
            kind: Some("Issuer".into()),
            namespace: Some("team-a".into()),
            name: Some("letsencrypt".into()),
            ..ObjectReference::default()
        }
    }

    #[tokio::test]
    async fn memory_sink_records_events_in_order() {
        let sink = MemoryEventSink::new();
        let cancel = CancellationToken::new();
        sink.emit(&cancel, &issuer_ref(), EventSeverity::Warning, "ErrVerifyACMEAccount", "first")
            .await;
        sink.emit(&cancel, &issuer_ref(), EventSeverity::Normal, "Other", "second")
            .await;

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].reason, "ErrVerifyACMEAccount");
        assert_eq!(events[0].severity, EventSeverity::Warning);
        assert_eq!(events[0].object_name.as_deref(), Some("letsencrypt"));
        assert_eq!(events[1].message, "second");
    }

    #[test]
    fn builds_warning_event_for_verification_failure() {
        let event = build_event(
            EventSeverity::Warning,
            "ErrVerifyACMEAccount",
            "Failed to verify ACME account: no ACME account URI on record",
        );
        assert_eq!(event.type_, EventType::Warning);
        assert_eq!(event.reason, "ErrVerifyACMEAccount");
        assert_eq!(event.action, "AccountSetup");
        assert_eq!(
            event.note.as_deref(),
            Some("Failed to verify ACME account: no ACME account URI on record")
        );
        assert!(event.secondary.is_none());
    }

    #[test]
    fn built_event_note_is_truncated() {
        let event = build_event(EventSeverity::Normal, "Other", &"x".repeat(MAX_NOTE_BYTES + 10));
        assert_eq!(event.type_, EventType::Normal);
        assert_eq!(event.note.map(|note| note.len()), Some(MAX_NOTE_BYTES));
    }

    #[tokio::test]
    async fn log_sink_accepts_both_severities() {
        let sink = LogEventSink;
        let cancel = CancellationToken::new();
        sink.emit(&cancel, &issuer_ref(), EventSeverity::Normal, "Other", "fine")
            .await;
        sink.emit(&cancel, &issuer_ref(), EventSeverity::Warning, "ErrVerifyACMEAccount", "broken")
            .await;
    }

    #[test]
    fn describes_object_reference() {
        assert_eq!(describe(&issuer_ref()), "Issuer/team-a/letsencrypt");
        assert_eq!(describe(&ObjectReference::default()), "?/-/?");
    }

    #[test]
    fn truncates_long_notes_on_char_boundary() {
        let message = "é".repeat(MAX_NOTE_BYTES);
        let note = truncate_note(&message);
        assert!(note.len() <= MAX_NOTE_BYTES);
        assert!(note.chars().all(|c| c == 'é'));
        assert_eq!(truncate_note("short"), "short");
    }
}
