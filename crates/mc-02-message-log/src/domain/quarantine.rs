//! Rejected bus messages, kept for inspection.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared_types::EnvelopeError;

use super::DEFAULT_QUARANTINE_CAPACITY;

/// Raw bodies longer than this are truncated before being kept.
pub const MAX_RAW_PREVIEW: usize = 4096;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuarantinedMessage {
    pub received_at: DateTime<Utc>,
    pub routing_key: String,
    /// Short label: `malformed`, `unknown_kind` or `invalid_payload`.
    pub reason: &'static str,
    pub detail: String,
    /// Body as (lossy) UTF-8, at most [`MAX_RAW_PREVIEW`] bytes.
    pub raw: String,
    pub truncated: bool,
}

#[derive(Debug, Clone)]
pub struct Quarantine {
    entries: VecDeque<QuarantinedMessage>,
    capacity: usize,
    total: u64,
}

impl Default for Quarantine {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_QUARANTINE_CAPACITY)
    }
}

impl Quarantine {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
            total: 0,
        }
    }

    pub fn admit(
        &mut self,
        routing_key: impl Into<String>,
        error: &EnvelopeError,
        raw: &[u8],
        received_at: DateTime<Utc>,
    ) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        let truncated = raw.len() > MAX_RAW_PREVIEW;
        let preview = &raw[..raw.len().min(MAX_RAW_PREVIEW)];
        self.entries.push_back(QuarantinedMessage {
            received_at,
            routing_key: routing_key.into(),
            reason: error.reason(),
            detail: error.to_string(),
            raw: String::from_utf8_lossy(preview).into_owned(),
            truncated,
        });
        self.total += 1;
    }

    /// Retained entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &QuarantinedMessage> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Messages ever quarantined.
    pub fn total(&self) -> u64 {
        self.total
    }
}
