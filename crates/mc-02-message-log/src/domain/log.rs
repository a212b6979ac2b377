//! Bounded event log.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::value::RawValue;
use shared_types::{Envelope, EventKind};

use super::DEFAULT_LOG_CAPACITY;

/// A received envelope. Immutable once logged.
#[derive(Debug, Clone, Serialize)]
pub struct LoggedEvent {
    index: u64,
    kind: Option<EventKind>,
    routing_key: String,
    received_at: DateTime<Utc>,
    envelope: Envelope,
    raw: Box<RawValue>,
}

impl PartialEq for LoggedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
            && self.kind == other.kind
            && self.routing_key == other.routing_key
            && self.received_at == other.received_at
            && self.envelope == other.envelope
            && self.raw.get() == other.raw.get()
    }
}

impl LoggedEvent {
    pub fn index(&self) -> u64 {
        self.index
    }

    /// The decoded event kind; `None` when the envelope's `type` is unknown or
    /// its payload does not fit that kind.
    pub fn kind(&self) -> Option<EventKind> {
        self.kind
    }

    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// The parsed envelope. Top-level fields other than `type`, `payload`
    /// and `timestamp` are only kept in [`LoggedEvent::raw`].
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// The body exactly as sessions received it.
    pub fn raw(&self) -> &RawValue {
        &self.raw
    }
}

/// Result of [`MessageLog::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Appended {
    pub index: u64,
    /// The oldest entry was dropped to make room.
    pub evicted: bool,
}

/// Rotating buffer of the newest `capacity` events.
#[derive(Debug, Clone)]
pub struct MessageLog {
    entries: VecDeque<Arc<LoggedEvent>>,
    capacity: usize,
    next_index: u64,
    evicted: u64,
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl MessageLog {
    /// A capacity of 0 is treated as 1.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            next_index: 0,
            evicted: 0,
        }
    }

    pub fn append(
        &mut self,
        kind: Option<EventKind>,
        envelope: Envelope,
        raw: Box<RawValue>,
        routing_key: impl Into<String>,
        received_at: DateTime<Utc>,
    ) -> Appended {
        let evicted = if self.entries.len() == self.capacity {
            self.entries.pop_front();
            self.evicted += 1;
            true
        } else {
            false
        };

        let index = self.next_index;
        self.next_index += 1;
        self.entries.push_back(Arc::new(LoggedEvent {
            index,
            kind,
            routing_key: routing_key.into(),
            received_at,
            envelope,
            raw,
        }));
        Appended { index, evicted }
    }

    /// The event received as number `index`, unless it has been evicted.
    pub fn get(&self, index: u64) -> Option<Arc<LoggedEvent>> {
        let offset = index.checked_sub(self.first_index())?;
        self.entries.get(usize::try_from(offset).ok()?).cloned()
    }

    /// Up to `limit` retained events with index `>= offset`, oldest first.
    pub fn range(&self, offset: u64, limit: usize) -> Vec<Arc<LoggedEvent>> {
        let skip = offset.saturating_sub(self.first_index());
        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        self.entries.iter().skip(skip).take(limit).cloned().collect()
    }

    /// The newest `n` events, oldest first.
    pub fn latest(&self, n: usize) -> Vec<Arc<LoggedEvent>> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }

    /// Index of the oldest retained event (equals `total_received` when empty).
    pub fn first_index(&self) -> u64 {
        self.next_index - self.entries.len() as u64
    }

    /// Retained events.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events ever appended.
    pub fn total_received(&self) -> u64 {
        self.next_index
    }

    /// Events dropped for capacity.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Drop every retained event. Numbering continues where it left off.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
