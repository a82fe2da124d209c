// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Append-only event store.
//!
//! Two backends share the [`EventStore`] contract:
//! 1. [`MemoryEventStore`] keeps rows in process memory
//! 2. [`JsonlEventStore`] persists one JSON line per row and keeps an
//!    in-memory index for windowed counts
//!
//! Rows are never updated or deleted here. Retention is left to external
//! tooling.

use crate::error::{Result, StoreError};
use crate::event::{Event, EventId, EventType, NewEvent};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Storage contract for detection and attempt events.
pub trait EventStore: Send + Sync {
    /// Append an event and return its id.
    fn append(&self, event: NewEvent) -> impl Future<Output = Result<EventId>> + Send;

    /// Count events of `event_type` for `ip` created strictly after `since`.
    fn count_since(
        &self,
        ip: &str,
        event_type: EventType,
        since: i64,
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Most recent events, newest first.
    fn recent(&self, limit: usize) -> impl Future<Output = Result<Vec<Event>>> + Send;
}

/// Rows plus the next id to hand out.
///
/// `windows` keeps each client's timestamps per event type in ascending
/// order so windowed counts are a binary search instead of a full scan.
#[derive(Debug)]
struct EventIndex {
    events: Vec<Event>,
    windows: HashMap<(String, EventType), Vec<i64>>,
    next_id: EventId,
}

impl EventIndex {
    fn new() -> Self {
        Self {
            events: Vec::new(),
            windows: HashMap::new(),
            next_id: 1,
        }
    }

    fn from_events(events: Vec<Event>) -> Self {
        let mut index = Self::new();
        for event in events {
            index.next_id = index.next_id.max(event.id.saturating_add(1));
            index.push(event);
        }
        index
    }

    fn alloc_id(&mut self) -> EventId {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    fn push(&mut self, event: Event) {
        let times = self
            .windows
            .entry((event.ip.clone(), event.event_type))
            .or_default();
        // Out-of-order timestamps are rare; most inserts land at the end.
        let pos = times.partition_point(|t| *t <= event.time_created);
        times.insert(pos, event.time_created);
        self.events.push(event);
    }

    /// Events strictly after `since`.
    fn count_since(&self, ip: &str, event_type: EventType, since: i64) -> u64 {
        self.windows
            .get(&(ip.to_string(), event_type))
            .map_or(0, |times| {
                (times.len() - times.partition_point(|t| *t <= since)) as u64
            })
    }

    fn recent(&self, limit: usize) -> Vec<Event> {
        self.events.iter().rev().take(limit).cloned().collect()
    }
}

/// In-memory event store.
#[derive(Debug)]
pub struct MemoryEventStore {
    index: RwLock<EventIndex>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self {
            index: RwLock::new(EventIndex::new()),
        }
    }

    /// Number of stored rows.
    pub async fn len(&self) -> usize {
        self.index.read().await.events.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStore for MemoryEventStore {
    async fn append(&self, event: NewEvent) -> Result<EventId> {
        let mut index = self.index.write().await;
        let id = index.alloc_id();
        index.push(Event::from_new(id, event));
        Ok(id)
    }

    async fn count_since(&self, ip: &str, event_type: EventType, since: i64) -> Result<u64> {
        Ok(self.index.read().await.count_since(ip, event_type, since))
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Event>> {
        Ok(self.index.read().await.recent(limit))
    }
}

/// Open log file plus the rows replayed from it.
struct JsonlState {
    file: File,
    index: EventIndex,
    /// The file may end in a partial row; terminate it before the next write.
    torn_tail: bool,
}

/// File-backed event store writing one JSON object per line.
pub struct JsonlEventStore {
    path: PathBuf,
    state: RwLock<JsonlState>,
}

impl JsonlEventStore {
    /// Open the log, creating it (and its directory) if needed, and replay
    /// existing rows so ids keep increasing across restarts.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let content = match fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(StoreError::Io(e)),
        };
        let events = replay(&content);
        let torn_tail = content.last().is_some_and(|b| *b != b'\n');
        if torn_tail {
            warn!(path = %path.display(), "Event log ends in a partial row");
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        info!(path = %path.display(), events = events.len(), "Event log opened");

        Ok(Self {
            path,
            state: RwLock::new(JsonlState {
                file,
                index: EventIndex::from_events(events),
                torn_tail,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Parse stored lines, skipping any that are not valid UTF-8 or not valid
/// events.
fn replay(content: &[u8]) -> Vec<Event> {
    content
        .split(|b| *b == b'\n')
        .enumerate()
        .filter_map(|(n, raw)| {
            let line = match std::str::from_utf8(raw) {
                Ok(line) => line.trim(),
                Err(e) => {
                    warn!(line = n + 1, error = %e, "Skipping non UTF-8 event log line");
                    return None;
                }
            };
            if line.is_empty() {
                return None;
            }
            match serde_json::from_str::<Event>(line) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!(line = n + 1, error = %e, "Skipping malformed event log line");
                    None
                }
            }
        })
        .collect()
}

impl EventStore for JsonlEventStore {
    async fn append(&self, event: NewEvent) -> Result<EventId> {
        let mut state = self.state.write().await;
        let id = state.index.next_id;
        let event = Event::from_new(id, event);

        let mut row = Vec::new();
        if state.torn_tail {
            row.push(b'\n');
        }
        serde_json::to_writer(&mut row, &event)?;
        row.push(b'\n');

        if let Err(e) = write_row(&mut state.file, &row).await {
            // Part of the row may have reached the file.
            state.torn_tail = true;
            return Err(StoreError::Io(e));
        }
        state.torn_tail = false;

        // Only advance once the row is on disk.
        state.index.alloc_id();
        state.index.push(event);
        debug!(id, "Event appended");
        Ok(id)
    }

    async fn count_since(&self, ip: &str, event_type: EventType, since: i64) -> Result<u64> {
        Ok(self.state.read().await.index.count_since(ip, event_type, since))
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Event>> {
        Ok(self.state.read().await.index.recent(limit))
    }
}

async fn write_row(file: &mut File, row: &[u8]) -> std::io::Result<()> {
    file.write_all(row).await?;
    file.flush().await
}

/// Store backend selected at startup.
pub enum EventLog {
    Memory(MemoryEventStore),
    Jsonl(JsonlEventStore),
}

impl EventLog {
    /// Open a file-backed log when a path is configured, otherwise keep
    /// events in memory.
    pub async fn open(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => Ok(Self::Jsonl(JsonlEventStore::open(p).await?)),
            None => Ok(Self::Memory(MemoryEventStore::new())),
        }
    }
}

impl EventStore for EventLog {
    async fn append(&self, event: NewEvent) -> Result<EventId> {
        match self {
            Self::Memory(s) => s.append(event).await,
            Self::Jsonl(s) => s.append(event).await,
        }
    }

    async fn count_since(&self, ip: &str, event_type: EventType, since: i64) -> Result<u64> {
        match self {
            Self::Memory(s) => s.count_since(ip, event_type, since).await,
            Self::Jsonl(s) => s.count_since(ip, event_type, since).await,
        }
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Event>> {
        match self {
            Self::Memory(s) => s.recent(limit).await,
            Self::Jsonl(s) => s.recent(limit).await,
        }
    }
}
