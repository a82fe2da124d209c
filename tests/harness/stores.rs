// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Event store doubles for degraded-storage tests.

use spamshield::error::{Result, StoreError};
use spamshield::event::{Event, EventId, EventType, NewEvent};
use spamshield::store::{EventStore, MemoryEventStore};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Wraps a memory store and fails selected operations.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryEventStore,
    pub fail_append: AtomicBool,
    pub fail_count: AtomicBool,
    pub append_calls: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_appends() -> Self {
        let store = Self::new();
        store.fail_append.store(true, Ordering::SeqCst);
        store
    }

    pub fn failing_counts() -> Self {
        let store = Self::new();
        store.fail_count.store(true, Ordering::SeqCst);
        store
    }

    pub async fn stored(&self) -> usize {
        self.inner.len().await
    }
}

impl EventStore for FlakyStore {
    async fn append(&self, event: NewEvent) -> Result<EventId> {
        self.append_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_append.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("append disabled".to_string()));
        }
        self.inner.append(event).await
    }

    async fn count_since(&self, ip: &str, event_type: EventType, since: i64) -> Result<u64> {
        if self.fail_count.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("count disabled".to_string()));
        }
        self.inner.count_since(ip, event_type, since).await
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Event>> {
        self.inner.recent(limit).await
    }
}
