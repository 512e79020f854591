// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Main queue struct and lifecycle management.
//!
//! The [`Queue`] owns the store handle and the head/tail cursors. It:
//! - Opens the store file, waiting a bounded time for the file lock
//! - Recovers the cursors from the first and last key in the table
//! - Serializes every push and pop behind one write lock
//!
//! ## Usage
//!
//! ```ignore
//! let queue = Queue::open("/path/to/queue.redb")?;
//!
//! queue.push(b"hello")?;
//! assert_eq!(queue.peek()?, b"hello");
//! assert_eq!(queue.pop()?, b"hello");
//!
//! queue.close()?;
//! ```
//!
//! ## Cursors
//!
//! `head` is the sequence number of the last popped element and `tail` the
//! sequence number of the last pushed one. The table always holds exactly
//! the keys `head + 1 ..= tail`.

use std::{fs, path::Path};

use backon::{BlockingRetryable, ConstantBuilder};
use parking_lot::RwLock;
use redb::{Database, DatabaseError, ReadableDatabase, ReadableTable, TableDefinition};
use snafu::{OptionExt, ResultExt, ensure};
use tracing::{debug, info, warn};

use crate::{
    QueueConfig, Result,
    error::{
        ClosedSnafu, EmptyQueueSnafu, InvalidKeySnafu, IoSnafu, KeyNotFoundSnafu,
        LockTimeoutSnafu, SequenceExhaustedSnafu,
    },
    key,
};

/// The single table holding queued payloads, keyed by encoded sequence.
const FIFO_TABLE: TableDefinition<'static, &'static [u8], &'static [u8]> =
    TableDefinition::new("durq-fifo");

/// Snapshot of the queue cursors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    /// Sequence number of the last popped element (0 if none).
    pub head: u64,
    /// Sequence number of the last pushed element (0 if none).
    pub tail: u64,
}

impl Cursor {
    /// Number of queued elements.
    #[must_use]
    pub const fn len(&self) -> u64 { self.tail - self.head }

    #[must_use]
    pub const fn is_empty(&self) -> bool { self.head == self.tail }
}

struct Inner {
    /// `None` once the queue is closed.
    db:     Option<Database>,
    cursor: Cursor,
}

/// A durable FIFO queue stored in a single redb file.
///
/// The queue is `Send + Sync`; share it between threads with an `Arc`.
/// Pushes and pops take the exclusive lock, peeks and length queries the
/// shared one, so concurrent pushers never race for the same sequence.
pub struct Queue {
    config: QueueConfig,
    inner:  RwLock<Inner>,
}

impl Queue {
    /// Open (or create) a queue at `path` with default settings.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        QueueConfig::builder().path(path.as_ref()).build().open()
    }

    /// Open (or create) a queue described by `config`.
    ///
    /// Waits up to `config.lock_timeout` for another handle to release the
    /// store file, then recovers the cursors from the stored keys.
    #[tracing::instrument(level = "trace", skip_all, fields(path = %config.path.display()), err)]
    pub fn with_config(config: QueueConfig) -> Result<Self> {
        if config.create_dirs
            && let Some(parent) = config.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).context(IoSnafu)?;
        }

        let db = open_database(&config)?;
        ensure_table(&db)?;
        let cursor = recover(&db)?;

        info!(
            path = %config.path.display(),
            head = cursor.head,
            tail = cursor.tail,
            "Queue opened"
        );

        Ok(Self {
            config,
            inner: RwLock::new(Inner {
                db: Some(db),
                cursor,
            }),
        })
    }

    /// Append `payload` to the tail of the queue.
    ///
    /// Returns the sequence number assigned to the element. The tail cursor
    /// only advances once the write has committed. Fails with
    /// [`QueueError::SequenceExhausted`](crate::QueueError::SequenceExhausted)
    /// once the tail has reached `u64::MAX`.
    pub fn push(&self, payload: impl AsRef<[u8]>) -> Result<u64> {
        let mut inner = self.inner.write();
        let Inner { db, cursor } = &mut *inner;
        let db = db.as_ref().context(ClosedSnafu)?;

        let seq = cursor
            .tail
            .checked_add(1)
            .context(SequenceExhaustedSnafu { tail: cursor.tail })?;
        let txn = db.begin_write()?;
        {
            let mut table = txn.open_table(FIFO_TABLE)?;
            table.insert(key::encode(seq).as_slice(), payload.as_ref())?;
        }
        txn.commit()?;

        cursor.tail = seq;
        debug!(seq, len = cursor.len(), "Pushed");
        Ok(seq)
    }

    /// Remove and return the element at the head of the queue.
    ///
    /// Fails with [`QueueError::EmptyQueue`](crate::QueueError::EmptyQueue)
    /// when there is nothing to pop. The read and delete share one
    /// transaction; the head cursor only advances once it has committed.
    pub fn pop(&self) -> Result<Vec<u8>> {
        let mut inner = self.inner.write();
        let Inner { db, cursor } = &mut *inner;
        let db = db.as_ref().context(ClosedSnafu)?;
        ensure!(!cursor.is_empty(), EmptyQueueSnafu);

        let seq = cursor.head + 1;
        let txn = db.begin_write()?;
        let payload = {
            let mut table = txn.open_table(FIFO_TABLE)?;
            let removed = table.remove(key::encode(seq).as_slice())?;
            removed.map(|guard| guard.value().to_vec())
        };

        let Some(payload) = payload else {
            warn!(seq, ?cursor, "Head cursor points at a missing key");
            txn.abort()?;
            return KeyNotFoundSnafu { seq }.fail();
        };
        txn.commit()?;

        cursor.head = seq;
        debug!(seq, len = cursor.len(), "Popped");
        Ok(payload)
    }

    /// Return the element at the head of the queue without removing it.
    pub fn peek(&self) -> Result<Vec<u8>> {
        let inner = self.inner.read();
        let db = inner.db.as_ref().context(ClosedSnafu)?;
        ensure!(!inner.cursor.is_empty(), EmptyQueueSnafu);

        let seq = inner.cursor.head + 1;
        let txn = db.begin_read()?;
        let table = txn.open_table(FIFO_TABLE)?;
        let value = table
            .get(key::encode(seq).as_slice())?
            .context(KeyNotFoundSnafu { seq })?;
        Ok(value.value().to_vec())
    }

    /// Number of queued elements.
    #[must_use]
    pub fn len(&self) -> u64 { self.inner.read().cursor.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Current head and tail cursors.
    #[must_use]
    pub fn cursor(&self) -> Cursor { self.inner.read().cursor }

    #[must_use]
    pub fn is_open(&self) -> bool { self.inner.read().db.is_some() }

    /// Path of the backing store file.
    #[must_use]
    pub fn path(&self) -> &Path { &self.config.path }

    #[must_use]
    pub const fn config(&self) -> &QueueConfig { &self.config }

    /// Close the store and release its file lock.
    ///
    /// Every later operation fails with
    /// [`QueueError::Closed`](crate::QueueError::Closed), including a second
    /// `close`.
    pub fn close(&self) -> Result<()> {
        let db = self.inner.write().db.take().context(ClosedSnafu)?;
        drop(db);
        info!(path = %self.config.path.display(), "Queue closed");
        Ok(())
    }
}

/// Open the store file, retrying while another handle holds its lock.
fn open_database(config: &QueueConfig) -> Result<Database> {
    let backoff = ConstantBuilder::default()
        .with_delay(config.retry_interval())
        .with_max_times(config.lock_retries());

    let create = || {
        let mut builder = Database::builder();
        if let Some(size) = config.cache_size {
            builder.set_cache_size(size);
        }
        builder.create(&config.path)
    };

    create
        .retry(backoff)
        .sleep(std::thread::sleep)
        .when(|e| matches!(e, DatabaseError::DatabaseAlreadyOpen))
        .notify(|_, delay| {
            warn!(
                path = %config.path.display(),
                ?delay,
                "Store file is locked by another handle, retrying"
            );
        })
        .call()
        .map_err(|e| match e {
            DatabaseError::DatabaseAlreadyOpen => LockTimeoutSnafu {
                path:    config.path.clone(),
                timeout: config.lock_timeout,
            }
            .build(),
            other => other.into(),
        })
}

/// Create the queue table on a fresh store.
fn ensure_table(db: &Database) -> Result<()> {
    let txn = db.begin_write()?;
    txn.open_table(FIFO_TABLE)?;
    txn.commit()?;
    Ok(())
}

/// Rebuild the cursors from the lowest and highest stored keys.
///
/// An empty table yields `head = 0, tail = 0`.
fn recover(db: &Database) -> Result<Cursor> {
    let txn = db.begin_read()?;
    let table = txn.open_table(FIFO_TABLE)?;

    let first = table.first()?.map(|(k, _)| sequence_of(k.value())).transpose()?;
    let last = table.last()?.map(|(k, _)| sequence_of(k.value())).transpose()?;

    let cursor = match (first, last) {
        (Some(first), Some(last)) => Cursor {
            head: first - 1,
            tail: last,
        },
        _ => Cursor::default(),
    };

    debug!(head = cursor.head, tail = cursor.tail, len = cursor.len(), "Recovered cursors");
    Ok(cursor)
}

/// Decode a stored key; sequence numbers start at 1, so 0 is never valid.
fn sequence_of(raw: &[u8]) -> Result<u64> {
    let seq = key::decode(raw).context(InvalidKeySnafu {
        key:    raw.to_vec(),
        reason: "expected 8 bytes",
    })?;
    ensure!(
        seq > 0,
        InvalidKeySnafu {
            key:    raw.to_vec(),
            reason: "sequence numbers start at 1",
        }
    );
    Ok(seq)
}
