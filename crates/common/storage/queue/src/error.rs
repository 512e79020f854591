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

use std::{path::PathBuf, string::FromUtf8Error, time::Duration};

use snafu::Snafu;

/// Queue operation errors.
///
/// Errors raised by the storage engine are passed through unchanged in the
/// transparent variants; everything else describes the queue's own state.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum QueueError {
    /// The queue has been closed.
    #[snafu(display("Queue is closed"))]
    Closed,

    /// Pop or peek on a queue with no elements.
    #[snafu(display("Queue is empty"))]
    EmptyQueue,

    /// The cursor points at a key that is not in the store.
    ///
    /// Only raised when the cached cursors and the stored keys disagree.
    #[snafu(display("Key for sequence {seq} not found in store"))]
    KeyNotFound { seq: u64 },

    /// Another handle kept the store file locked for longer than allowed.
    #[snafu(display(
        "Timed out after {timeout:?} waiting for exclusive lock on {}",
        path.display()
    ))]
    LockTimeout { path: PathBuf, timeout: Duration },

    /// The tail cursor is at `u64::MAX`; no further sequence can be assigned.
    #[snafu(display("Sequence numbers exhausted at tail {tail}"))]
    SequenceExhausted { tail: u64 },

    /// A stored key was not produced by the key codec.
    #[snafu(display("Invalid key {key:02x?} in store: {reason}"))]
    InvalidKey { key: Vec<u8>, reason: &'static str },

    /// Structured value could not be encoded or decoded.
    #[snafu(display("Failed to encode/decode value"))]
    Codec {
        source: serde_json::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    /// Popped or peeked payload is not valid UTF-8.
    #[snafu(display("Payload is not valid UTF-8"))]
    Utf8 {
        source: FromUtf8Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    /// Filesystem I/O failure outside the storage engine.
    #[snafu(display("IO error: {source}"))]
    Io {
        source: std::io::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    #[snafu(transparent)]
    Database {
        source: redb::DatabaseError,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    #[snafu(transparent)]
    Transaction {
        source: redb::TransactionError,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    #[snafu(transparent)]
    Table {
        source: redb::TableError,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    #[snafu(transparent)]
    Storage {
        source: redb::StorageError,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    #[snafu(transparent)]
    Commit {
        source: redb::CommitError,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },
}

impl QueueError {
    /// Returns `true` for [`QueueError::EmptyQueue`].
    #[must_use]
    pub const fn is_empty_queue(&self) -> bool { matches!(self, Self::EmptyQueue) }

    /// Returns `true` for [`QueueError::Closed`].
    #[must_use]
    pub const fn is_closed(&self) -> bool { matches!(self, Self::Closed) }

    /// Returns `true` if the error came from the storage engine.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::Database { .. }
                | Self::Transaction { .. }
                | Self::Table { .. }
                | Self::Storage { .. }
                | Self::Commit { .. }
        )
    }

    /// Returns `true` for errors raised by the structured-value wrappers.
    #[must_use]
    pub const fn is_serialization(&self) -> bool {
        matches!(self, Self::Codec { .. } | Self::Utf8 { .. })
    }
}

/// Result type for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;
