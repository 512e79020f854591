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

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

use crate::{Queue, Result};

/// Queue configuration
#[derive(Debug, Clone, PartialEq, Eq, SmartDefault, bon::Builder, Serialize, Deserialize)]
#[builder(on(PathBuf, into))]
#[serde(default)]
pub struct QueueConfig {
    /// Path to the backing store file
    #[default(_code = "PathBuf::from(\"durq.redb\")")]
    #[builder(default = PathBuf::from("durq.redb"))]
    pub path: PathBuf,

    /// How long to wait for another handle to release the store file
    /// (default: 1 second). Zero means a single attempt.
    #[default(_code = "Duration::from_secs(1)")]
    #[builder(default = Duration::from_secs(1))]
    pub lock_timeout: Duration,

    /// Poll interval while waiting for the store file lock (default: 50ms)
    #[default(_code = "Duration::from_millis(50)")]
    #[builder(default = Duration::from_millis(50))]
    pub lock_retry_interval: Duration,

    /// Page cache size in bytes; the engine default when unset
    pub cache_size: Option<usize>,

    /// Create missing parent directories of `path`
    #[default = true]
    #[builder(default = true)]
    pub create_dirs: bool,
}

impl QueueConfig {
    /// Open (or create) the queue described by this configuration.
    pub fn open(self) -> Result<Queue> { Queue::with_config(self) }

    /// Number of retries that fit into the lock timeout.
    pub(crate) fn lock_retries(&self) -> usize {
        let interval = self.retry_interval().as_nanos();
        usize::try_from(self.lock_timeout.as_nanos().div_ceil(interval)).unwrap_or(usize::MAX)
    }

    /// Retry interval, never shorter than a millisecond.
    pub(crate) fn retry_interval(&self) -> Duration {
        self.lock_retry_interval.max(Duration::from_millis(1))
    }
}
