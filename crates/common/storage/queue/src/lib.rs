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

//! A durable first-in-first-out queue persisted in a single redb file.
//!
//! Each pushed payload is stored under its sequence number, encoded as an
//! 8-byte big-endian key (see [`key`]). The head and tail cursors are not
//! stored; they are recovered from the first and last key when the file is
//! opened.

pub mod config;
pub mod error;
pub mod key;
mod queue;
mod value;

pub use config::QueueConfig;
pub use error::{QueueError, Result};
pub use queue::{Cursor, Queue};
