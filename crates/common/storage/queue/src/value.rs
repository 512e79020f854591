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

//! Text and structured-value wrappers around the byte-level operations.
//!
//! Values are encoded before [`Queue::push`] and decoded after
//! [`Queue::pop`] / [`Queue::peek`]; the stored payload is plain bytes.
//! A decode failure after a pop does not put the element back.

use serde::{Serialize, de::DeserializeOwned};
use snafu::ResultExt;

use crate::{
    Queue, Result,
    error::{CodecSnafu, Utf8Snafu},
};

impl Queue {
    /// Push a UTF-8 string.
    pub fn push_str(&self, value: &str) -> Result<u64> { self.push(value) }

    /// Pop the head element as a UTF-8 string.
    pub fn pop_string(&self) -> Result<String> {
        String::from_utf8(self.pop()?).context(Utf8Snafu)
    }

    /// Peek the head element as a UTF-8 string.
    pub fn peek_string(&self) -> Result<String> {
        String::from_utf8(self.peek()?).context(Utf8Snafu)
    }

    /// Serialize `value` as JSON and push it.
    pub fn push_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<u64> {
        let bytes = serde_json::to_vec(value).context(CodecSnafu)?;
        self.push(bytes)
    }

    /// Pop the head element and deserialize it from JSON.
    pub fn pop_json<T: DeserializeOwned>(&self) -> Result<T> {
        let bytes = self.pop()?;
        serde_json::from_slice(&bytes).context(CodecSnafu)
    }

    /// Peek the head element and deserialize it from JSON.
    pub fn peek_json<T: DeserializeOwned>(&self) -> Result<T> {
        let bytes = self.peek()?;
        serde_json::from_slice(&bytes).context(CodecSnafu)
    }
}
