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

//! Sequence number to storage key conversion.
//!
//! Keys are the big-endian bytes of the sequence number, so comparing two
//! keys byte by byte orders them the same way as the numbers they encode.
//! Recovery depends on this: the first and last key in the table are the
//! lowest and highest live sequence numbers.

/// Width of an encoded key in bytes.
pub const KEY_LEN: usize = 8;

/// An encoded sequence key.
pub type SequenceKey = [u8; KEY_LEN];

/// Encode a sequence number as a fixed-width, order-preserving key.
#[inline]
#[must_use]
pub const fn encode(seq: u64) -> SequenceKey { seq.to_be_bytes() }

/// Decode a key produced by [`encode`].
///
/// Returns `None` if the key is not exactly [`KEY_LEN`] bytes wide.
#[inline]
#[must_use]
pub fn decode(key: &[u8]) -> Option<u64> {
    let bytes: SequenceKey = key.try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(0 ; "zero")]
    #[test_case(1 ; "first sequence")]
    #[test_case(255 ; "single byte boundary")]
    #[test_case(256 ; "two byte boundary")]
    #[test_case(u64::MAX ; "max")]
    fn test_decode_inverts_encode(seq: u64) {
        assert_eq!(decode(&encode(seq)), Some(seq));
    }

    #[test]
    fn test_encoding_is_big_endian() {
        assert_eq!(encode(1), [0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(encode(0x0102), [0, 0, 0, 0, 0, 0, 1, 2]);
    }

    #[test_case(1, 2 ; "adjacent")]
    #[test_case(255, 256 ; "carry into second byte")]
    #[test_case(65_535, 65_536 ; "carry into third byte")]
    #[test_case(1, u64::MAX ; "extremes")]
    fn test_byte_order_matches_numeric_order(lower: u64, higher: u64) {
        assert!(encode(lower).as_slice() < encode(higher).as_slice());
    }

    #[test_case(&[] ; "empty")]
    #[test_case(&[1, 2, 3] ; "short")]
    #[test_case(&[0; 9] ; "long")]
    fn test_decode_rejects_wrong_width(key: &[u8]) {
        assert_eq!(decode(key), None);
    }
}
