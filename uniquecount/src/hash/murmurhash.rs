// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

/// Hashes `bytes` with MurmurHash3 x64 128 and returns both 64-bit halves.
#[inline]
pub(crate) fn murmur3_x64_128(bytes: &[u8], seed: u32) -> (u64, u64) {
    mur3::murmurhash3_x64_128(bytes, seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::DEFAULT_UPDATE_SEED;

    #[test]
    fn test_known_answers() {
        // remainder > 8
        let key = "The quick brown fox jumps over the lazy dog";
        let (h1, h2) = murmur3_x64_128(key.as_bytes(), 0);
        assert_eq!(h1, 0xe34bbc7bbc071b6c);
        assert_eq!(h2, 0x7a433ca9c49a9347);

        // remainder = 0
        let key = "The quick brown fox jumps over t";
        let (h1, h2) = murmur3_x64_128(key.as_bytes(), 0);
        assert_eq!(h1, 0xdf6af91bb29bdacf);
        assert_eq!(h2, 0x91a341c58df1f3a6);
    }

    #[test]
    fn test_seed_changes_hash() {
        let key = [1u8, 2, 3, 4];
        assert_ne!(
            murmur3_x64_128(&key, 0),
            murmur3_x64_128(&key, DEFAULT_UPDATE_SEED)
        );
    }

    #[test]
    fn test_zero_bytes_are_hashed() {
        // Keys of all-zero bytes are legal content and must still spread.
        assert_ne!(
            murmur3_x64_128(&[0u8; 4], 9001),
            murmur3_x64_128(&[0u8; 8], 9001)
        );
    }
}
