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

//! Open-addressing probe engine for the map table.

use crate::error::Error;
use crate::error::ErrorKind;
use crate::hash::DEFAULT_UPDATE_SEED;
use crate::hash::murmur3_x64_128;
use crate::hllmap::is_bit_clear;

/// Outcome of probing for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum SlotSearch {
    /// The key occupies this slot.
    Found(usize),
    /// The key is absent; this is the first empty slot on its probe path.
    Empty(usize),
}

/// Reduces the two hash halves of `key` to a start index and a stride.
///
/// The stride lies in [1, table_entries - 1]; the table size is prime, so the
/// stride is coprime with it and the probe visits every slot once per cycle.
#[inline]
fn probe_sequence(key: &[u8], table_entries: usize) -> (usize, usize) {
    let (h0, h1) = murmur3_x64_128(key, DEFAULT_UPDATE_SEED);
    let index = (h0 % table_entries as u64) as usize;
    let stride = (1 + h1 % (table_entries as u64 - 1)) as usize;
    (index, stride)
}

/// Probes for `key`, reporting either its slot or the first empty slot on
/// its probe path.
///
/// A full cycle without either outcome means the occupancy invariant was
/// broken and is reported as [`ErrorKind::InvariantViolated`].
pub(super) fn find_key(
    keys: &[u8],
    state: &[u8],
    key: &[u8],
    table_entries: usize,
) -> Result<SlotSearch, Error> {
    let key_len = key.len();
    let (mut index, stride) = probe_sequence(key, table_entries);
    let loop_index = index;

    loop {
        if is_bit_clear(state, index) {
            return Ok(SlotSearch::Empty(index));
        }
        if &keys[index * key_len..(index + 1) * key_len] == key {
            return Ok(SlotSearch::Found(index));
        }
        index = (index + stride) % table_entries;
        if index == loop_index {
            return Err(Error::new(
                ErrorKind::InvariantViolated,
                "probe cycled the whole table without a match or an empty slot",
            )
            .with_context("table_entries", table_entries));
        }
    }
}

/// Probes for the first empty slot on `key`'s path.
///
/// Only used while rehashing into a fresh table, where the key is known to be
/// absent, so slot keys are never compared.
pub(super) fn find_empty(key: &[u8], table_entries: usize, state: &[u8]) -> Result<usize, Error> {
    let (mut index, stride) = probe_sequence(key, table_entries);
    let loop_index = index;

    loop {
        if is_bit_clear(state, index) {
            return Ok(index);
        }
        index = (index + stride) % table_entries;
        if index == loop_index {
            return Err(Error::new(ErrorKind::InvariantViolated, "no empty slots")
                .with_context("table_entries", table_entries));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hllmap::set_bit;

    const TABLE: usize = 157;
    const KEY_SIZE: usize = 4;

    fn empty_table() -> (Vec<u8>, Vec<u8>) {
        (vec![0u8; TABLE * KEY_SIZE], vec![0u8; TABLE.div_ceil(8)])
    }

    #[test]
    fn test_stride_stays_in_range() {
        for i in 0u32..2000 {
            let key = i.to_be_bytes();
            let (index, stride) = probe_sequence(&key, TABLE);
            assert!(index < TABLE);
            assert!((1..TABLE).contains(&stride));
        }
    }

    #[test]
    fn test_empty_table_reports_empty_slot() {
        let (keys, state) = empty_table();
        let search = find_key(&keys, &state, &[9, 9, 9, 9], TABLE).unwrap();
        assert!(matches!(search, SlotSearch::Empty(index) if index < TABLE));
    }

    #[test]
    fn test_finds_key_after_insert() {
        let (mut keys, mut state) = empty_table();
        let key = [1u8, 2, 3, 4];
        let SlotSearch::Empty(slot) = find_key(&keys, &state, &key, TABLE).unwrap() else {
            panic!("key must start absent");
        };
        keys[slot * KEY_SIZE..(slot + 1) * KEY_SIZE].copy_from_slice(&key);
        set_bit(&mut state, slot);
        assert_eq!(
            find_key(&keys, &state, &key, TABLE).unwrap(),
            SlotSearch::Found(slot)
        );
    }

    #[test]
    fn test_probe_reaches_the_single_free_slot() {
        // All slots occupied by non-matching keys except one; the stride is
        // coprime with the prime table size, so every probe must land there.
        for free_slot in [0usize, 1, 77, 156] {
            let mut keys = vec![0xFFu8; TABLE * KEY_SIZE];
            let mut state = vec![0u8; TABLE.div_ceil(8)];
            for slot in 0..TABLE {
                if slot != free_slot {
                    set_bit(&mut state, slot);
                }
            }
            keys[free_slot * KEY_SIZE..(free_slot + 1) * KEY_SIZE].fill(0);
            let search = find_key(&keys, &state, &[1, 2, 3, 4], TABLE).unwrap();
            assert_eq!(search, SlotSearch::Empty(free_slot));
            assert_eq!(find_empty(&[1, 2, 3, 4], TABLE, &state).unwrap(), free_slot);
        }
    }

    #[test]
    fn test_full_cycle_is_reported() {
        let keys = vec![0xFFu8; TABLE * KEY_SIZE];
        let mut state = vec![0u8; TABLE.div_ceil(8)];
        for slot in 0..TABLE {
            set_bit(&mut state, slot);
        }

        let err = find_key(&keys, &state, &[1, 2, 3, 4], TABLE).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvariantViolated);

        let err = find_empty(&[1, 2, 3, 4], TABLE, &state).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvariantViolated);
    }
}
