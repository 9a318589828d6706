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

//! The dense keyed HLL map.

use std::collections::TryReserveError;
use std::fmt;
use std::mem;

use crate::common::next_prime;
use crate::common::try_zeroed_vec;
use crate::error::Error;
use crate::error::ErrorKind;
use crate::hllmap::CouponMap;
use crate::hllmap::coupon_value;
use crate::hllmap::estimator::HipAccumulator;
use crate::hllmap::is_bit_clear;
use crate::hllmap::probe::SlotSearch;
use crate::hllmap::probe::find_empty;
use crate::hllmap::probe::find_key;
use crate::hllmap::registers::RegisterTable;
use crate::hllmap::set_bit;

const LOAD_FACTOR: f64 = 15.0 / 16.0;
const HLL_INIT_NUM_ENTRIES: usize = 157;
const HLL_RESIZE_FACTOR: f64 = 2.0;
/// One-standard-deviation relative error of the HIP estimator for k = 1024.
/// TODO: scale the envelope by the configured k instead of assuming 1024.
const RSE: f64 = 0.836 / 32.0;

/// A key-value map where the value is a compact HLL sketch of size k.
///
/// Keys are fixed-length byte strings placed by double hashing into a table
/// whose size is always prime, growing at 15/16 occupancy. Each entry packs
/// its k six-bit registers ten to a 64-bit word and carries three doubles
/// that track the HIP (Historical Inverse Probability) estimator, so
/// [`update`](HllMap::update) returns the refreshed estimate without ever
/// scanning the register array.
///
/// # Examples
///
/// ```
/// use uniquecount::hllmap::coupon16;
/// use uniquecount::hllmap::HllMap;
///
/// let mut map = HllMap::new(4, 1024)?;
/// for id in 0u32..100 {
///     map.update(b"key1", coupon16(&id.to_be_bytes()))?;
/// }
/// assert!(map.estimate(b"key1") > 0.0);
/// assert_eq!(map.estimate(b"key2"), 0.0);
/// # Ok::<(), uniquecount::error::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct HllMap {
    key_size_bytes: usize,
    k: usize,
    entry_size_bytes: f64,

    table_entries: usize,
    capacity_entries: usize,
    cur_count_entries: usize,
    growth_factor: f64,

    keys: Vec<u8>,
    registers: RegisterTable,
    accumulators: HipAccumulator,
    state: Vec<u8>,
}

impl HllMap {
    /// Creates an empty map for keys of `key_size_bytes` bytes and HLL
    /// sketches of `k` registers each.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`] if the key size is zero or `k`
    /// is not a power of two in `[16, 2^26]`.
    pub fn new(key_size_bytes: usize, k: usize) -> Result<Self, Error> {
        if key_size_bytes == 0 {
            return Err(Error::new(
                ErrorKind::ConfigInvalid,
                "key size must be at least one byte",
            ));
        }
        if !k.is_power_of_two() || !(16..=1 << 26).contains(&k) {
            return Err(Error::new(
                ErrorKind::ConfigInvalid,
                "k must be a power of two in [16, 2^26]",
            )
            .with_context("k", k));
        }

        let table_entries = HLL_INIT_NUM_ENTRIES;
        let byte_fraction = (table_entries as f64 / 8.0).ceil() / table_entries as f64;
        let entry_size_bytes = key_size_bytes as f64
            + (RegisterTable::words_per_entry(k) * mem::size_of::<u64>()) as f64
            + (3 * mem::size_of::<f64>()) as f64
            + byte_fraction;

        Ok(Self {
            key_size_bytes,
            k,
            entry_size_bytes,
            table_entries,
            capacity_entries: (table_entries as f64 * LOAD_FACTOR) as usize,
            cur_count_entries: 0,
            growth_factor: HLL_RESIZE_FACTOR,
            keys: try_zeroed_vec(table_entries * key_size_bytes).map_err(alloc_error)?,
            registers: RegisterTable::with_entries(table_entries, k).map_err(alloc_error)?,
            accumulators: HipAccumulator::with_entries(table_entries).map_err(alloc_error)?,
            state: try_zeroed_vec(table_entries.div_ceil(8)).map_err(alloc_error)?,
        })
    }

    /// Feeds one `coupon` observation for `key` and returns the refreshed
    /// estimate of how many distinct coupons `key` has seen.
    ///
    /// A coupon that does not raise its register leaves the entry untouched
    /// and returns the current estimate.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::InvalidArgument`] if the key length does not match the
    /// map, [`ErrorKind::AllocationFailed`] if a triggered resize could not
    /// allocate (the map stays usable and retries on a later insert), and
    /// [`ErrorKind::InvariantViolated`] if the table is corrupt.
    pub fn update(&mut self, key: &[u8], coupon: u32) -> Result<f64, Error> {
        if key.len() != self.key_size_bytes {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "key length does not match the map's key size",
            )
            .with_context("key_len", key.len())
            .with_context("key_size_bytes", self.key_size_bytes));
        }
        let entry = self.find_or_insert_key(key)?;
        self.update_hll(entry, coupon);
        Ok(self.accumulators.estimate(entry))
    }

    /// Returns the current estimate for `key`, or 0.0 if the key has never
    /// been updated. A key of the wrong length matches no entry.
    pub fn estimate(&self, key: &[u8]) -> f64 {
        if key.len() != self.key_size_bytes {
            return 0.0;
        }
        let Ok(search) = find_key(&self.keys, &self.state, key, self.table_entries) else {
            // The capacity bound keeps at least one slot empty, so the probe
            // always terminates.
            unreachable!("probe cycled a table that is below capacity");
        };
        match search {
            SlotSearch::Found(entry) => self.accumulators.estimate(entry),
            SlotSearch::Empty(_) => 0.0,
        }
    }

    /// Upper one-standard-deviation bound on [`estimate`](HllMap::estimate).
    pub fn upper_bound(&self, key: &[u8]) -> f64 {
        self.estimate(key) * (1.0 + RSE)
    }

    /// Lower one-standard-deviation bound on [`estimate`](HllMap::estimate).
    pub fn lower_bound(&self, key: &[u8]) -> f64 {
        self.estimate(key) * (1.0 - RSE)
    }

    /// Average bytes one entry costs: key bytes, register words, the three
    /// HIP doubles and the entry's share of the occupancy bitmap.
    pub fn entry_size_bytes(&self) -> f64 {
        self.entry_size_bytes
    }

    /// Total bytes held by the backing arrays and the map header.
    pub fn memory_usage_bytes(&self) -> usize {
        self.keys.len()
            + self.registers.backing_bytes()
            + self.accumulators.backing_bytes()
            + self.state.len()
            + mem::size_of::<Self>()
    }

    /// Full size of the table, always prime.
    pub fn table_entries(&self) -> usize {
        self.table_entries
    }

    /// Entry count at which the table grows: 15/16 of the table size.
    pub fn capacity_entries(&self) -> usize {
        self.capacity_entries
    }

    /// Number of live entries.
    pub fn current_count_entries(&self) -> usize {
        self.cur_count_entries
    }

    /// Number of HLL registers per entry.
    pub fn k(&self) -> usize {
        self.k
    }

    fn find_or_insert_key(&mut self, key: &[u8]) -> Result<usize, Error> {
        match find_key(&self.keys, &self.state, key, self.table_entries)? {
            SlotSearch::Found(entry) => Ok(entry),
            SlotSearch::Empty(entry) => {
                self.insert_key(entry, key);
                if self.cur_count_entries <= self.capacity_entries {
                    return Ok(entry);
                }
                self.resize()?;
                match find_key(&self.keys, &self.state, key, self.table_entries)? {
                    SlotSearch::Found(entry) => Ok(entry),
                    SlotSearch::Empty(_) => Err(Error::new(
                        ErrorKind::InvariantViolated,
                        "live key missing after resize",
                    )),
                }
            }
        }
    }

    fn insert_key(&mut self, entry: usize, key: &[u8]) {
        self.keys[entry * self.key_size_bytes..(entry + 1) * self.key_size_bytes]
            .copy_from_slice(key);
        set_bit(&mut self.state, entry);
        self.accumulators.init_entry(entry, self.k);
        self.cur_count_entries += 1;
    }

    /// Applies `coupon` to `entry`, keeping registers and HIP state in step.
    fn update_hll(&mut self, entry: usize, coupon: u32) {
        let reg = (coupon as usize) & (self.k - 1);
        let new_value = coupon_value(coupon);
        let old_value = self.registers.get(entry, reg);
        if new_value <= old_value {
            return;
        }
        // The HIP increment must see the sums as they were before this
        // register rises.
        self.accumulators.update(entry, self.k, old_value, new_value);
        self.registers.put(entry, reg, new_value);
    }

    /// Rehashes every live entry into a table of the next prime size at
    /// least `growth_factor` times the current one. On allocation failure
    /// the map is left exactly as it was.
    fn resize(&mut self) -> Result<(), Error> {
        let new_table_entries =
            next_prime((self.table_entries as f64 * self.growth_factor).ceil() as usize);
        let new_capacity_entries = (new_table_entries as f64 * LOAD_FACTOR) as usize;

        let mut new_keys: Vec<u8> =
            try_zeroed_vec(new_table_entries * self.key_size_bytes).map_err(alloc_error)?;
        let mut new_registers =
            RegisterTable::with_entries(new_table_entries, self.k).map_err(alloc_error)?;
        let mut new_accumulators =
            HipAccumulator::with_entries(new_table_entries).map_err(alloc_error)?;
        let mut new_state: Vec<u8> =
            try_zeroed_vec(new_table_entries.div_ceil(8)).map_err(alloc_error)?;

        for old_entry in 0..self.table_entries {
            if is_bit_clear(&self.state, old_entry) {
                continue;
            }
            let key =
                &self.keys[old_entry * self.key_size_bytes..(old_entry + 1) * self.key_size_bytes];
            let new_entry = find_empty(key, new_table_entries, &new_state)?;
            new_keys[new_entry * self.key_size_bytes..(new_entry + 1) * self.key_size_bytes]
                .copy_from_slice(key);
            new_registers.copy_entry_from(&self.registers, old_entry, new_entry);
            new_accumulators.copy_entry_from(&self.accumulators, old_entry, new_entry);
            set_bit(&mut new_state, new_entry);
        }

        self.table_entries = new_table_entries;
        self.capacity_entries = new_capacity_entries;
        // cur_count_entries and growth_factor carry over.
        self.keys = new_keys;
        self.registers = new_registers;
        self.accumulators = new_accumulators;
        self.state = new_state;
        Ok(())
    }
}

fn alloc_error(source: TryReserveError) -> Error {
    Error::new(ErrorKind::AllocationFailed, "could not allocate map table").set_source(source)
}

impl CouponMap for HllMap {
    fn update(&mut self, key: &[u8], coupon: u32) -> Result<f64, Error> {
        HllMap::update(self, key, coupon)
    }

    fn estimate(&self, key: &[u8]) -> f64 {
        HllMap::estimate(self, key)
    }

    fn upper_bound(&self, key: &[u8]) -> f64 {
        HllMap::upper_bound(self, key)
    }

    fn lower_bound(&self, key: &[u8]) -> f64 {
        HllMap::lower_bound(self, key)
    }

    fn entry_size_bytes(&self) -> f64 {
        HllMap::entry_size_bytes(self)
    }

    fn memory_usage_bytes(&self) -> usize {
        HllMap::memory_usage_bytes(self)
    }

    fn table_entries(&self) -> usize {
        HllMap::table_entries(self)
    }

    fn capacity_entries(&self) -> usize {
        HllMap::capacity_entries(self)
    }

    fn current_count_entries(&self) -> usize {
        HllMap::current_count_entries(self)
    }
}

impl fmt::Display for HllMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "### HllMap SUMMARY:")?;
        writeln!(f, "    HLL k                 : {}", self.k)?;
        writeln!(f, "    Table Entries         : {}", self.table_entries)?;
        writeln!(f, "    Capacity Entries      : {}", self.capacity_entries)?;
        writeln!(f, "    Current Count Entries : {}", self.cur_count_entries)?;
        writeln!(f, "    Entry Size Bytes      : {:.3}", self.entry_size_bytes)?;
        writeln!(f, "    Memory Usage Bytes    : {}", self.memory_usage_bytes())?;
        writeln!(f, "### END SKETCH SUMMARY")
    }
}
