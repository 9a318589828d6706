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

//! HIP (Historical Inverse Probability) accumulators.
//!
//! Every table entry carries three doubles: the running HIP estimate and the
//! sum of 2^-v over the entry's registers, split into a high-magnitude part
//! (register values below 32) and a low-magnitude part (values 32 and up).
//! The two partial sums differ by a factor of roughly 2^32, so terms as small
//! as 2^-63 are never added directly to a sum close to k and silently lost.

use std::collections::TryReserveError;
use std::mem;

use crate::common::try_zeroed_vec;

/// Per-entry HIP state for the whole map table, kept as parallel arrays.
#[derive(Debug, Clone)]
pub(super) struct HipAccumulator {
    inv_pow2_sum_hi: Vec<f64>,
    inv_pow2_sum_lo: Vec<f64>,
    hip_est_accum: Vec<f64>,
}

impl HipAccumulator {
    /// Allocates all-zero accumulators for `table_entries` entries.
    pub(super) fn with_entries(table_entries: usize) -> Result<Self, TryReserveError> {
        Ok(Self {
            inv_pow2_sum_hi: try_zeroed_vec(table_entries)?,
            inv_pow2_sum_lo: try_zeroed_vec(table_entries)?,
            hip_est_accum: try_zeroed_vec(table_entries)?,
        })
    }

    /// Resets `entry` to the state of a fresh sketch: all k registers are
    /// zero, so the inverse-power sum is k ones and the estimate is zero.
    pub(super) fn init_entry(&mut self, entry: usize, k: usize) {
        self.inv_pow2_sum_hi[entry] = k as f64;
        self.inv_pow2_sum_lo[entry] = 0.0;
        self.hip_est_accum[entry] = 0.0;
    }

    /// Accounts for a register of `entry` rising from `old_value` to
    /// `new_value`.
    ///
    /// The HIP increment k/S must be computed from the sums as they were
    /// before the register change; callers write the register through the
    /// codec only after this returns.
    pub(super) fn update(&mut self, entry: usize, k: usize, old_value: u8, new_value: u8) {
        debug_assert!(new_value > old_value);

        let inv_pow2_sum = self.inv_pow2_sum_hi[entry] + self.inv_pow2_sum_lo[entry];
        let one_over_q = k as f64 / inv_pow2_sum;
        self.hip_est_accum[entry] += one_over_q;

        if old_value < 32 {
            self.inv_pow2_sum_hi[entry] -= inv_pow2(old_value);
        } else {
            self.inv_pow2_sum_lo[entry] -= inv_pow2(old_value);
        }
        if new_value < 32 {
            self.inv_pow2_sum_hi[entry] += inv_pow2(new_value);
        } else {
            self.inv_pow2_sum_lo[entry] += inv_pow2(new_value);
        }
    }

    /// The running HIP estimate of `entry`.
    #[inline]
    pub(super) fn estimate(&self, entry: usize) -> f64 {
        self.hip_est_accum[entry]
    }

    /// High-magnitude partial sum of `entry` (register values below 32).
    #[cfg(test)]
    pub(super) fn sum_hi(&self, entry: usize) -> f64 {
        self.inv_pow2_sum_hi[entry]
    }

    /// Low-magnitude partial sum of `entry` (register values 32 and up).
    #[cfg(test)]
    pub(super) fn sum_lo(&self, entry: usize) -> f64 {
        self.inv_pow2_sum_lo[entry]
    }

    /// Copies the three accumulators of `src_entry` in `src` over `dst_entry`.
    pub(super) fn copy_entry_from(&mut self, src: &HipAccumulator, src_entry: usize, dst_entry: usize) {
        self.inv_pow2_sum_hi[dst_entry] = src.inv_pow2_sum_hi[src_entry];
        self.inv_pow2_sum_lo[dst_entry] = src.inv_pow2_sum_lo[src_entry];
        self.hip_est_accum[dst_entry] = src.hip_est_accum[src_entry];
    }

    /// Bytes held by the three arrays.
    pub(super) fn backing_bytes(&self) -> usize {
        3 * self.hip_est_accum.len() * mem::size_of::<f64>()
    }
}

/// Computes 2^-value with full precision for values up to 63.
#[inline]
pub(super) fn inv_pow2(value: u8) -> f64 {
    if value == 0 {
        1.0
    } else if value <= 63 {
        1.0 / (1u64 << value) as f64
    } else {
        f64::exp2(-(value as f64))
    }
}
