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

//! Shared helpers for map storage.

use std::collections::TryReserveError;

/// Returns the smallest prime greater than or equal to `n`.
pub(crate) fn next_prime(n: usize) -> usize {
    if n <= 2 {
        return 2;
    }
    let mut candidate = n | 1;
    while !is_prime(candidate) {
        candidate += 2;
    }
    candidate
}

fn is_prime(n: usize) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    if n % 3 == 0 {
        return n == 3;
    }
    // Trial division over 6k +/- 1 candidates.
    let mut divisor = 5;
    while divisor * divisor <= n {
        if n % divisor == 0 || n % (divisor + 2) == 0 {
            return false;
        }
        divisor += 6;
    }
    true
}

/// Allocates a zero-filled vector, reporting allocation failure instead of
/// aborting the process.
pub(crate) fn try_zeroed_vec<T: Copy + Default>(len: usize) -> Result<Vec<T>, TryReserveError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)?;
    v.resize(len, T::default());
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_prime_fixed_points() {
        assert_eq!(next_prime(0), 2);
        assert_eq!(next_prime(2), 2);
        assert_eq!(next_prime(3), 3);
        assert_eq!(next_prime(157), 157);
    }

    #[test]
    fn test_next_prime_growth_chain() {
        // The table growth sequence starting from the initial 157 entries.
        assert_eq!(next_prime(314), 317);
        assert_eq!(next_prime(634), 641);
        assert_eq!(next_prime(1282), 1283);
    }

    #[test]
    fn test_next_prime_skips_composites() {
        assert_eq!(next_prime(8), 11);
        assert_eq!(next_prime(90), 97);
        assert_eq!(next_prime(7918), 7919);
    }

    #[test]
    fn test_try_zeroed_vec() {
        let v: Vec<u64> = try_zeroed_vec(16).unwrap();
        assert_eq!(v.len(), 16);
        assert!(v.iter().all(|&w| w == 0));
    }
}
