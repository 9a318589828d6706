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

use uniquecount::hllmap::HllMap;
use uniquecount::hllmap::pack_coupon;

fn coupon_for(i: u32) -> u32 {
    pack_coupon(i % 1024, (i % 62) as u8 + 1)
}

#[test]
fn test_resize_trigger_and_sizes() {
    let mut map = HllMap::new(4, 1024).unwrap();

    // Fill to capacity; the table must not grow yet.
    for i in 0u32..147 {
        map.update(&i.to_be_bytes(), coupon_for(i)).unwrap();
    }
    assert_eq!(map.table_entries(), 157);
    assert_eq!(map.current_count_entries(), 147);

    // The 148th distinct key pushes past 15/16 occupancy.
    map.update(&147u32.to_be_bytes(), coupon_for(147)).unwrap();
    assert_eq!(map.table_entries(), 317);
    assert_eq!(map.capacity_entries(), 297);
    assert_eq!(map.current_count_entries(), 148);
}

#[test]
fn test_resize_preserves_estimates() {
    let mut map = HllMap::new(4, 1024).unwrap();
    for i in 0u32..147 {
        map.update(&i.to_be_bytes(), coupon_for(i)).unwrap();
    }

    let before: Vec<f64> = (0u32..147).map(|i| map.estimate(&i.to_be_bytes())).collect();

    map.update(&147u32.to_be_bytes(), coupon_for(147)).unwrap();
    assert_eq!(map.table_entries(), 317);

    for (i, expected) in before.iter().enumerate() {
        let estimate = map.estimate(&(i as u32).to_be_bytes());
        assert_eq!(estimate, *expected, "estimate for key {i} changed in resize");
    }
}

#[test]
fn test_capacity_invariant_through_growth() {
    let mut map = HllMap::new(4, 1024).unwrap();
    for i in 0u32..2_000 {
        map.update(&i.to_be_bytes(), coupon_for(i)).unwrap();
        assert!(
            map.current_count_entries() <= map.capacity_entries(),
            "occupancy above capacity after key {i}"
        );
        assert!(map.capacity_entries() <= map.table_entries());
    }

    // 157 -> 317 -> 641 -> 1283 -> 2579.
    assert_eq!(map.table_entries(), 2579);
    assert_eq!(map.current_count_entries(), 2_000);

    for i in 0u32..2_000 {
        assert!(map.estimate(&i.to_be_bytes()) > 0.0, "key {i} lost");
    }
}

#[test]
fn test_memory_usage_tracks_growth() {
    let mut map = HllMap::new(4, 1024).unwrap();
    let initial = map.memory_usage_bytes();

    for i in 0u32..200 {
        map.update(&i.to_be_bytes(), coupon_for(i)).unwrap();
    }

    let grown = map.memory_usage_bytes();
    assert!(grown > initial);
    // Entry cost self-report is a constant per configuration.
    assert_eq!(map.entry_size_bytes(), HllMap::new(4, 1024).unwrap().entry_size_bytes());
}

#[test]
fn test_growth_with_wide_keys() {
    let mut map = HllMap::new(16, 1024).unwrap();
    for i in 0u32..400 {
        let mut key = [0u8; 16];
        key[..4].copy_from_slice(&i.to_be_bytes());
        key[12..].copy_from_slice(&i.to_be_bytes());
        map.update(&key, coupon_for(i)).unwrap();
    }

    assert_eq!(map.current_count_entries(), 400);
    assert_eq!(map.table_entries(), 641);

    let mut key = [0u8; 16];
    key[..4].copy_from_slice(&123u32.to_be_bytes());
    key[12..].copy_from_slice(&123u32.to_be_bytes());
    assert!(map.estimate(&key) > 0.0);
}
