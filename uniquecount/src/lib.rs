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

//! Approximate distinct counting for keyed streams.
//!
//! The crate maintains, for every key in a stream of (key, identifier)
//! pairs, a compact HyperLogLog sketch with a HIP estimator, so that the
//! number of distinct identifiers per key can be queried at any time with
//! bounded relative error. See [`hllmap`] for the data structure and the
//! coupon encoding that feeds it.
//!
//! ```rust
//! use uniquecount::hllmap::coupon16;
//! use uniquecount::hllmap::HllMap;
//!
//! let mut map = HllMap::new(8, 1024).unwrap();
//! map.update(b"customer", coupon16(b"event-1")).unwrap();
//! map.update(b"customer", coupon16(b"event-2")).unwrap();
//! assert!(map.estimate(b"customer") > 0.0);
//! ```

pub mod error;
pub mod hllmap;

mod common;
mod hash;
