//! # bfmatch
//!
//! ## Purpose
//!
//! `bfmatch` is a brute-force k-nearest-neighbor matcher for dense feature
//! descriptors: every query descriptor is compared against every train
//! descriptor under a configurable distance metric, with an optional
//! per-query eligibility mask. Alongside the Rust API the crate exports a
//! flat C-ABI surface (feature `capi`) so foreign runtimes can create a
//! matcher, run knn matches, and release it through opaque pointers.
//!
//! ## Core Types
//!
//! - [`Mat`]: row-major, dynamically-typed 2D matrix ([`ElemType`] tag)
//!   carrying descriptor sets, masks, and match outputs.
//! - [`DistType`]: distance metric selector: `L1` / `L2` over `f32`
//!   descriptors, `Hamming` over bit-packed `u8` descriptors.
//! - [`BruteForceMatcher`]: the engine; one metric per instance, stateless
//!   across calls.
//! - [`MatcherConfig`]: parallelism knobs, serde-friendly, file-loadable.
//!
//! ## Example Usage
//!
//! ```
//! use bfmatch::{BruteForceMatcher, DistType, ElemType, Mat};
//!
//! let query = Mat::from_vec(2, 2, vec![0.0_f32, 0.0, 4.0, 4.0]).unwrap();
//! let train = Mat::from_vec(3, 2, vec![0.0_f32, 1.0, 4.0, 4.5, 9.0, 9.0]).unwrap();
//!
//! let matcher = BruteForceMatcher::new(DistType::L2);
//! let mut train_idx = Mat::new(0, 0, ElemType::I32);
//! let mut distance = Mat::new(0, 0, ElemType::F32);
//! matcher
//!     .knn_match(&query, &train, &mut train_idx, &mut distance, 2)
//!     .unwrap();
//!
//! // One output row per query, k columns, distances ascending.
//! assert_eq!(train_idx.rows(), 2);
//! assert_eq!(train_idx.row::<i32>(0).unwrap()[0], 0);
//! assert_eq!(train_idx.row::<i32>(1).unwrap()[0], 1);
//! ```
//!
//! ## Observability
//!
//! Install a [`MatchMetrics`] implementation via [`set_match_metrics`] to
//! record per-call latency and workload sizes. Engine calls also emit
//! `tracing` debug events; C callers can opt into a default subscriber with
//! the exported `bfmatch_init_logging`.

pub mod dist;
pub mod engine;
pub mod mat;
pub mod metrics;
pub mod types;

#[cfg(feature = "capi")]
pub mod capi;

pub use crate::dist::{DistType, hamming_distance, l1_distance, l2_distance};
pub use crate::engine::{BruteForceMatcher, NO_MATCH_DISTANCE, NO_MATCH_INDEX};
pub use crate::mat::{Element, ElemType, Mat, MatError};
pub use crate::metrics::{MatchMetrics, set_match_metrics};
pub use crate::types::{ConfigError, MatchError, MatcherConfig};
