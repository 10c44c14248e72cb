//! Brute-force k-nearest-neighbor matching over descriptor matrices.
//!
//! The engine compares every query descriptor against every train descriptor
//! (no indexing), materializing the full pairwise-distance matrix as a
//! call-scoped temporary and then selecting the k nearest train rows per
//! query. Masked and unmasked matching are separate entry points; the mask
//! restricts which train rows are eligible per query.

use std::time::Instant;

use crate::dist::{self, DistType, hamming_distance, l1_distance, l2_distance};
use crate::mat::{Element, ElemType, Mat};
use crate::metrics::metrics_recorder;
use crate::types::{MatchError, MatcherConfig};


/// Index value written for output slots with no eligible train row.
pub const NO_MATCH_INDEX: i32 = -1;

/// Distance value written for output slots with no eligible train row.
pub const NO_MATCH_DISTANCE: f32 = f32::INFINITY;

/// Exhaustive k-NN matcher over dense descriptor sets.
///
/// A matcher is parameterized at construction by a [`DistType`] and holds no
/// other state; every call is independent. Concurrent use of one instance
/// from multiple threads is safe because calls borrow all inputs and outputs
/// for their own duration only.
pub struct BruteForceMatcher {
    dist_type: DistType,
    cfg: MatcherConfig,
}

impl BruteForceMatcher {
    /// Construct a matcher with the given metric and default configuration.
    pub fn new(dist_type: DistType) -> Self {
        Self::with_config(dist_type, MatcherConfig::default())
    }

    /// Construct a matcher with an explicit configuration.
    pub fn with_config(dist_type: DistType, cfg: MatcherConfig) -> Self {
        Self { dist_type, cfg }
    }

    pub fn dist_type(&self) -> DistType {
        self.dist_type
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.cfg
    }

    /// Match every query descriptor against every train descriptor.
    ///
    /// `train_idx` is resized to Q x k `i32` and `distance` to Q x k `f32`,
    /// then filled per query row with the k nearest train indices and their
    /// distances, ascending, ties broken by lower train index. Rows with
    /// fewer than k candidates (k > T) pad the tail with
    /// [`NO_MATCH_INDEX`] / [`NO_MATCH_DISTANCE`].
    pub fn knn_match(
        &self,
        query: &Mat,
        train: &Mat,
        train_idx: &mut Mat,
        distance: &mut Mat,
        k: usize,
    ) -> Result<(), MatchError> {
        self.knn_match_impl(query, train, train_idx, distance, k, None)
    }

    /// Masked variant of [`knn_match`](Self::knn_match).
    ///
    /// `mask` must be a Q x T `u8` matrix; a zero entry makes that train row
    /// ineligible for that query. Queries whose mask row is all zero produce
    /// a fully padded output row.
    pub fn knn_match_masked(
        &self,
        query: &Mat,
        train: &Mat,
        train_idx: &mut Mat,
        distance: &mut Mat,
        k: usize,
        mask: &Mat,
    ) -> Result<(), MatchError> {
        self.knn_match_impl(query, train, train_idx, distance, k, Some(mask))
    }

    fn knn_match_impl(
        &self,
        query: &Mat,
        train: &Mat,
        train_idx: &mut Mat,
        distance: &mut Mat,
        k: usize,
        mask: Option<&Mat>,
    ) -> Result<(), MatchError> {
        self.validate(query, train, k, mask)?;

        let start = Instant::now();
        let q = query.rows();
        let t = train.rows();
        let dim = query.cols();
        let run_parallel = self.cfg.use_parallel && q >= self.cfg.min_parallel_queries;

        train_idx.resize(q, k, ElemType::I32);
        distance.resize(q, k, ElemType::F32);

        // Full pairwise-distance matrix, allocated fresh per call and
        // discarded on return.
        let mut all_dist = Mat::new(q, t, ElemType::F32);
        if q > 0 && t > 0 {
            let pairs = all_dist.as_slice_mut::<f32>()?;
            match self.dist_type {
                DistType::L1 => fill_pairwise(
                    query.as_slice::<f32>()?,
                    train.as_slice::<f32>()?,
                    dim,
                    l1_distance,
                    pairs,
                    run_parallel,
                ),
                DistType::L2 => fill_pairwise(
                    query.as_slice::<f32>()?,
                    train.as_slice::<f32>()?,
                    dim,
                    l2_distance,
                    pairs,
                    run_parallel,
                ),
                DistType::Hamming => fill_pairwise(
                    query.as_slice::<u8>()?,
                    train.as_slice::<u8>()?,
                    dim,
                    hamming_distance,
                    pairs,
                    run_parallel,
                ),
            }
        }

        let pairs = all_dist.as_slice::<f32>()?;
        let mask_data = match mask {
            Some(m) => Some(m.as_slice::<u8>()?),
            None => None,
        };
        select_all_rows(
            pairs,
            mask_data,
            t,
            train_idx.as_slice_mut::<i32>()?,
            distance.as_slice_mut::<f32>()?,
            k,
            run_parallel,
        );

        let latency = start.elapsed();
        tracing::debug!(
            dist_type = ?self.dist_type,
            queries = q,
            train_rows = t,
            k,
            masked = mask.is_some(),
            elapsed_micros = latency.as_micros() as u64,
            "knn_match"
        );
        if let Some(recorder) = metrics_recorder() {
            recorder.record_knn_match(self.dist_type, q, t, k, latency);
        }

        Ok(())
    }

    fn validate(
        &self,
        query: &Mat,
        train: &Mat,
        k: usize,
        mask: Option<&Mat>,
    ) -> Result<(), MatchError> {
        self.cfg.validate()?;
        if k == 0 {
            return Err(MatchError::InvalidK(k));
        }
        let expected = self.dist_type.elem_type();
        for descriptors in [query, train] {
            if descriptors.elem() != expected {
                return Err(MatchError::DescriptorType {
                    dist_type: self.dist_type,
                    expected,
                    actual: descriptors.elem(),
                });
            }
        }
        if query.cols() == 0 {
            return Err(MatchError::EmptyDescriptors);
        }
        if query.cols() != train.cols() {
            return Err(MatchError::DimensionMismatch {
                query: query.cols(),
                train: train.cols(),
            });
        }
        if let Some(m) = mask
            && (m.elem() != ElemType::U8 || m.rows() != query.rows() || m.cols() != train.rows())
        {
            return Err(MatchError::MaskShape {
                rows: query.rows(),
                cols: train.rows(),
                actual_rows: m.rows(),
                actual_cols: m.cols(),
                actual_elem: m.elem(),
            });
        }
        Ok(())
    }
}

/// Fill `out` (Q x T, row-major) with `kernel(query_row, train_row)` for
/// every pair. `qdata`/`tdata` are row-major with `dim` columns; both are
/// non-empty by the time this runs.
fn fill_pairwise<T: Element>(
    qdata: &[T],
    tdata: &[T],
    dim: usize,
    kernel: fn(&[T], &[T]) -> f32,
    out: &mut [f32],
    use_parallel: bool,
) {
    let t = tdata.len() / dim;
    let fill_row = |qrow: &[T], orow: &mut [f32]| {
        dist::dispatch(|| {
            for (o, trow) in orow.iter_mut().zip(tdata.chunks_exact(dim)) {
                *o = kernel(qrow, trow);
            }
        });
    };

    #[cfg(feature = "parallel")]
    if use_parallel {
        use rayon::prelude::*;
        out.par_chunks_mut(t)
            .zip(qdata.par_chunks(dim))
            .for_each(|(orow, qrow)| fill_row(qrow, orow));
        return;
    }
    #[cfg(not(feature = "parallel"))]
    let _ = use_parallel;

    for (orow, qrow) in out.chunks_mut(t).zip(qdata.chunks(dim)) {
        fill_row(qrow, orow);
    }
}

/// Select the k nearest train rows for every query from the pairwise matrix.
fn select_all_rows(
    pairs: &[f32],
    mask_data: Option<&[u8]>,
    t: usize,
    idx_out: &mut [i32],
    dist_out: &mut [f32],
    k: usize,
    use_parallel: bool,
) {
    let select = |i: usize, irow: &mut [i32], drow: &mut [f32]| {
        let row = &pairs[i * t..(i + 1) * t];
        let mask_row = mask_data.map(|m| &m[i * t..(i + 1) * t]);
        select_row(row, mask_row, irow, drow);
    };

    #[cfg(feature = "parallel")]
    if use_parallel {
        use rayon::prelude::*;
        idx_out
            .par_chunks_mut(k)
            .zip(dist_out.par_chunks_mut(k))
            .enumerate()
            .for_each(|(i, (irow, drow))| select(i, irow, drow));
        return;
    }
    #[cfg(not(feature = "parallel"))]
    let _ = use_parallel;

    for (i, (irow, drow)) in idx_out.chunks_mut(k).zip(dist_out.chunks_mut(k)).enumerate() {
        select(i, irow, drow);
    }
}

/// Pick the k nearest eligible candidates from one pairwise row, ascending
/// distance, ties to the lower train index, padding exhausted slots.
fn select_row(row_dist: &[f32], mask_row: Option<&[u8]>, idx_out: &mut [i32], dist_out: &mut [f32]) {
    let mut candidates: Vec<(f32, usize)> = row_dist
        .iter()
        .enumerate()
        .filter(|&(j, _)| mask_row.is_none_or(|m| m[j] != 0))
        .map(|(j, &d)| (d, j))
        .collect();
    candidates.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut nearest = candidates.into_iter();
    for (idx_slot, dist_slot) in idx_out.iter_mut().zip(dist_out) {
        match nearest.next() {
            Some((d, j)) => {
                *idx_slot = j as i32;
                *dist_slot = d;
            }
            None => {
                *idx_slot = NO_MATCH_INDEX;
                *dist_slot = NO_MATCH_DISTANCE;
            }
        }
    }
}
