//! C-callable export surface.
//!
//! This module flattens the matcher into a C calling convention for foreign
//! callers: construction, destruction, and one knn-match entry point, all
//! over opaque pointers, plus the matrix constructors those callers need to
//! stage descriptors and read results back.
//!
//! The layer is a direct, unchecked forwarding layer. It validates nothing:
//! pointer validity, the create/use/release ordering, and balanced
//! create/release pairs are the caller's contract, and any failure the
//! engine raises is fatal here. There is no error channel in these
//! signatures, so the error is logged and the process aborts. Matrices
//! passed to a call are borrowed for that call only; the only pointer that
//! outlives a call is the matcher handle itself.

use std::process;

use crate::dist::DistType;
use crate::engine::BruteForceMatcher;
use crate::mat::{ElemType, Mat};

/// No error channel exists in the C signatures, so engine failures are
/// unrecoverable here: log and abort, loudly.
fn fatal(entry_point: &str, err: &dyn std::fmt::Display) -> ! {
    tracing::error!(error = %err, entry_point, "unrecoverable failure at the C boundary");
    process::abort();
}

/// Install a process-wide log subscriber honoring `RUST_LOG`.
///
/// Optional; call once when the library is loaded. Subsequent calls (or an
/// already-installed subscriber elsewhere in the process) are no-ops.
#[unsafe(no_mangle)]
pub extern "C" fn bfmatch_init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .try_init();
}

/// Construct a matcher for the given distance-type selector
/// ([`DistType`] raw values: L1 = 0, L2 = 1, Hamming = 2).
///
/// Returns an owned handle, never null. The caller must release it exactly
/// once with [`bfmatch_release`].
#[unsafe(no_mangle)]
pub extern "C" fn bfmatch_create(dist_type: i32) -> *mut BruteForceMatcher {
    match DistType::from_raw(dist_type) {
        Some(dist) => Box::into_raw(Box::new(BruteForceMatcher::new(dist))),
        None => fatal(
            "bfmatch_create",
            &format!("unknown distance type {dist_type}"),
        ),
    }
}

/// Destroy a matcher created by [`bfmatch_create`].
///
/// A null inner pointer is a no-op. The caller's stored pointer is not
/// nulled out; it is dangling after return.
///
/// # Safety
///
/// `matcher` must point to a live handle slot. The handle must not have
/// been released before, and must not be used afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bfmatch_release(matcher: *mut *mut BruteForceMatcher) {
    let inner = unsafe { *matcher };
    if !inner.is_null() {
        drop(unsafe { Box::from_raw(inner) });
    }
}

/// Match each query descriptor against the train set, writing the k nearest
/// train indices and distances per query into `train_idx` / `distance`
/// (resized to Q x k by the engine). `mask` may be null; a non-null mask
/// selects the masked engine entry point.
///
/// # Safety
///
/// All non-mask pointers must be valid for the duration of the call;
/// `train_idx` and `distance` must be distinct, exclusively borrowed
/// matrices. `mask`, when non-null, must point to a valid matrix. No
/// argument is retained past return.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bfmatch_knn_match(
    matcher: *const BruteForceMatcher,
    query: *const Mat,
    train: *const Mat,
    train_idx: *mut Mat,
    distance: *mut Mat,
    k: i32,
    mask: *const Mat,
) {
    let matcher = unsafe { &*matcher };
    let query = unsafe { &*query };
    let train = unsafe { &*train };
    let train_idx = unsafe { &mut *train_idx };
    let distance = unsafe { &mut *distance };
    let k = usize::try_from(k).unwrap_or(0);

    let result = if mask.is_null() {
        matcher.knn_match(query, train, train_idx, distance, k)
    } else {
        matcher.knn_match_masked(query, train, train_idx, distance, k, unsafe { &*mask })
    };
    if let Err(err) = result {
        fatal("bfmatch_knn_match", &err);
    }
}

/// Allocate a zero-filled matrix ([`ElemType`] raw values: U8 = 0, I32 = 4,
/// F32 = 5). Returns an owned pointer, never null; release with
/// [`bfmatch_mat_release`].
#[unsafe(no_mangle)]
pub extern "C" fn bfmatch_mat_create(rows: i32, cols: i32, elem_type: i32) -> *mut Mat {
    let elem = match ElemType::from_raw(elem_type) {
        Some(elem) => elem,
        None => fatal(
            "bfmatch_mat_create",
            &format!("unknown element type {elem_type}"),
        ),
    };
    let rows = usize::try_from(rows).unwrap_or(0);
    let cols = usize::try_from(cols).unwrap_or(0);
    Box::into_raw(Box::new(Mat::new(rows, cols, elem)))
}

/// Destroy a matrix created by [`bfmatch_mat_create`]. A null inner pointer
/// is a no-op; the caller's stored pointer is not nulled out.
///
/// # Safety
///
/// `mat` must point to a live handle slot; same contract as
/// [`bfmatch_release`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bfmatch_mat_release(mat: *mut *mut Mat) {
    let inner = unsafe { *mat };
    if !inner.is_null() {
        drop(unsafe { Box::from_raw(inner) });
    }
}

/// Row count of a matrix.
///
/// # Safety
///
/// `mat` must point to a live matrix.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bfmatch_mat_rows(mat: *const Mat) -> i32 {
    unsafe { &*mat }.rows() as i32
}

/// Column count of a matrix.
///
/// # Safety
///
/// `mat` must point to a live matrix.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bfmatch_mat_cols(mat: *const Mat) -> i32 {
    unsafe { &*mat }.cols() as i32
}

/// Element-type code of a matrix.
///
/// # Safety
///
/// `mat` must point to a live matrix.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bfmatch_mat_elem_type(mat: *const Mat) -> i32 {
    unsafe { &*mat }.elem().as_raw()
}

/// Copy `len` bytes from `src` into the matrix payload. `len` must equal
/// the matrix byte length exactly; a mismatch is fatal.
///
/// # Safety
///
/// `mat` must point to a live matrix and `src` to `len` readable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bfmatch_mat_upload(mat: *mut Mat, src: *const u8, len: usize) {
    let mat = unsafe { &mut *mat };
    let bytes = unsafe { std::slice::from_raw_parts(src, len) };
    if let Err(err) = mat.upload_bytes(bytes) {
        fatal("bfmatch_mat_upload", &err);
    }
}

/// Copy the matrix payload into `dst`. `len` must equal the matrix byte
/// length exactly; a mismatch is fatal.
///
/// # Safety
///
/// `mat` must point to a live matrix and `dst` to `len` writable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bfmatch_mat_download(mat: *const Mat, dst: *mut u8, len: usize) {
    let mat = unsafe { &*mat };
    let bytes = unsafe { std::slice::from_raw_parts_mut(dst, len) };
    if let Err(err) = mat.download_bytes(bytes) {
        fatal("bfmatch_mat_download", &err);
    }
}
