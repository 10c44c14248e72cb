//! Exercises the C export surface the way a foreign binding would: matrices
//! and matchers created and released through raw pointers, data staged via
//! upload/download, results read back out.
#![cfg(feature = "capi")]

use bfmatch::Mat;
use bfmatch::capi::{
    bfmatch_create, bfmatch_knn_match, bfmatch_mat_cols, bfmatch_mat_create,
    bfmatch_mat_download, bfmatch_mat_elem_type, bfmatch_mat_release, bfmatch_mat_rows,
    bfmatch_mat_upload, bfmatch_release,
};

const ELEM_U8: i32 = 0;
const ELEM_I32: i32 = 4;
const ELEM_F32: i32 = 5;

const DIST_L2: i32 = 1;
const DIST_HAMMING: i32 = 2;

/// Create a matrix handle and fill it from row-major values.
fn staged_mat(rows: i32, cols: i32, elem: i32, bytes: &[u8]) -> *mut Mat {
    let mat = bfmatch_mat_create(rows, cols, elem);
    unsafe { bfmatch_mat_upload(mat, bytes.as_ptr(), bytes.len()) };
    mat
}

fn f32_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn read_f32(mat: *const Mat, count: usize) -> Vec<f32> {
    let mut bytes = vec![0_u8; count * 4];
    unsafe { bfmatch_mat_download(mat, bytes.as_mut_ptr(), bytes.len()) };
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn read_i32(mat: *const Mat, count: usize) -> Vec<i32> {
    let mut bytes = vec![0_u8; count * 4];
    unsafe { bfmatch_mat_download(mat, bytes.as_mut_ptr(), bytes.len()) };
    bytes
        .chunks_exact(4)
        .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[test]
fn init_logging_is_idempotent() {
    bfmatch::capi::bfmatch_init_logging();
    bfmatch::capi::bfmatch_init_logging();
}

#[test]
fn create_release_cycles_are_balanced() {
    for dist_type in [0, 1, 2] {
        for _ in 0..16 {
            let mut matcher = bfmatch_create(dist_type);
            assert!(!matcher.is_null());
            unsafe { bfmatch_release(&mut matcher) };
        }
    }
}

#[test]
fn release_of_null_inner_pointer_is_noop() {
    let mut matcher: *mut bfmatch::BruteForceMatcher = std::ptr::null_mut();
    unsafe { bfmatch_release(&mut matcher) };
    let mut mat: *mut Mat = std::ptr::null_mut();
    unsafe { bfmatch_mat_release(&mut mat) };
}

#[test]
fn knn_round_trip_through_raw_pointers() {
    let mut matcher = bfmatch_create(DIST_L2);

    let query = staged_mat(2, 2, ELEM_F32, &f32_bytes(&[0.0, 0.0, 10.0, 10.0]));
    let train = staged_mat(
        3,
        2,
        ELEM_F32,
        &f32_bytes(&[0.0, 1.0, 10.0, 11.0, 100.0, 100.0]),
    );
    let mut train_idx = bfmatch_mat_create(0, 0, ELEM_I32);
    let mut distance = bfmatch_mat_create(0, 0, ELEM_F32);

    unsafe {
        bfmatch_knn_match(
            matcher,
            query,
            train,
            train_idx,
            distance,
            2,
            std::ptr::null(),
        );
    }

    unsafe {
        assert_eq!(bfmatch_mat_rows(train_idx), 2);
        assert_eq!(bfmatch_mat_cols(train_idx), 2);
        assert_eq!(bfmatch_mat_elem_type(train_idx), ELEM_I32);
        assert_eq!(bfmatch_mat_elem_type(distance), ELEM_F32);
    }

    let indices = read_i32(train_idx, 4);
    assert_eq!(indices, vec![0, 1, 1, 0]);
    let distances = read_f32(distance, 4);
    assert_eq!(distances[0], 1.0);
    assert_eq!(distances[2], 1.0);
    assert!(distances[1] > 1.0 && distances[3] > 1.0);

    let mut query = query;
    let mut train = train;
    unsafe {
        bfmatch_mat_release(&mut query);
        bfmatch_mat_release(&mut train);
        bfmatch_mat_release(&mut train_idx);
        bfmatch_mat_release(&mut distance);
        bfmatch_release(&mut matcher);
    }
}

#[test]
fn mask_pointer_selects_masked_entry_point() {
    let mut matcher = bfmatch_create(DIST_L2);

    let query = staged_mat(1, 1, ELEM_F32, &f32_bytes(&[0.0]));
    let train = staged_mat(2, 1, ELEM_F32, &f32_bytes(&[1.0, 2.0]));
    // Only the farther train row is eligible.
    let mask = staged_mat(1, 2, ELEM_U8, &[0, 1]);
    let mut train_idx = bfmatch_mat_create(0, 0, ELEM_I32);
    let mut distance = bfmatch_mat_create(0, 0, ELEM_F32);

    unsafe {
        bfmatch_knn_match(matcher, query, train, train_idx, distance, 1, mask);
    }

    assert_eq!(read_i32(train_idx, 1), vec![1]);
    assert_eq!(read_f32(distance, 1), vec![2.0]);

    let mut handles = [query, train, mask, train_idx, distance];
    for handle in &mut handles {
        unsafe { bfmatch_mat_release(handle) };
    }
    unsafe { bfmatch_release(&mut matcher) };
}

#[test]
fn hamming_matcher_over_the_c_surface() {
    let mut matcher = bfmatch_create(DIST_HAMMING);

    let query = staged_mat(1, 2, ELEM_U8, &[0b1111_0000, 0b0000_0000]);
    let train = staged_mat(2, 2, ELEM_U8, &[0b1111_0000, 0b0000_0001, 0b0000_0000, 0b0000_0000]);
    let mut train_idx = bfmatch_mat_create(0, 0, ELEM_I32);
    let mut distance = bfmatch_mat_create(0, 0, ELEM_F32);

    unsafe {
        bfmatch_knn_match(
            matcher,
            query,
            train,
            train_idx,
            distance,
            2,
            std::ptr::null(),
        );
    }

    assert_eq!(read_i32(train_idx, 2), vec![0, 1]);
    assert_eq!(read_f32(distance, 2), vec![1.0, 4.0]);

    let mut handles = [query, train, train_idx, distance];
    for handle in &mut handles {
        unsafe { bfmatch_mat_release(handle) };
    }
    unsafe { bfmatch_release(&mut matcher) };
}
