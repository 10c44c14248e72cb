//! Dense, dynamically-typed descriptor matrices.
//!
//! A [`Mat`] is a heap-allocated, row-major 2D array tagged with an element
//! type. Descriptor sets, masks, and match outputs all cross the crate's API
//! (and its C boundary) as `Mat` values, so the type stays deliberately
//! small: shape, element tag, and a byte store with checked typed views.
//!
//! The backing store is kept 4-byte aligned so `f32`/`i32` views are plain
//! slice casts. Typed access goes through the sealed [`Element`] trait and
//! fails with [`MatError::ElemType`] when the tag disagrees, never with a
//! silent reinterpretation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by matrix construction and access.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MatError {
    #[error("matrix holds {actual:?} elements, requested {requested:?}")]
    ElemType {
        requested: ElemType,
        actual: ElemType,
    },
    #[error("row {row} out of bounds for matrix with {rows} rows")]
    RowOutOfBounds { row: usize, rows: usize },
    #[error("buffer is {actual} bytes, matrix holds {expected}")]
    ByteLength { expected: usize, actual: usize },
    #[error("{rows}x{cols} matrix requires {expected} values, got {actual}")]
    ValueCount {
        rows: usize,
        cols: usize,
        expected: usize,
        actual: usize,
    },
}

/// Element type tag for a [`Mat`].
///
/// The raw values are the depth codes foreign callers pass across the C
/// boundary (`bfmatch_mat_create`), kept compatible with the wrapped
/// library's conventions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[repr(i32)]
pub enum ElemType {
    /// Unsigned 8-bit elements: bit-packed descriptors and masks.
    U8 = 0,
    /// Signed 32-bit elements: match index output.
    I32 = 4,
    /// 32-bit float elements: real-valued descriptors and distance output.
    F32 = 5,
}

impl ElemType {
    /// Size of one element in bytes.
    pub const fn size_of(self) -> usize {
        match self {
            ElemType::U8 => 1,
            ElemType::I32 | ElemType::F32 => 4,
        }
    }

    /// Recover an element type from its C-boundary depth code.
    pub const fn from_raw(value: i32) -> Option<Self> {
        match value {
            0 => Some(ElemType::U8),
            4 => Some(ElemType::I32),
            5 => Some(ElemType::F32),
            _ => None,
        }
    }

    /// The C-boundary depth code for this element type.
    pub const fn as_raw(self) -> i32 {
        self as i32
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for i32 {}
    impl Sealed for f32 {}
}

/// Scalar types a [`Mat`] can hold. Sealed: exactly `u8`, `i32`, `f32`.
pub trait Element: bytemuck::Pod + Send + Sync + sealed::Sealed {
    const ELEM: ElemType;
}

impl Element for u8 {
    const ELEM: ElemType = ElemType::U8;
}

impl Element for i32 {
    const ELEM: ElemType = ElemType::I32;
}

impl Element for f32 {
    const ELEM: ElemType = ElemType::F32;
}

/// Row-major 2D array with a runtime element type.
#[derive(Debug, Clone)]
pub struct Mat {
    rows: usize,
    cols: usize,
    elem: ElemType,
    // 4-byte words so f32/i32 views are alignment-safe; u8 matrices use a
    // prefix of the word buffer.
    words: Vec<u32>,
}

impl Mat {
    /// Allocate a zero-filled `rows` x `cols` matrix of the given element type.
    pub fn new(rows: usize, cols: usize, elem: ElemType) -> Self {
        let words = Self::words_for(rows, cols, elem);
        Self {
            rows,
            cols,
            elem,
            words: vec![0; words],
        }
    }

    /// Build a matrix from a typed value buffer in row-major order.
    pub fn from_vec<T: Element>(rows: usize, cols: usize, values: Vec<T>) -> Result<Self, MatError> {
        let expected = rows * cols;
        if values.len() != expected {
            return Err(MatError::ValueCount {
                rows,
                cols,
                expected,
                actual: values.len(),
            });
        }
        let mut mat = Self::new(rows, cols, T::ELEM);
        mat.as_slice_mut::<T>()?.copy_from_slice(&values);
        Ok(mat)
    }

    fn words_for(rows: usize, cols: usize, elem: ElemType) -> usize {
        (rows * cols * elem.size_of()).div_ceil(4)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn elem(&self) -> ElemType {
        self.elem
    }

    /// Number of elements (`rows * cols`).
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total payload size in bytes.
    pub fn byte_len(&self) -> usize {
        self.len() * self.elem.size_of()
    }

    /// Reshape to `rows` x `cols` of `elem`, reallocating only when the byte
    /// size grows. Contents are unspecified afterwards.
    pub fn resize(&mut self, rows: usize, cols: usize, elem: ElemType) {
        let words = Self::words_for(rows, cols, elem);
        self.words.resize(words, 0);
        self.rows = rows;
        self.cols = cols;
        self.elem = elem;
    }

    /// Whole-matrix typed view in row-major order.
    pub fn as_slice<T: Element>(&self) -> Result<&[T], MatError> {
        self.check_elem(T::ELEM)?;
        let bytes = &bytemuck::cast_slice::<u32, u8>(&self.words)[..self.byte_len()];
        Ok(bytemuck::cast_slice(bytes))
    }

    /// Mutable whole-matrix typed view in row-major order.
    pub fn as_slice_mut<T: Element>(&mut self) -> Result<&mut [T], MatError> {
        self.check_elem(T::ELEM)?;
        let len = self.byte_len();
        let bytes = &mut bytemuck::cast_slice_mut::<u32, u8>(&mut self.words)[..len];
        Ok(bytemuck::cast_slice_mut(bytes))
    }

    /// Typed view of one row.
    pub fn row<T: Element>(&self, row: usize) -> Result<&[T], MatError> {
        if row >= self.rows {
            return Err(MatError::RowOutOfBounds {
                row,
                rows: self.rows,
            });
        }
        let data = self.as_slice::<T>()?;
        Ok(&data[row * self.cols..(row + 1) * self.cols])
    }

    /// Set every element to `value`.
    pub fn fill<T: Element>(&mut self, value: T) -> Result<(), MatError> {
        self.as_slice_mut::<T>()?.fill(value);
        Ok(())
    }

    /// Raw little-endian byte view of the payload.
    pub fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u32, u8>(&self.words)[..self.byte_len()]
    }

    /// Copy `bytes` into the matrix. The buffer must match `byte_len` exactly.
    pub fn upload_bytes(&mut self, bytes: &[u8]) -> Result<(), MatError> {
        let expected = self.byte_len();
        if bytes.len() != expected {
            return Err(MatError::ByteLength {
                expected,
                actual: bytes.len(),
            });
        }
        bytemuck::cast_slice_mut::<u32, u8>(&mut self.words)[..expected].copy_from_slice(bytes);
        Ok(())
    }

    /// Copy the matrix payload into `out`. The buffer must match `byte_len`
    /// exactly.
    pub fn download_bytes(&self, out: &mut [u8]) -> Result<(), MatError> {
        let expected = self.byte_len();
        if out.len() != expected {
            return Err(MatError::ByteLength {
                expected,
                actual: out.len(),
            });
        }
        out.copy_from_slice(self.as_bytes());
        Ok(())
    }

    fn check_elem(&self, requested: ElemType) -> Result<(), MatError> {
        if self.elem != requested {
            return Err(MatError::ElemType {
                requested,
                actual: self.elem,
            });
        }
        Ok(())
    }
}

// Compares shape, element type, and payload; the word buffer's padding tail
// is not part of a matrix's value.
impl PartialEq for Mat {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows
            && self.cols == other.cols
            && self.elem == other.elem
            && self.as_bytes() == other.as_bytes()
    }
}
