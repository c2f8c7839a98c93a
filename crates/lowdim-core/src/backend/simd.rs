//! SIMD lane bundles for the tiled backend.
//!
//! The tiled backend accumulates squared and absolute coordinate
//! differences over contiguous row buffers; the [`SimdLanes`] trait maps
//! those accumulations onto `wide`'s portable vectors (`f32x8`/`f64x4`)
//! with a scalar remainder loop.

use crate::types::Scalar;
use num_traits::Float;
use wide::{f32x8, f64x4};

/// SIMD vector of several scalar lanes.
pub trait SimdLanes: Copy {
    /// Element type of the lanes.
    type Scalar: Scalar;

    /// Number of lanes processed per SIMD step.
    const WIDTH: usize;

    /// Broadcast one value into every lane.
    fn splat(value: Self::Scalar) -> Self;

    /// Load `WIDTH` values from the front of `slice`.
    fn from_slice(slice: &[Self::Scalar]) -> Self;

    /// Lane-wise addition.
    fn add(self, other: Self) -> Self;

    /// Lane-wise subtraction.
    fn sub(self, other: Self) -> Self;

    /// Lane-wise absolute value.
    fn abs(self) -> Self;

    /// Fused multiply-add, `self * mul + add`.
    fn mul_add(self, mul: Self, add: Self) -> Self;

    /// Sum of all lanes.
    fn horizontal_sum(self) -> Self::Scalar;
}

impl SimdLanes for f32x8 {
    type Scalar = f32;

    const WIDTH: usize = 8;

    fn splat(value: f32) -> Self {
        f32x8::splat(value)
    }

    fn from_slice(slice: &[f32]) -> Self {
        f32x8::from([
            slice[0], slice[1], slice[2], slice[3], slice[4], slice[5], slice[6], slice[7],
        ])
    }

    fn add(self, other: Self) -> Self {
        self + other
    }

    fn sub(self, other: Self) -> Self {
        self - other
    }

    fn abs(self) -> Self {
        f32x8::abs(self)
    }

    fn mul_add(self, mul: Self, add: Self) -> Self {
        self.mul_add(mul, add)
    }

    fn horizontal_sum(self) -> f32 {
        self.to_array().iter().sum()
    }
}

impl SimdLanes for f64x4 {
    type Scalar = f64;

    const WIDTH: usize = 4;

    fn splat(value: f64) -> Self {
        f64x4::splat(value)
    }

    fn from_slice(slice: &[f64]) -> Self {
        f64x4::from([slice[0], slice[1], slice[2], slice[3]])
    }

    fn add(self, other: Self) -> Self {
        self + other
    }

    fn sub(self, other: Self) -> Self {
        self - other
    }

    fn abs(self) -> Self {
        f64x4::abs(self)
    }

    fn mul_add(self, mul: Self, add: Self) -> Self {
        self.mul_add(mul, add)
    }

    fn horizontal_sum(self) -> f64 {
        self.to_array().iter().sum()
    }
}

/// `sum((a - b)^2)` with SIMD accumulation and a scalar remainder.
pub(crate) fn sq_diff_sum<T: Scalar>(a: &[T], b: &[T]) -> T {
    debug_assert_eq!(a.len(), b.len());
    let width = <T::Lanes as SimdLanes>::WIDTH;
    let chunks = a.len() / width;
    let mut acc = <T::Lanes as SimdLanes>::splat(T::zero());
    for c in 0..chunks {
        let off = c * width;
        let va = <T::Lanes as SimdLanes>::from_slice(&a[off..]);
        let vb = <T::Lanes as SimdLanes>::from_slice(&b[off..]);
        let d = va.sub(vb);
        acc = d.mul_add(d, acc);
    }
    let mut total = acc.horizontal_sum();
    for k in (chunks * width)..a.len() {
        let d = a[k] - b[k];
        total = total + d * d;
    }
    total
}

/// `sum(|a - b|)` with SIMD accumulation and a scalar remainder.
pub(crate) fn abs_diff_sum<T: Scalar>(a: &[T], b: &[T]) -> T {
    debug_assert_eq!(a.len(), b.len());
    let width = <T::Lanes as SimdLanes>::WIDTH;
    let chunks = a.len() / width;
    let mut acc = <T::Lanes as SimdLanes>::splat(T::zero());
    for c in 0..chunks {
        let off = c * width;
        let va = <T::Lanes as SimdLanes>::from_slice(&a[off..]);
        let vb = <T::Lanes as SimdLanes>::from_slice(&b[off..]);
        acc = acc.add(va.sub(vb).abs());
    }
    let mut total = acc.horizontal_sum();
    for k in (chunks * width)..a.len() {
        total = total + Float::abs(a[k] - b[k]);
    }
    total
}
