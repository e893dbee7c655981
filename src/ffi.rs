use libc::{c_double, c_void, size_t};
use std::ptr;
use std::slice;

use crate::{KMeansErr, cluster_1d, cluster_1d_seeded};

/// Status codes reported in [`ClusterResult`]
pub const STATUS_OK: u8 = 0;
pub const STATUS_EMPTY_DATASET: u8 = 1;
pub const STATUS_INVALID_K: u8 = 2;
pub const STATUS_OTHER: u8 = 3;

/// Wrapper for a void pointer to a sequence of floats to be clustered, and the sequence length.
/// Used for FFI.
///
/// `data` is a `Vec<c_double>`. NaN entries are treated as missing.
#[repr(C)]
pub struct ExternalArray {
    pub data: *const c_void,
    pub len: size_t,
}

/// A clustering result that has been leaked across the FFI boundary. Must be returned to
/// [`drop_cluster_result`] to be freed.
///
/// `means` points to `clusters` doubles and `counts` to `clusters` `size_t`s. Both are null
/// when `status` is not [`STATUS_OK`].
#[repr(C)]
pub struct ClusterResult {
    pub means: *const c_double,
    pub counts: *const size_t,
    pub clusters: size_t,
    pub iterations: size_t,
    pub avg_divider_moves: c_double,
    pub status: u8,
}

/// We don't need to take ownership of incoming data: it is copied into sorted samples
impl From<&ExternalArray> for &[f64] {
    fn from(arr: &ExternalArray) -> Self {
        if arr.data.is_null() || arr.len == 0 {
            return &[];
        }
        unsafe { slice::from_raw_parts(arr.data as *const f64, arr.len) }
    }
}

impl From<Vec<f64>> for ExternalArray {
    fn from(v: Vec<f64>) -> Self {
        let boxed = v.into_boxed_slice();
        let blen = boxed.len();
        let rawp = Box::into_raw(boxed);
        ExternalArray {
            data: rawp as *const c_void,
            len: blen as size_t,
        }
    }
}

fn leak<T>(v: Vec<T>) -> *const T {
    Box::into_raw(v.into_boxed_slice()) as *const T
}

/// We originated this data, so pointer-to-slice -> box
unsafe fn reclaim<T>(data: *const T, len: usize) {
    if !data.is_null() {
        drop(unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(data as *mut T, len)) });
    }
}

impl ClusterResult {
    fn failed(err: KMeansErr) -> Self {
        let status = match err {
            KMeansErr::EmptyDataset => STATUS_EMPTY_DATASET,
            KMeansErr::InvalidK => STATUS_INVALID_K,
            _ => STATUS_OTHER,
        };
        ClusterResult {
            means: ptr::null(),
            counts: ptr::null(),
            clusters: 0,
            iterations: 0,
            avg_divider_moves: 0.0,
            status,
        }
    }
}

/// Cluster `data` into at most `clusters` groups. A `seed` of 0 draws tie-breaking randomness
/// from the OS instead.
#[unsafe(no_mangle)]
pub extern "C" fn cluster_1d_ffi(data: &ExternalArray, clusters: size_t, seed: u64) -> ClusterResult {
    let values: &[f64] = data.into();
    let result = if seed == 0 {
        cluster_1d(values, clusters)
    } else {
        cluster_1d_seeded(values, clusters, seed)
    };
    match result {
        Ok(res) => ClusterResult {
            clusters: res.means.len() as size_t,
            iterations: res.iterations as size_t,
            avg_divider_moves: res.avg_divider_moves,
            means: leak(res.means),
            counts: leak(res.counts.into_iter().map(|c| c as size_t).collect()),
            status: STATUS_OK,
        },
        Err(e) => ClusterResult::failed(e),
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn drop_cluster_result(result: ClusterResult) {
    unsafe {
        reclaim(result.means, result.clusters);
        reclaim(result.counts, result.clusters);
    }
}
