use crate::{Clustering, cluster_1d, cluster_1d_seeded};
use js_sys::{Array, Object, Reflect};
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;

fn vec_to_js_array<T: Into<f64>>(data: Vec<T>) -> Array {
    let array = Array::new();
    for num in data {
        array.push(&JsValue::from_f64(num.into()));
    }
    array
}

fn set(target: &Object, key: &str, value: &JsValue) -> Result<(), JsError> {
    Reflect::set(target, &JsValue::from_str(key), value)
        .map(|_| ())
        .map_err(|_| JsError::new(&format!("couldn't set {key} on result")))
}

// Convert a clustering result to an Object suitable for use by a JS function
pub fn clustering_to_js_object(res: Clustering<f64>) -> Result<Object, JsError> {
    let object = Object::new();
    set(&object, "iterations", &JsValue::from_f64(res.iterations as f64))?;
    set(
        &object,
        "avgDividerMoves",
        &JsValue::from_f64(res.avg_divider_moves),
    )?;
    let counts: Vec<f64> = res.counts.iter().map(|&c| c as f64).collect();
    set(&object, "counts", &vec_to_js_array(counts))?;
    set(&object, "means", &vec_to_js_array(res.means))?;
    Ok(object)
}

/// Cluster `data` into at most `clusters` groups. A `seed` of 0 uses fresh randomness for
/// tie-breaking.
#[wasm_bindgen]
pub fn cluster_1d_wasm(data: &[f64], clusters: usize, seed: u64) -> Result<Object, JsError> {
    let res = if seed == 0 {
        cluster_1d(data, clusters)?
    } else {
        cluster_1d_seeded(data, clusters, seed)?
    };
    clustering_to_js_object(res)
}
