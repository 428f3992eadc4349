//! Type conversion utilities for the FFI boundary
//!
//! Structured values cross the boundary as JSON through Python's `json`
//! module, so every serde type in the crate converts without a hand-written
//! field mapping.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::EvaluationConfig;
use crate::models::{RoadSnapshot, VehicleSnapshot};

/// Serialize a Rust value into native Python objects
pub fn to_py<T: Serialize>(py: Python<'_>, value: &T) -> PyResult<PyObject> {
    let json = serde_json::to_string(value)
        .map_err(|e| PyValueError::new_err(format!("Failed to serialize: {}", e)))?;
    let loaded = py.import_bound("json")?.call_method1("loads", (json,))?;
    Ok(loaded.unbind())
}

/// Deserialize native Python objects into a Rust value
pub fn from_py<T: DeserializeOwned>(value: &Bound<'_, PyAny>) -> PyResult<T> {
    let py = value.py();
    let json: String = py
        .import_bound("json")?
        .call_method1("dumps", (value,))?
        .extract()?;
    serde_json::from_str(&json).map_err(|e| PyValueError::new_err(format!("Invalid value: {}", e)))
}

/// Build a sanitized configuration from an optional dict
pub fn parse_config(config: Option<&Bound<'_, PyDict>>) -> PyResult<EvaluationConfig> {
    match config {
        Some(dict) => Ok(from_py::<EvaluationConfig>(dict.as_any())?.sanitized()),
        None => Ok(EvaluationConfig::default()),
    }
}

/// Extract a road snapshot
///
/// Expected layout:
/// `{"ego": [x, y, vx, vy], "others": [[id, x, y, vx, vy], ...]}`
pub fn parse_road(road: &Bound<'_, PyDict>) -> PyResult<RoadSnapshot> {
    let ego: [f64; 4] = road
        .get_item("ego")?
        .ok_or_else(|| PyValueError::new_err("Missing required field 'ego'"))?
        .extract()?;
    let others: Vec<(u64, f64, f64, f64, f64)> = match road.get_item("others")? {
        Some(value) => value.extract()?,
        None => Vec::new(),
    };

    Ok(RoadSnapshot {
        ego: VehicleSnapshot::new(0, [ego[0], ego[1]], [ego[2], ego[3]]),
        others: others
            .into_iter()
            .map(|(id, x, y, vx, vy)| VehicleSnapshot::new(id, [x, y], [vx, vy]))
            .collect(),
    })
}
