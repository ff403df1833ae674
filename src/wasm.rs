//! Browser bindings.
//!
//! A map page can fetch trip data itself and call `frameFromTrips` from a
//! `requestAnimationFrame` loop; no background tasks run in the browser.

use wasm_bindgen::prelude::*;

use crate::config::EngineConfig;
use crate::evaluation::frame_from_payload;

fn config_from(config_json: Option<String>) -> Result<EngineConfig, JsError> {
    match config_json {
        Some(json) => Ok(EngineConfig::from_json_str(&json)?),
        None => Ok(EngineConfig::default()),
    }
}

/// Computes one frame from a JSON trip payload at `now_ms`.
///
/// `config_json` optionally overrides engine settings (same format as the
/// config file).
#[wasm_bindgen(js_name = frameFromTrips)]
pub fn frame_from_trips(
    trips_json: &str,
    now_ms: f64,
    config_json: Option<String>,
) -> Result<JsValue, JsError> {
    let config = config_from(config_json)?;
    let frame = frame_from_payload(trips_json, now_ms as i64, &config)?;
    serde_wasm_bindgen::to_value(&frame).map_err(|e| JsError::new(&e.to_string()))
}

/// Synthetic trip records at `now_ms`, for demo pages without a backend.
#[wasm_bindgen(js_name = syntheticTrips)]
pub fn synthetic_trips(now_ms: f64, config_json: Option<String>) -> Result<JsValue, JsError> {
    let config = config_from(config_json)?;
    let trips = config.synthetic_source().trips_at(now_ms as i64);
    serde_wasm_bindgen::to_value(&trips).map_err(|e| JsError::new(&e.to_string()))
}

/// Current time in epoch milliseconds, from the JS clock.
#[wasm_bindgen(js_name = nowMs)]
pub fn now_ms() -> f64 {
    js_sys::Date::now()
}
