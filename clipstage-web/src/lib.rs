//! Clipstage WASM Web Runtime
//!
//! Renders two animated glTF models under an HDR studio environment and
//! plays their clips from a text command box. Asset loads run as background
//! tasks; the frame loop installs each model when it arrives.

#[cfg(target_arch = "wasm32")]
mod app;
#[cfg(target_arch = "wasm32")]
mod dom;

pub mod animation;
pub mod camera;
pub mod config;
pub mod controls;
pub mod dispatcher;
pub mod environment;
pub mod error;
pub mod gltf_import;
pub mod input;
pub mod io;
pub mod lights;
pub mod mixer;
pub mod pending;
pub mod registry;
pub mod scene;
pub mod session;
pub mod skinning;
pub mod stats;
pub mod transform;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Entry point, called when the WASM module loads.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if let Err(e) = console_log::init_with_level(log::Level::Info) {
        web_sys::console::warn_1(&format!("Logger already initialized: {e}").into());
    }
    log::info!("Clipstage Web Runtime initialized");
}

/// Create the stage on the canvas with id `canvas_id`.
///
/// `config_toml` is an optional TOML document overriding the defaults
/// (asset URLs, camera, lights, placements). Called from JavaScript, which
/// then drives [`app::App::frame`] from requestAnimationFrame.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub async fn create_app(canvas_id: String, config_toml: Option<String>) -> Result<app::App, JsValue> {
    let config = config::StageConfig::from_optional_toml(config_toml.as_deref())
        .map_err(|e| JsValue::from_str(&format!("Failed to load config: {e}")))?;
    if let Ok(level) = config.log_level_filter() {
        log::set_max_level(level);
    }
    app::App::new(&canvas_id, config).await
}
