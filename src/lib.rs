pub mod engine;
pub mod game;

use std::fmt::Display;

use log::{Level, LevelFilter, Log, Metadata, Record};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode, Response, Window};

use crate::engine::model::ModelBounds;
use crate::game::config::{ModelConfig, WorldConfig};
use crate::game::layout::{apply_layout, export_layout, layout_to_json, parse_layout};
use crate::game::{SceneryExtents, World};

const CONFIG_PATH: &str = "/assets/config.json";

struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = JsValue::from_str(&format!("[{}] {}", record.target(), record.args()));
        match record.level() {
            Level::Error => web_sys::console::error_1(&line),
            Level::Warn => web_sys::console::warn_1(&line),
            Level::Info => web_sys::console::info_1(&line),
            Level::Debug | Level::Trace => web_sys::console::debug_1(&line),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

#[wasm_bindgen(start)]
pub fn start() {
    // A second instance of the module finds the logger already set.
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }
}

fn js_error(err: impl Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[wasm_bindgen]
pub struct Simulator {
    world: World,
}

#[wasm_bindgen]
impl Simulator {
    /// `config` may be `undefined` or a partial config object.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<Simulator, JsValue> {
        let config = if config.is_undefined() || config.is_null() {
            WorldConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)?
        };
        Simulator::build(config, &SceneryExtents::default())
    }

    pub fn tick(&mut self, camera_z: f32) -> Result<JsValue, JsValue> {
        let summary = self.world.tick(camera_z);
        Ok(serde_wasm_bindgen::to_value(&summary)?)
    }

    pub fn transforms(&self) -> Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(&self.world.transforms())?)
    }

    pub fn export_layout(&self) -> Result<String, JsValue> {
        layout_to_json(&export_layout(&self.world)).map_err(js_error)
    }

    pub fn apply_layout(&mut self, json: &str) -> Result<JsValue, JsValue> {
        let entries = parse_layout(json).map_err(js_error)?;
        let report = apply_layout(&mut self.world, &entries);
        Ok(serde_wasm_bindgen::to_value(&report)?)
    }

    pub fn fallback_rate(&self) -> f64 {
        self.world.fallback_rate()
    }
}

impl Simulator {
    fn build(config: WorldConfig, extents: &SceneryExtents) -> Result<Simulator, JsValue> {
        let world = World::new(config, extents).map_err(js_error)?;
        Ok(Simulator { world })
    }
}

/// Body of a successful GET, or `None` when the request fails or is not 2xx.
async fn fetch_bytes(window: &Window, path: &str) -> Result<Option<Vec<u8>>, JsValue> {
    let opts = RequestInit::new();
    opts.set_method("GET");
    opts.set_mode(RequestMode::Cors);

    let request = Request::new_with_str_and_init(path, &opts)?;
    let Ok(resp_value) = JsFuture::from(window.fetch_with_request(&request)).await else {
        return Ok(None);
    };
    let resp: Response = resp_value.dyn_into()?;
    if !resp.ok() {
        return Ok(None);
    }
    let buffer = JsFuture::from(resp.array_buffer()?).await?;
    Ok(Some(js_sys::Uint8Array::new(&buffer).to_vec()))
}

/// Tries each candidate path in order; the first model that parses wins.
async fn load_model(
    window: &Window,
    model: &ModelConfig,
    fallback: ModelBounds,
) -> Result<ModelBounds, JsValue> {
    for path in &model.candidates {
        let Some(bytes) = fetch_bytes(window, path).await? else {
            log::debug!("no model at {path}");
            continue;
        };
        match ModelBounds::from_gltf(&bytes) {
            Ok(bounds) => {
                log::info!("loaded {path}, size {:?}", bounds.size());
                return Ok(bounds.fit_to(model.target_size));
            }
            Err(err) => log::warn!("skipping {path}: {err}"),
        }
    }
    log::warn!("no candidate model loaded, using default bounds");
    Ok(fallback.fit_to(model.target_size))
}

/// Builds a simulator from `/assets/config.json` and the configured scenery models.
///
/// A missing config file means defaults; a present but invalid one is an error.
#[wasm_bindgen]
pub async fn load_simulator() -> Result<Simulator, JsValue> {
    let window = web_sys::window().ok_or("No window")?;

    let config = match fetch_bytes(&window, CONFIG_PATH).await? {
        Some(bytes) => WorldConfig::from_json(&bytes).map_err(js_error)?,
        None => {
            log::info!("{CONFIG_PATH} not found, using defaults");
            WorldConfig::default()
        }
    };

    let defaults = SceneryExtents::default();
    let extents = SceneryExtents {
        road: load_model(&window, &config.models.road, defaults.road).await?,
        barrier: load_model(&window, &config.models.barrier, defaults.barrier).await?,
        streetlight: load_model(&window, &config.models.streetlight, defaults.streetlight).await?,
    };

    Simulator::build(config, &extents)
}
