use wasm_bindgen::prelude::*;

pub mod error;
pub mod config;
pub mod logger;
pub mod types;
pub mod objects;
pub mod filters;
pub mod store;
pub mod viewport;
pub mod brush;
pub mod selection;
pub mod history;
pub mod io;
pub mod engine;
pub mod interaction;
pub mod commands;
pub mod render;

pub use engine::StudioEngine;
pub use error::{Result, StudioError};
pub use config::EditorConfig;
pub use types::*;
pub use objects::*;

/// Install the console logger at the given level, e.g. "debug".
#[wasm_bindgen]
pub fn init_logging(level: &str) {
    logger::init(logger::parse_level(level));
}
