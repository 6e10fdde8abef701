#![allow(dead_code)]

use std::sync::Arc;

use bevy::app::App;

use core_vitrine::{
    build_app_with, content::ContentLibrary, run_frame, EngineConfig, FrameHistory,
};
use vitrine_runtime::GridFrame;

pub fn test_config(seed: u64) -> EngineConfig {
    EngineConfig {
        seed,
        ..EngineConfig::builtin()
    }
}

pub fn build_test_app(seed: u64) -> App {
    build_app_with(test_config(seed), ContentLibrary::builtin())
}

pub fn build_test_app_with(config: EngineConfig, library: Arc<ContentLibrary>) -> App {
    build_app_with(config, library)
}

pub fn run_frames(app: &mut App, count: usize) {
    for _ in 0..count {
        run_frame(app);
    }
}

pub fn last_frame(app: &App) -> GridFrame {
    app.world
        .resource::<FrameHistory>()
        .last_frame
        .clone()
        .expect("at least one frame captured")
}

/// A deliberately starved catalog: one review, one photo.
pub fn starved_library() -> Arc<ContentLibrary> {
    let catalog = serde_json::json!({
        "reviews": [
            {
                "id": "solo-0",
                "display_name": "Only Client",
                "rating": 5,
                "body": "The single review this tiny deployment has."
            }
        ],
        "photos": ["solo-photo"]
    });
    Arc::new(ContentLibrary::from_json_str(&catalog.to_string()).expect("valid starved catalog"))
}
