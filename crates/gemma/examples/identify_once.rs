//! Identify one photo with the Gemma ONNX backend and print the result.
//!
//! ```sh
//! cargo run -p trailguard-gemma --example identify_once -- <tokenizer.json> <image> [model.onnx]
//! ```
//! Without a model path the artifact is read from the default model store.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use trailguard_gemma::GemmaOnnxLoader;
use trailguard_identification::{normalize, InferenceAdapter, DEFAULT_PROMPT};
use trailguard_models::ModelStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let (Some(tokenizer), Some(image)) = (args.next(), args.next()) else {
        eprintln!("usage: identify_once <tokenizer.json> <image> [model.onnx]");
        std::process::exit(2);
    };
    let model = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| ModelStore::default_location().artifact_path());

    let adapter = InferenceAdapter::new(
        Arc::new(GemmaOnnxLoader::new(tokenizer)),
        Duration::from_secs(300),
    );
    adapter.initialize(&model).await?;
    let raw = adapter.identify(&image, DEFAULT_PROMPT).await?;
    adapter.cleanup().await;

    println!("{}", serde_json::to_string_pretty(&normalize(&raw))?);
    Ok(())
}
