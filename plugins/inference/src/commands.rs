use crate::bridge::SharedBridge;
use crate::dto::*;
use crate::error::Result;
use tauri::State;
use trailguard_identification::IdentificationResult;

#[tauri::command]
pub async fn initialize_model(
    bridge: State<'_, SharedBridge>,
    model_path: String,
) -> Result<InitializeResponse> {
    Ok(bridge.initialize_model(InitializeRequest { model_path }).await)
}

#[tauri::command]
pub async fn identify_object(
    bridge: State<'_, SharedBridge>,
    image_path: String,
    prompt: Option<String>,
    max_tokens: Option<i64>,
    temperature: Option<f64>,
) -> Result<IdentifyResponse> {
    let request = IdentifyRequest {
        image_path,
        prompt,
        max_tokens,
        temperature,
    };
    Ok(bridge.identify_object(request).await)
}

#[tauri::command]
pub fn is_model_ready(bridge: State<'_, SharedBridge>) -> ReadyResponse {
    bridge.is_model_ready()
}

#[tauri::command]
pub async fn download_model(
    bridge: State<'_, SharedBridge>,
    model_url: Option<String>,
) -> Result<DownloadResponse> {
    let request = DownloadRequest {
        model_url: model_url.unwrap_or_default(),
    };
    Ok(bridge.download_model(request).await)
}

#[tauri::command]
pub fn get_download_progress(bridge: State<'_, SharedBridge>) -> ProgressResponse {
    bridge.get_download_progress()
}

#[tauri::command]
pub async fn cleanup(bridge: State<'_, SharedBridge>) -> Result<CleanupResponse> {
    Ok(bridge.cleanup().await)
}

#[tauri::command]
pub fn cancel_download(bridge: State<'_, SharedBridge>) -> CancelResponse {
    bridge.cancel_download()
}

#[tauri::command]
pub fn get_model_status(bridge: State<'_, SharedBridge>) -> ModelStatusResponse {
    bridge.get_model_status()
}

#[tauri::command]
pub async fn get_identification(
    bridge: State<'_, SharedBridge>,
    image_path: String,
    prompt: Option<String>,
) -> Result<IdentificationResult> {
    Ok(bridge.get_identification(image_path, prompt).await)
}
