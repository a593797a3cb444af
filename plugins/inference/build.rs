fn main() {
    tauri_plugin::Builder::new(&[
        "initialize_model",
        "identify_object",
        "is_model_ready",
        "download_model",
        "get_download_progress",
        "cleanup",
        "cancel_download",
        "get_model_status",
        "get_identification",
    ])
    .build();
}
