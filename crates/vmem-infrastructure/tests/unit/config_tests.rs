//! Configuration loading and defaults.

use vmem_infrastructure::config::{load_config, AppConfig};

#[test]
fn defaults_cover_every_setting_except_credentials() {
    let config = AppConfig::default();

    assert_eq!(config.database.url, "sqlite://data/vmem.db");
    assert_eq!(config.queue.name, "video_processing");
    assert!(!config.queue.thread_fallback);
    assert_eq!(config.queue.max_retries, 0);
    assert_eq!(config.openai.chat_model, "gpt-4o-mini");
    assert_eq!(config.openai.speech_model, "whisper-1");
    assert!(!config.openai.is_configured());
    assert!(config.blob.token.is_empty());
    assert_eq!(
        config.embedding.model,
        "sentence-transformers/all-MiniLM-L6-v2"
    );
    assert_eq!(config.media.max_frames, 20);
    assert!(!config.media.detect_speakers);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn derived_directories_hang_off_the_data_dir() {
    let config = AppConfig::default();
    assert_eq!(config.videos_dir(), config.data_dir.join("videos"));
    assert_eq!(config.thumbnails_dir(), config.data_dir.join("thumbnails"));
    assert_eq!(config.uploads_dir(), config.data_dir.join("uploads"));
}

#[test]
fn environment_overrides_nest_with_double_underscores() {
    // Process-wide env mutation: keep every override in one test.
    std::env::set_var("VMEM_API_BASE_URL", "https://vmem.example");
    std::env::set_var("VMEM_DATABASE__URL", "sqlite://tmp/other.db");
    std::env::set_var("VMEM_QUEUE__THREAD_FALLBACK", "true");
    std::env::set_var("VMEM_MEDIA__MAX_FRAMES", "8");

    let config = load_config().unwrap();
    assert_eq!(config.api_base_url, "https://vmem.example");
    assert_eq!(config.database.url, "sqlite://tmp/other.db");
    assert!(config.queue.thread_fallback);
    assert_eq!(config.media.max_frames, 8);

    std::env::remove_var("VMEM_API_BASE_URL");
    std::env::remove_var("VMEM_DATABASE__URL");
    std::env::remove_var("VMEM_QUEUE__THREAD_FALLBACK");
    std::env::remove_var("VMEM_MEDIA__MAX_FRAMES");
}
