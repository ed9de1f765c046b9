use codebuddy::config::{Config, ConfigResolver, HISTORY_WINDOW_KEY, TIMEOUT_SECONDS_KEY};
use codebuddy::providers::{PROVIDER_OPTION_KEY, ProviderKind, ProviderSelection};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_default_config_has_every_provider_and_no_selection() {
    let config = Config::default();

    assert!(config.provider.is_empty());
    for kind in ProviderKind::ALL {
        let provider_config = config
            .get_provider_config(*kind)
            .expect("default entry for every provider");
        assert_eq!(provider_config.model, kind.default_model());
        assert!(provider_config.api_key.is_empty());
    }
    assert_eq!(config.get_config_value(PROVIDER_OPTION_KEY), None);
    assert_eq!(config.session.history_window, 10);
    assert_eq!(config.session.ttl(), Duration::from_secs(24 * 60 * 60));
    assert_eq!(config.session.timeout(), Some(Duration::from_secs(120)));
}

#[test]
fn test_save_and_load_round_trip() {
    let temp_dir = TempDir::new().expect("Failed to create temporary directory");
    let path = temp_dir.path().join("codebuddy").join("config.toml");

    let mut config = Config::default();
    config
        .update(
            Some(ProviderKind::Anthropic),
            Some("sk-ant-test".to_string()),
            Some("claude-test".to_string()),
            Some("http://localhost:9999".to_string()),
        )
        .expect("update should succeed");
    config.session.history_window = 6;
    config.save_to(&path).expect("save should succeed");

    let loaded = Config::load_from(&path).expect("load should succeed");
    assert_eq!(loaded.provider, "Anthropic");
    assert_eq!(loaded.session.history_window, 6);
    let anthropic = loaded
        .get_provider_config(ProviderKind::Anthropic)
        .expect("anthropic entry");
    assert_eq!(anthropic.api_key, "sk-ant-test");
    assert_eq!(anthropic.model, "claude-test");
    assert_eq!(anthropic.base_url.as_deref(), Some("http://localhost:9999"));
}

#[test]
fn test_missing_file_loads_defaults() {
    let temp_dir = TempDir::new().expect("Failed to create temporary directory");
    let config =
        Config::load_from(&temp_dir.path().join("absent.toml")).expect("defaults should load");
    assert!(config.provider.is_empty());
}

#[test]
fn test_invalid_file_is_reported() {
    let temp_dir = TempDir::new().expect("Failed to create temporary directory");
    let path = temp_dir.path().join("config.toml");
    fs::write(&path, "provider = [not toml").expect("Failed to write config");

    let err = Config::load_from(&path).expect_err("must fail");
    assert!(err.to_string().contains("Invalid configuration file"));
}

#[test]
fn test_partial_file_fills_session_defaults() {
    let temp_dir = TempDir::new().expect("Failed to create temporary directory");
    let path = temp_dir.path().join("config.toml");
    fs::write(
        &path,
        "provider = \"Ollama\"\n\n[providers.ollama]\nmodel = \"llama3.2\"\n\n[session]\ntimeout_seconds = 0\n",
    )
    .expect("Failed to write config");

    let config = Config::load_from(&path).expect("load should succeed");
    assert_eq!(config.session.history_window, 10);
    assert_eq!(config.session.timeout(), None);
    assert_eq!(config.get_config_value(TIMEOUT_SECONDS_KEY).as_deref(), Some("0"));
}

#[test]
fn test_resolver_maps_dotted_keys() {
    let mut config = Config::default();
    config
        .update(
            Some(ProviderKind::Ollama),
            Some("proxy-token".to_string()),
            Some("codellama".to_string()),
            None,
        )
        .expect("update should succeed");

    assert_eq!(
        config.get_config_value(PROVIDER_OPTION_KEY).as_deref(),
        Some("Ollama")
    );
    assert_eq!(
        config.get_config_value("ollama.llama3.model").as_deref(),
        Some("codellama")
    );
    assert_eq!(
        config.get_config_value(HISTORY_WINDOW_KEY).as_deref(),
        Some("10")
    );
    assert_eq!(config.get_config_value("ollama.baseUrl"), None);
    assert_eq!(config.get_config_value("unknown.key"), None);

    let selection = ProviderSelection::resolve(&config).expect("selection should resolve");
    assert_eq!(selection.kind, ProviderKind::Ollama);
    assert_eq!(selection.model, "codellama");
    assert_eq!(selection.effective_base_url(), "http://127.0.0.1:11434");
}

#[test]
fn test_update_without_provider_is_rejected() {
    let mut config = Config::default();
    let result = config.update(None, Some("key".to_string()), None, None);
    assert!(result.is_err());
}

#[test]
fn test_switching_provider_keeps_other_settings() {
    let mut config = Config::default();
    config
        .update(
            Some(ProviderKind::Groq),
            Some("gsk".to_string()),
            None,
            None,
        )
        .expect("update should succeed");
    config
        .update(Some(ProviderKind::Gemini), None, None, None)
        .expect("update should succeed");

    assert_eq!(config.provider, "Gemini");
    assert_eq!(
        config
            .get_provider_config(ProviderKind::Groq)
            .map(|c| c.api_key.as_str()),
        Some("gsk")
    );
}

#[test]
fn test_huge_ttl_is_accepted_by_the_session_cache() {
    use codebuddy::history::ConversationHistory;
    use codebuddy::memory::{SessionMemoryCache, SystemClock};
    use std::sync::Arc;

    let config: Config = toml::from_str("[session]\nttl_hours = 9000000000000000000\n")
        .expect("config should parse");
    let cache = SessionMemoryCache::with_clock(Arc::new(SystemClock), config.session.ttl());

    let history = ConversationHistory::new().recorded("q", "a", 10);
    cache.set(ProviderKind::Groq.history_key(), history.clone());
    assert_eq!(cache.get(ProviderKind::Groq.history_key()), Some(history));
}
