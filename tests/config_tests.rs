use cms_wizard::config;
use std::env;

#[test]
fn test_sanitize_base_url_removes_trailing_slash() {
    assert_eq!(
        config::sanitize_base_url("https://cms.example.com/site/"),
        "https://cms.example.com/site"
    );
}

#[test]
fn test_sanitize_base_url_multiple_trailing_slashes() {
    assert_eq!(
        config::sanitize_base_url("https://cms.example.com///"),
        "https://cms.example.com"
    );
}

#[test]
fn test_sanitize_base_url_with_whitespace() {
    assert_eq!(
        config::sanitize_base_url("  https://cms.example.com/  "),
        "https://cms.example.com"
    );
}

#[test]
fn test_sanitize_base_url_empty_string() {
    assert_eq!(config::sanitize_base_url(""), "http://localhost:8080");
    assert_eq!(config::sanitize_base_url("   "), "http://localhost:8080");
}

#[test]
fn test_parse_language_list_normalizes_and_dedupes() {
    assert_eq!(
        config::parse_language_list(" EN, de ,,fr,en"),
        vec!["en".to_string(), "de".to_string(), "fr".to_string()]
    );
    assert!(config::parse_language_list(" , ").is_empty());
}

// LANGUAGES and LANGUAGE_CODE are read together, so they share one test.
#[test]
fn test_language_settings_from_env() {
    env::set_var("LANGUAGES", "de, en");
    env::set_var("LANGUAGE_CODE", "EN");
    assert_eq!(config::get_languages(), vec!["de".to_string(), "en".to_string()]);
    assert_eq!(config::get_default_language(), "en");

    // An unsupported default falls back to the first language.
    env::set_var("LANGUAGE_CODE", "fr");
    assert_eq!(config::get_default_language(), "de");

    env::set_var("LANGUAGES", " , ");
    env::remove_var("LANGUAGE_CODE");
    assert_eq!(config::get_languages(), vec!["en".to_string()]);
    assert_eq!(config::get_default_language(), "en");

    env::remove_var("LANGUAGES");
}

#[test]
fn test_get_public_base_url() {
    env::set_var("PUBLIC_BASE_URL", "https://cms.example.com/");
    assert_eq!(config::get_public_base_url(), "https://cms.example.com");

    env::remove_var("PUBLIC_BASE_URL");
    assert_eq!(config::get_public_base_url(), "http://localhost:8080");
}

#[test]
fn test_remote_user_header_is_lowercased() {
    env::set_var("REMOTE_USER_HEADER", " X-Forwarded-User ");
    assert_eq!(config::get_remote_user_header(), "x-forwarded-user");

    env::remove_var("REMOTE_USER_HEADER");
    assert_eq!(config::get_remote_user_header(), config::DEFAULT_REMOTE_USER_HEADER);
}

#[test]
fn test_wizard_tmp_dir_lives_below_media_root() {
    env::set_var("MEDIA_ROOT", "/srv/media");
    assert_eq!(
        config::get_wizard_tmp_dir(),
        std::path::PathBuf::from("/srv/media").join(config::WIZARD_TMP_DIR)
    );
    env::remove_var("MEDIA_ROOT");
}

#[test]
fn test_get_port_falls_back_on_garbage() {
    env::set_var("PORT", "not-a-port");
    assert_eq!(config::get_port(), config::DEFAULT_PORT);
    env::set_var("PORT", " 9090 ");
    assert_eq!(config::get_port(), 9090);
    env::remove_var("PORT");
}

#[test]
fn test_session_ttl_defaults_and_overrides() {
    env::set_var("WIZARD_SESSION_TTL_SECS", "600");
    assert_eq!(config::get_session_ttl_secs(), 600);
    env::set_var("WIZARD_SESSION_TTL_SECS", "0");
    assert_eq!(config::get_session_ttl_secs(), config::DEFAULT_SESSION_TTL_SECS);
    env::remove_var("WIZARD_SESSION_TTL_SECS");
    assert_eq!(config::get_session_ttl_secs(), config::DEFAULT_SESSION_TTL_SECS);
}
