use std::env;
use std::path::{Path, PathBuf};

// Default configuration constants
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_PUBLIC_BASE_URL: &str = "";
pub const DEFAULT_CONTENT_FILE: &str = "content.json";
pub const DEFAULT_MEDIA_ROOT: &str = "media";
pub const DEFAULT_LANGUAGES: &str = "en";
pub const DEFAULT_REMOTE_USER_HEADER: &str = "x-remote-user";
pub const DEFAULT_REMOTE_ROLE_HEADER: &str = "x-remote-role";

/// Directory (below the media root) used to stage wizard uploads.
pub const WIZARD_TMP_DIR: &str = "wizard_tmp_files";
pub const DEFAULT_SESSION_TTL_SECS: u64 = 7200;
pub const SESSION_SWEEP_INTERVAL_SECS: u64 = 300;

pub fn load_env_file(env_file: Option<&str>) {
    if let Some(path) = env_file {
        dotenvy::from_path(Path::new(path)).ok();
    } else {
        dotenvy::dotenv().ok();
    }
}

pub fn get_host() -> String {
    env::var("HOST")
        .ok()
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_HOST.to_string())
}

/// `PORT` if it parses, otherwise [`DEFAULT_PORT`].
pub fn get_port() -> u16 {
    env::var("PORT")
        .ok()
        .and_then(|p| p.trim().parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

pub fn get_public_base_url() -> String {
    sanitize_base_url(&env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| DEFAULT_PUBLIC_BASE_URL.to_string()))
}

pub fn get_content_file() -> PathBuf {
    PathBuf::from(env::var("CONTENT_FILE").unwrap_or_else(|_| DEFAULT_CONTENT_FILE.to_string()))
}

pub fn get_media_root() -> PathBuf {
    PathBuf::from(env::var("MEDIA_ROOT").unwrap_or_else(|_| DEFAULT_MEDIA_ROOT.to_string()))
}

pub fn get_wizard_tmp_dir() -> PathBuf {
    get_media_root().join(WIZARD_TMP_DIR)
}

/// Idle time after which a wizard session and its staged uploads are dropped.
pub fn get_session_ttl_secs() -> u64 {
    env::var("WIZARD_SESSION_TTL_SECS")
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(DEFAULT_SESSION_TTL_SECS)
}

/// Configured site languages, in priority order. Never empty.
pub fn get_languages() -> Vec<String> {
    let raw = env::var("LANGUAGES").unwrap_or_else(|_| DEFAULT_LANGUAGES.to_string());
    let langs = parse_language_list(&raw);
    if langs.is_empty() {
        parse_language_list(DEFAULT_LANGUAGES)
    } else {
        langs
    }
}

/// The fallback language; must be one of [`get_languages`].
pub fn get_default_language() -> String {
    let languages = get_languages();
    match env::var("LANGUAGE_CODE") {
        Ok(code) => {
            let code = code.trim().to_lowercase();
            if languages.contains(&code) {
                code
            } else {
                languages[0].clone()
            }
        }
        Err(_) => languages[0].clone(),
    }
}

pub fn get_remote_user_header() -> String {
    env::var("REMOTE_USER_HEADER")
        .map(|h| h.trim().to_lowercase())
        .ok()
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| DEFAULT_REMOTE_USER_HEADER.to_string())
}

pub fn get_remote_role_header() -> String {
    env::var("REMOTE_ROLE_HEADER")
        .map(|h| h.trim().to_lowercase())
        .ok()
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| DEFAULT_REMOTE_ROLE_HEADER.to_string())
}

pub fn parse_language_list(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for code in raw.split(',') {
        let t = code.trim().to_lowercase();
        if !t.is_empty() && !out.contains(&t) {
            out.push(t);
        }
    }
    out
}

pub fn sanitize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "http://localhost:8080".to_string()
    } else {
        trimmed.to_string()
    }
}
