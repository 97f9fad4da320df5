//! Per-request language resolution.
//!
//! The wizard fixes one language code when a request is dispatched and uses
//! it for every form and for the success URL of that request.

use crate::config;

/// Cookie consulted after the URL prefix.
pub const LANGUAGE_COOKIE: &str = "cms_language";

#[derive(Clone, Debug)]
pub struct LanguageSettings {
    languages: Vec<String>,
    default: String,
}

impl LanguageSettings {
    /// `languages` must not be empty; the first entry is used as default when
    /// `default` is not one of them.
    pub fn new(languages: Vec<String>, default: &str) -> Self {
        let mut languages: Vec<String> = languages
            .into_iter()
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .collect();
        if languages.is_empty() {
            languages.push("en".to_string());
        }
        let default = default.trim().to_lowercase();
        let default = if languages.contains(&default) {
            default
        } else {
            languages[0].clone()
        };
        Self { languages, default }
    }

    pub fn from_env() -> Self {
        Self::new(config::get_languages(), &config::get_default_language())
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    pub fn default_language(&self) -> &str {
        &self.default
    }

    /// Map `code` onto a configured language: exact match first, then the
    /// generic form of a regional code (`de-at` -> `de`).
    pub fn supported_variant(&self, code: &str) -> Option<String> {
        let code = code.trim().to_lowercase().replace('_', "-");
        if code.is_empty() {
            return None;
        }
        if self.languages.contains(&code) {
            return Some(code);
        }
        let generic = code.split('-').next().unwrap_or("");
        self.languages.iter().find(|l| l.as_str() == generic).cloned()
    }

    /// Language named by the first path segment, e.g. `/de/wizard/create/`.
    pub fn from_path(&self, path: &str) -> Option<String> {
        let first = path.trim_start_matches('/').split('/').next()?;
        self.supported_variant(first)
    }

    /// Resolve the request language: URL prefix, then cookie, then
    /// `Accept-Language`, then the configured default.
    pub fn resolve(&self, path: &str, cookie: Option<&str>, accept_language: Option<&str>) -> String {
        if let Some(lang) = self.from_path(path) {
            return lang;
        }
        if let Some(lang) = cookie.and_then(|c| self.supported_variant(c)) {
            return lang;
        }
        if let Some(header) = accept_language {
            for code in parse_accept_language(header) {
                if let Some(lang) = self.supported_variant(&code) {
                    return lang;
                }
            }
        }
        self.default.clone()
    }
}

/// Language tags from an `Accept-Language` header, highest quality first.
pub fn parse_accept_language(header: &str) -> Vec<String> {
    let mut tags: Vec<(String, f32)> = Vec::new();
    for part in header.split(',') {
        let mut pieces = part.trim().split(';');
        let tag = pieces.next().unwrap_or("").trim();
        if tag.is_empty() || tag == "*" {
            continue;
        }
        let mut quality = 1.0_f32;
        for param in pieces {
            if let Some(q) = param.trim().strip_prefix("q=") {
                quality = q.trim().parse::<f32>().unwrap_or(0.0);
            }
        }
        if quality > 0.0 {
            tags.push((tag.to_lowercase(), quality));
        }
    }
    // Stable sort keeps header order among equal weights.
    tags.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    tags.into_iter().map(|(t, _)| t).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> LanguageSettings {
        LanguageSettings::new(vec!["en".into(), "de".into(), "fr".into()], "en")
    }

    #[test]
    fn path_prefix_wins() {
        let s = settings();
        assert_eq!(s.resolve("/de/wizard/create/", Some("fr"), Some("fr")), "de");
    }

    #[test]
    fn cookie_then_header_then_default() {
        let s = settings();
        assert_eq!(s.resolve("/wizard/create/", Some("fr"), Some("de")), "fr");
        assert_eq!(s.resolve("/wizard/create/", None, Some("es, de;q=0.7")), "de");
        assert_eq!(s.resolve("/wizard/create/", Some("xx"), Some("es")), "en");
    }

    #[test]
    fn regional_codes_fall_back_to_generic() {
        let s = settings();
        assert_eq!(s.supported_variant("de-AT"), Some("de".to_string()));
        assert_eq!(s.supported_variant("de_ch"), Some("de".to_string()));
        assert_eq!(s.supported_variant("pt-br"), None);
    }

    #[test]
    fn accept_language_orders_by_quality() {
        assert_eq!(
            parse_accept_language("fr;q=0.5, de, en;q=0.8, *;q=0.1"),
            vec!["de", "en", "fr"]
        );
    }

    #[test]
    fn unknown_default_uses_first_language() {
        let s = LanguageSettings::new(vec!["nl".into()], "en");
        assert_eq!(s.default_language(), "nl");
    }
}
