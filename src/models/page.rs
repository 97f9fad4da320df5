use serde::{Deserialize, Serialize};

/// A content container. New wizard entries are created as pages and may
/// hang below an existing one.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Page {
    pub id: u64,
    pub title: String,
    pub slug: String,
    /// Slash-joined slugs from the root, without leading or trailing slash.
    pub path: String,
    #[serde(default)]
    pub parent_id: Option<u64>,
    /// Language the page was created in.
    pub language: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub created_by: String,
    /// ISO-8601 creation timestamp.
    #[serde(default)]
    pub created_at: String,
}

impl Page {
    /// Public URL of the page for `language`, e.g. `/en/about/team/`.
    pub fn absolute_url(&self, language: &str) -> String {
        if self.path.is_empty() {
            format!("/{}/", language)
        } else {
            format!("/{}/{}/", language, self.path)
        }
    }
}

/// Field values for a page that has not been stored yet.
#[derive(Clone, Debug, Default)]
pub struct NewPage {
    pub title: String,
    pub slug: String,
    pub parent_id: Option<u64>,
    pub language: String,
    pub content: String,
    pub created_by: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(path: &str) -> Page {
        Page {
            id: 1,
            title: "About".into(),
            slug: "about".into(),
            path: path.into(),
            parent_id: None,
            language: "en".into(),
            content: String::new(),
            created_by: String::new(),
            created_at: String::new(),
        }
    }

    #[test]
    fn absolute_url_uses_language_prefix() {
        assert_eq!(page("about/team").absolute_url("de"), "/de/about/team/");
    }

    #[test]
    fn absolute_url_of_root_page() {
        assert_eq!(page("").absolute_url("en"), "/en/");
    }
}
