/// Build an absolute URL from a base URL and a path
pub fn absolute_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let mut base = base_url.to_string();
    if !path.starts_with('/') {
        base.push('/');
        base.push_str(path);
        return base;
    }
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        return base;
    }
    format!("{}/{}", base, trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_paths_onto_base() {
        assert_eq!(absolute_url("https://cms.example", "/en/about/"), "https://cms.example/en/about/");
        assert_eq!(absolute_url("https://cms.example", "/"), "https://cms.example");
        assert_eq!(absolute_url("https://cms.example", "https://other/x"), "https://other/x");
    }
}
