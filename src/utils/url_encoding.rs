use std::collections::HashMap;

/// Parse URL-encoded form body into a HashMap
pub fn parse_urlencoded_body(body: &[u8]) -> HashMap<String, Vec<String>> {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    let raw = String::from_utf8_lossy(body);
    for pair in raw.split('&') {
        if pair.is_empty() {
            continue;
        }
        let mut parts = pair.splitn(2, '=');
        let key_enc = parts.next().unwrap_or("").replace('+', " ");
        let val_enc = parts.next().unwrap_or("").replace('+', " ");
        let key = urlencoding::decode(&key_enc).map(|c| c.into_owned()).unwrap_or_else(|_| key_enc.clone());
        let val = urlencoding::decode(&val_enc).map(|c| c.into_owned()).unwrap_or_else(|_| val_enc.clone());
        map.entry(key).or_default().push(val);
    }
    map
}

/// Keep the first value submitted for every key.
pub fn first_values(map: HashMap<String, Vec<String>>) -> HashMap<String, String> {
    map.into_iter()
        .filter_map(|(k, mut v)| {
            if v.is_empty() {
                None
            } else {
                Some((k, v.swap_remove(0)))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plus_and_percent() {
        let map = parse_urlencoded_body(b"1-title=Hello+World&1-slug=a%2Fb&empty=");
        assert_eq!(map["1-title"], vec!["Hello World"]);
        assert_eq!(map["1-slug"], vec!["a/b"]);
        assert_eq!(map["empty"], vec![""]);
    }

    #[test]
    fn first_value_wins() {
        let map = parse_urlencoded_body(b"k=1&k=2");
        assert_eq!(first_values(map)["k"], "1");
    }
}
