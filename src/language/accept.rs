//! `Accept-Language` header parsing.

/// Split an `Accept-Language` header into locale tags, best first.
///
/// Tags are ordered by descending `q` value; equal weights keep header
/// order. Entries with `q=0` or an unparsable weight are dropped.
/// Wildcards and unknown tags are kept, callers skip what they can't resolve.
///
/// ```ignore
/// parse_accept_language("fr;q=0.8, de, *;q=0.1") // -> ["de", "fr", "*"]
/// ```
pub fn parse_accept_language(header: &str) -> Vec<String> {
    let mut weighted: Vec<(f32, String)> = header
        .split(',')
        .filter_map(|item| {
            let mut parts = item.split(';');
            let tag = parts.next()?.trim();
            if tag.is_empty() {
                return None;
            }
            let mut q = 1.0_f32;
            for param in parts {
                if let Some(value) = param.trim().strip_prefix("q=") {
                    q = value.trim().parse().ok()?;
                }
            }
            (q > 0.0).then(|| (q, tag.to_string()))
        })
        .collect();

    // stable: equal weights stay in header order
    weighted.sort_by(|a, b| b.0.total_cmp(&a.0));
    weighted.into_iter().map(|(_, tag)| tag).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_order_without_weights() {
        assert_eq!(parse_accept_language("fr, de"), vec!["fr", "de"]);
    }

    #[test]
    fn test_weights_reorder() {
        assert_eq!(
            parse_accept_language("fr;q=0.8, de, *;q=0.1"),
            vec!["de", "fr", "*"]
        );
    }

    #[test]
    fn test_zero_and_malformed_weights_dropped() {
        assert_eq!(
            parse_accept_language("en;q=0, de;q=abc, it;q=0.5,,"),
            vec!["it"]
        );
        assert!(parse_accept_language("").is_empty());
    }
}
