//! Dotted key paths carried by change records.
//!
//! A record starts without a path. Every node that re-emits it prefixes the
//! key under which the emitting child is stored, so by the time it reaches
//! an observing root the path names every hop from that root down to the
//! key that actually changed.

/// Separator between path segments.
pub const SEPARATOR: char = '.';

/// Prefixes `path` with `key`.
///
/// A record with no path yet gets `key` on its own.
pub fn compose(key: &str, path: Option<&str>) -> String {
    match path {
        Some(rest) => {
            let mut out = String::with_capacity(key.len() + 1 + rest.len());
            out.push_str(key);
            out.push(SEPARATOR);
            out.push_str(rest);
            out
        }
        None => key.to_string(),
    }
}

/// Splits a dotted path into its segments. The empty path has none.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(SEPARATOR).filter(|s| !s.is_empty())
}

/// Parses a canonical array index (`"0"`, `"17"`; not `"01"` or `"+1"`).
pub fn parse_index(key: &str) -> Option<usize> {
    let idx: usize = key.parse().ok()?;
    if idx.to_string() == key {
        Some(idx)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_without_existing_path() {
        assert_eq!(compose("a", None), "a");
    }

    #[test]
    fn compose_accumulates_segments() {
        let inner = compose("b", None);
        let mid = compose("a", Some(&inner));
        assert_eq!(mid, "a.b");
        assert_eq!(compose("root", Some(&mid)), "root.a.b");
    }

    #[test]
    fn segments_skip_empty() {
        assert_eq!(segments("a.0.id").collect::<Vec<_>>(), vec!["a", "0", "id"]);
        assert_eq!(segments("").count(), 0);
    }

    #[test]
    fn index_must_be_canonical() {
        assert_eq!(parse_index("0"), Some(0));
        assert_eq!(parse_index("12"), Some(12));
        assert_eq!(parse_index("01"), None);
        assert_eq!(parse_index("+1"), None);
        assert_eq!(parse_index("length"), None);
        assert_eq!(parse_index("-1"), None);
    }
}
