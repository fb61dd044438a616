//! Cache key generation.

use sha2::{Digest, Sha256};

/// Compute the cache key for a request.
///
/// The method is upper-cased so `get` and `GET` address the same entry.
pub fn compute_cache_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Cache key for a GET of `url`, the only method cached.
pub fn get_key(url: &str) -> String {
    compute_cache_key("GET", url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_stability() {
        let hash1 = compute_cache_key("GET", "https://example.com/");
        let hash2 = compute_cache_key("GET", "https://example.com/");
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_method_case_insensitive() {
        assert_eq!(compute_cache_key("get", "https://example.com/"), get_key("https://example.com/"));
    }

    #[test]
    fn test_hash_different_method() {
        assert_ne!(compute_cache_key("GET", "https://example.com/"), compute_cache_key("HEAD", "https://example.com/"));
    }

    #[test]
    fn test_hash_query_is_significant() {
        assert_ne!(get_key("https://example.com/api/leads"), get_key("https://example.com/api/leads?page=2"));
    }

    #[test]
    fn test_hash_format() {
        let hash = get_key("https://example.com/");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
