//! Glob matching for key listing.

/// Matches `key` against a Redis-style glob `pattern`.
///
/// Supports `*` (any run of bytes), `?` (one byte) and `\` to escape the next
/// byte. Everything else matches literally.
///
/// ```rust
/// use timebits_store::glob_match;
///
/// assert!(glob_match("timebits:evt:*", "timebits:evt:day:1:login"));
/// assert!(glob_match("k?y", "key"));
/// assert!(!glob_match("timebits:op:*", "timebits:evt:day:1:login"));
/// ```
pub fn glob_match(pattern: &str, key: &str) -> bool {
    let pattern = pattern.as_bytes();
    let key = key.as_bytes();

    let (mut p, mut k) = (0, 0);
    // Position after the last `*` seen, and the key position it was tried at.
    let mut backtrack: Option<(usize, usize)> = None;

    while k < key.len() {
        match pattern.get(p) {
            Some(b'*') => {
                p += 1;
                backtrack = Some((p, k));
                continue;
            }
            Some(b'?') => {
                p += 1;
                k += 1;
                continue;
            }
            Some(b'\\') if p + 1 < pattern.len() => {
                if pattern[p + 1] == key[k] {
                    p += 2;
                    k += 1;
                    continue;
                }
            }
            Some(&literal) if literal == key[k] => {
                p += 1;
                k += 1;
                continue;
            }
            _ => {}
        }

        match backtrack {
            Some((star_p, star_k)) => {
                p = star_p;
                k = star_k + 1;
                backtrack = Some((star_p, k));
            }
            None => return false,
        }
    }

    pattern[p..].iter().all(|&b| b == b'*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal() {
        assert!(glob_match("abc", "abc"));
        assert!(!glob_match("abc", "abcd"));
        assert!(!glob_match("abcd", "abc"));
    }

    #[test]
    fn test_star() {
        assert!(glob_match("*", ""));
        assert!(glob_match("*", "anything"));
        assert!(glob_match("a*c", "abbbc"));
        assert!(glob_match("a*c", "ac"));
        assert!(!glob_match("a*c", "abcd"));
        assert!(glob_match("a*b*c", "axxbyyc"));
    }

    #[test]
    fn test_question_mark() {
        assert!(glob_match("a?c", "abc"));
        assert!(!glob_match("a?c", "ac"));
    }

    #[test]
    fn test_escape() {
        assert!(glob_match("a\\*c", "a*c"));
        assert!(!glob_match("a\\*c", "abc"));
    }

    #[test]
    fn test_namespace_prefixes() {
        assert!(glob_match("left:*", "left:evt:day:1:login"));
        assert!(!glob_match("left:*", "leftover:evt:day:1:login"));
    }
}
