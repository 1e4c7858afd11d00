//! Purpose: Rewrite underscore and upper-case key names into lower camel case.
//! Exports: `to_camel_case`, `normalize_key`, `normalize_keys`, `normalize_keys_all`.
//! Role: Reconciles database-style column names with record field names before mapping.
//! Invariants: Every function here is idempotent.
//! Invariants: On a key collision the rewritten entry replaces the existing one.
use std::collections::BTreeMap;

/// Turns each `_` followed by an ASCII lowercase letter into that letter upper-cased, then
/// lowers a leading upper-case character. Other punctuation is kept as is.
pub fn to_camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut chars = key.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '_' {
            if let Some(next) = chars.next_if(char::is_ascii_lowercase) {
                out.push(next.to_ascii_uppercase());
                continue;
            }
        }
        out.push(ch);
    }

    match out.chars().next() {
        Some(first) if first.is_uppercase() => {
            let rest = &out[first.len_utf8()..];
            first.to_lowercase().chain(rest.chars()).collect()
        }
        _ => out,
    }
}

/// Like `to_camel_case`, but a key with no lowercase letter that camel casing would change
/// (`USER_NAME`, `ID`) is lowered first.
pub fn normalize_key(key: &str) -> String {
    let camel = to_camel_case(key);
    if camel == key || key.chars().any(char::is_lowercase) {
        camel
    } else {
        to_camel_case(&key.to_lowercase())
    }
}

/// Rewrites every key of `map` in place; keys already normalized are left untouched.
pub fn normalize_keys<V>(map: &mut BTreeMap<String, V>) {
    let stale: Vec<String> = map
        .keys()
        .filter(|key| normalize_key(key) != **key)
        .cloned()
        .collect();
    if stale.is_empty() {
        return;
    }

    let mut rewritten = Vec::with_capacity(stale.len());
    for key in stale {
        if let Some(value) = map.remove(&key) {
            let normalized = normalize_key(&key);
            tracing::trace!(from = %key, to = %normalized, "renamed key");
            rewritten.push((normalized, value));
        }
    }
    map.extend(rewritten);
}

pub fn normalize_keys_all<V>(maps: &mut [BTreeMap<String, V>]) {
    for map in maps {
        normalize_keys(map);
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_key, normalize_keys, normalize_keys_all, to_camel_case};
    use std::collections::BTreeMap;

    #[test]
    fn humps_only_after_underscore_lowercase() {
        assert_eq!(to_camel_case("user_name"), "userName");
        assert_eq!(to_camel_case("UserName"), "userName");
        assert_eq!(to_camel_case("user_1st"), "user_1st");
        assert_eq!(to_camel_case("a_B"), "a_B");
        assert_eq!(to_camel_case("x__y"), "x_Y");
        assert_eq!(to_camel_case("user-name"), "user-name");
        assert_eq!(to_camel_case("_id"), "id");
        assert_eq!(to_camel_case(""), "");
    }

    #[test]
    fn camel_case_is_idempotent() {
        let samples = [
            "user_name", "USER_NAME", "_x", "__a", "A_b_c", "a__B", "Éclair_x", "x_", "_", "a_b_",
            "İ_x", "snake_case_key_2", "mixed_Case_value", "1_a", "1A",
        ];
        for sample in samples {
            let once = to_camel_case(sample);
            assert_eq!(to_camel_case(&once), once, "{sample}");
            let normalized = normalize_key(sample);
            assert_eq!(normalize_key(&normalized), normalized, "{sample}");
        }
    }

    #[test]
    fn all_caps_keys_are_lowered_first() {
        assert_eq!(normalize_key("USER_NAME"), "userName");
        assert_eq!(normalize_key("ID"), "id");
        assert_eq!(normalize_key("Created_at"), "createdAt");
    }

    #[test]
    fn rewritten_key_wins_on_collision() {
        let mut map = BTreeMap::from([("user_name".to_string(), 1), ("userName".to_string(), 2)]);
        normalize_keys(&mut map);
        assert_eq!(map, BTreeMap::from([("userName".to_string(), 1)]));
    }

    #[test]
    fn normalized_keys_are_left_alone() {
        let mut maps = vec![
            BTreeMap::from([("id".to_string(), "a"), ("ORDER_NO".to_string(), "b")]),
            BTreeMap::from([("createdAt".to_string(), "c")]),
        ];
        normalize_keys_all(&mut maps);
        assert_eq!(
            maps[0],
            BTreeMap::from([("id".to_string(), "a"), ("orderNo".to_string(), "b")])
        );
        assert_eq!(maps[1], BTreeMap::from([("createdAt".to_string(), "c")]));
    }
}
