//! Dot-path reads into the internal context object

use serde_json::Value;

/// Follow `user.address.city` through objects; numeric segments index arrays
pub fn lookup_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(root, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
        .filter(|value| !value.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_path() {
        let ctx = json!({
            "user": { "email": "ada@example.com", "phones": ["555-0100", "555-0199"] },
            "nothing": null
        });
        assert_eq!(lookup_path(&ctx, "user.email"), Some(&json!("ada@example.com")));
        assert_eq!(lookup_path(&ctx, "user.phones.1"), Some(&json!("555-0199")));
        assert_eq!(lookup_path(&ctx, "user.missing"), None);
        assert_eq!(lookup_path(&ctx, "user.email.domain"), None);
        assert_eq!(lookup_path(&ctx, "nothing"), None);
    }
}
