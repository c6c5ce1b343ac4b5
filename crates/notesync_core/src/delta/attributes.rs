//! Formatting attributes carried by insert and retain operations.

use serde_json::{Map, Value};

/// Formatting attributes (e.g. `{"bold": true}`).
///
/// On a retain, a `null` value removes the attribute from the retained range.
pub type AttributeMap = Map<String, Value>;

/// Compose two attribute maps, `b` applied after `a`.
///
/// Keys present in `b` win, keys only present in `a` are kept. `null`
/// values are dropped unless `keep_null` is set (i.e. the composed op is
/// still a retain and must carry the removal forward).
pub fn compose(
    a: Option<&AttributeMap>,
    b: Option<&AttributeMap>,
    keep_null: bool,
) -> Option<AttributeMap> {
    let mut attributes = b.cloned().unwrap_or_default();
    if !keep_null {
        attributes.retain(|_, value| !value.is_null());
    }

    if let Some(a) = a {
        for (key, value) in a {
            if !b.is_some_and(|b| b.contains_key(key)) {
                attributes.insert(key.clone(), value.clone());
            }
        }
    }

    (!attributes.is_empty()).then_some(attributes)
}

/// Treat an empty map the same as no attributes at all.
pub(crate) fn normalize(attributes: Option<AttributeMap>) -> Option<AttributeMap> {
    attributes.filter(|a| !a.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: Value) -> AttributeMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_compose_left_undefined() {
        let b = attrs(json!({"bold": true, "color": "red"}));
        assert_eq!(compose(None, Some(&b), false), Some(b));
    }

    #[test]
    fn test_compose_right_undefined() {
        let a = attrs(json!({"bold": true}));
        assert_eq!(compose(Some(&a), None, false), Some(a));
    }

    #[test]
    fn test_compose_overwrites_and_keeps() {
        let a = attrs(json!({"bold": true, "color": "blue"}));
        let b = attrs(json!({"color": "red", "italic": true}));
        assert_eq!(
            compose(Some(&a), Some(&b), false),
            Some(attrs(json!({"bold": true, "color": "red", "italic": true})))
        );
    }

    #[test]
    fn test_compose_null_removal() {
        let a = attrs(json!({"bold": true, "color": "blue"}));
        let b = attrs(json!({"bold": null}));
        assert_eq!(
            compose(Some(&a), Some(&b), false),
            Some(attrs(json!({"color": "blue"})))
        );
        assert_eq!(
            compose(Some(&a), Some(&b), true),
            Some(attrs(json!({"bold": null, "color": "blue"})))
        );
    }

    #[test]
    fn test_compose_everything_removed() {
        let a = attrs(json!({"bold": true}));
        let b = attrs(json!({"bold": null}));
        assert_eq!(compose(Some(&a), Some(&b), false), None);
    }
}
