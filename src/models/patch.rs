//! Partial updates applied to a stored wine.

use serde_json::{Map, Value};

use super::input::WineInput;
use super::wine::Wine;
use crate::errors::{AppError, FieldError};

/// Keys owned by the store; a patch can never set them.
const SYSTEM_FIELDS: [&str; 3] = ["id", "createdAt", "updatedAt"];

/// JSON merge patch (RFC 7396): objects merge key by key, `null` removes a key,
/// any other value replaces the target outright.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.remove(key);
            } else {
                merge_patch(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

/// Merge `patch` over `existing` and return the result as input to be re-validated.
pub fn apply_patch(existing: &Wine, patch: &Value) -> Result<WineInput, AppError> {
    let Value::Object(patch_map) = patch else {
        return Err(AppError::BadRequest(
            "Update body must be a JSON object".to_string(),
        ));
    };

    let mut document = serde_json::to_value(existing)
        .map_err(|e| AppError::Internal(format!("Failed to encode wine: {}", e)))?;

    let mut patch_map = patch_map.clone();
    for key in SYSTEM_FIELDS {
        patch_map.remove(key);
        if let Value::Object(doc) = &mut document {
            doc.remove(key);
        }
    }

    merge_patch(&mut document, &Value::Object(patch_map));

    serde_json::from_value(document)
        .map_err(|e| AppError::Validation(vec![FieldError::new("body", e.to_string())]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn stored() -> Wine {
        let input: WineInput = serde_json::from_value(json!({
            "name": "Barolo",
            "producer": "Vietti",
            "vintage": 2016,
            "type": "Red",
            "region": { "country": "Italy", "area": "Piedmont" },
            "tasting": { "rating": 4, "aromas": ["tar", "rose"] }
        }))
        .unwrap();
        let created = Utc::now();
        input.into_wine("w1".to_string(), created, created).unwrap()
    }

    #[test]
    fn merge_patch_follows_rfc_7396() {
        let mut target = json!({ "a": "b", "c": { "d": "e", "f": "g" } });
        merge_patch(&mut target, &json!({ "a": "z", "c": { "f": null } }));
        assert_eq!(target, json!({ "a": "z", "c": { "d": "e" } }));

        let mut target = json!({ "a": ["b"] });
        merge_patch(&mut target, &json!({ "a": ["c", "d"] }));
        assert_eq!(target, json!({ "a": ["c", "d"] }));
    }

    #[test]
    fn nested_fields_survive_partial_patch() {
        let existing = stored();
        let input = apply_patch(&existing, &json!({ "region": { "area": "Langhe" } })).unwrap();
        let updated = input
            .into_wine(existing.id.clone(), existing.created_at, Utc::now())
            .unwrap();

        assert_eq!(updated.region.country, "Italy");
        assert_eq!(updated.region.area.as_deref(), Some("Langhe"));
        assert_eq!(updated.tasting.aromas, existing.tasting.aromas);
    }

    #[test]
    fn slug_is_stable_across_renames() {
        let existing = stored();
        let input = apply_patch(&existing, &json!({ "name": "Barolo Riserva", "vintage": 2017 }))
            .unwrap();
        let updated = input
            .into_wine(existing.id.clone(), existing.created_at, Utc::now())
            .unwrap();

        assert_eq!(updated.name, "Barolo Riserva");
        assert_eq!(updated.slug, "barolo-2016");
    }

    #[test]
    fn system_fields_are_ignored() {
        let existing = stored();
        let input = apply_patch(
            &existing,
            &json!({ "id": "hijack", "createdAt": "1999-01-01T00:00:00Z", "isFavorite": true }),
        )
        .unwrap();
        let updated = input
            .into_wine(existing.id.clone(), existing.created_at, Utc::now())
            .unwrap();

        assert_eq!(updated.id, "w1");
        assert_eq!(updated.created_at, existing.created_at);
        assert!(updated.is_favorite);
    }

    #[test]
    fn merged_result_is_revalidated() {
        let existing = stored();
        let input = apply_patch(&existing, &json!({ "type": "Blush", "name": null })).unwrap();
        let err = input
            .into_wine(existing.id.clone(), existing.created_at, Utc::now())
            .unwrap_err();

        match err {
            AppError::Validation(fields) => {
                let names: Vec<&str> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(names, vec!["name", "type"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn rejects_non_object_patch() {
        let err = apply_patch(&stored(), &json!(["not", "an", "object"])).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
