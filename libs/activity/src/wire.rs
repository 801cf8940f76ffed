//! Serde plumbing for envelopes that hoist a few typed fields out of an open property bag.
//!
//! Explicit `null`s on hoisted keys are left in the bag, so they are written back as received.

use serde::Serialize;
use serde::de::{DeserializeOwned, Error};
use serde::ser::SerializeMap;
use serde_json::{Map, Value};

/// Moves `key` out of `bag` and decodes it. Absent and `null` entries yield `None`.
pub(crate) fn take_hoisted<T, E>(bag: &mut Map<String, Value>, key: &str) -> Result<Option<T>, E>
where
    T: DeserializeOwned,
    E: Error,
{
    if matches!(bag.get(key), None | Some(Value::Null)) {
        return Ok(None);
    }
    match bag.remove(key) {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|err| E::custom(format_args!("invalid `{key}`: {err}"))),
        None => Ok(None),
    }
}

/// Writes a hoisted field when it is set and remembers that its key is taken.
pub(crate) fn hoisted_entry<M, T>(
    map: &mut M,
    written: &mut Vec<&'static str>,
    key: &'static str,
    value: &Option<T>,
) -> Result<(), M::Error>
where
    M: SerializeMap,
    T: Serialize,
{
    if let Some(value) = value {
        map.serialize_entry(key, value)?;
        written.push(key);
    }
    Ok(())
}

/// Writes every bag entry whose key was not already written as a hoisted field.
pub(crate) fn bag_entries<M: SerializeMap>(
    map: &mut M,
    written: &[&'static str],
    bag: &Map<String, Value>,
) -> Result<(), M::Error> {
    for (key, value) in bag {
        if !written.contains(&key.as_str()) {
            map.serialize_entry(key, value)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_hoisted_value_stays_in_the_bag() {
        let mut bag = json!({ "id": null, "name": "Ada" })
            .as_object()
            .cloned()
            .unwrap();
        let id: Option<String> = take_hoisted::<_, serde_json::Error>(&mut bag, "id").unwrap();
        let name: Option<String> = take_hoisted::<_, serde_json::Error>(&mut bag, "name").unwrap();
        assert_eq!(id, None);
        assert_eq!(name.as_deref(), Some("Ada"));
        assert_eq!(Value::Object(bag), json!({ "id": null }));
    }

    #[test]
    fn mistyped_hoisted_value_names_the_key() {
        let mut bag = json!({ "id": 7 }).as_object().cloned().unwrap();
        let err = take_hoisted::<String, serde_json::Error>(&mut bag, "id").unwrap_err();
        assert!(err.to_string().contains("`id`"));
    }
}
