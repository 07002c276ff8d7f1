use crate::errors::{MessageError, MessageResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// An ordered, path-addressable JSON document.
///
/// Paths are slices of segments. A segment addresses a key when the current
/// container is an object, and an index when it is an array. Writes create
/// missing intermediate objects; they never create arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Note {
    content: Map<String, Value>,
}

impl Note {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dict(content: Map<String, Value>) -> Self {
        Note { content }
    }

    pub fn get<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self.content.get(first.as_ref())?;
        for segment in rest {
            current = child(current, segment.as_ref())?;
        }
        Some(current)
    }

    pub fn get_mut<S: AsRef<str>>(&mut self, path: &[S]) -> Option<&mut Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self.content.get_mut(first.as_ref())?;
        for segment in rest {
            current = child_mut(current, segment.as_ref())?;
        }
        Some(current)
    }

    pub fn contains<S: AsRef<str>>(&self, path: &[S]) -> bool {
        self.get(path).is_some()
    }

    /// Set a value, creating intermediate objects as needed.
    pub fn set<S: AsRef<str>>(&mut self, path: &[S], value: Value) -> MessageResult<()> {
        let (last, parents) = path.split_last().ok_or_else(empty_path)?;
        let Some((first, middle)) = parents.split_first() else {
            self.content.insert(last.as_ref().to_string(), value);
            return Ok(());
        };

        let mut current = self
            .content
            .entry(first.as_ref().to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        for segment in middle {
            current = descend_or_create(current, segment.as_ref())?;
        }
        assign(current, last.as_ref(), value)
    }

    /// Insert a top-level key, returning the previous value.
    pub fn insert<K: Into<String>>(&mut self, key: K, value: Value) -> Option<Value> {
        self.content.insert(key.into(), value)
    }

    /// Remove and return the value at `path`.
    pub fn pop<S: AsRef<str>>(&mut self, path: &[S]) -> Option<Value> {
        let (last, parents) = path.split_last()?;
        if parents.is_empty() {
            return self.content.shift_remove(last.as_ref());
        }
        match self.get_mut(parents)? {
            Value::Object(map) => map.shift_remove(last.as_ref()),
            Value::Array(items) => {
                let index = last.as_ref().parse::<usize>().ok()?;
                (index < items.len()).then(|| items.remove(index))
            }
            _ => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.content.keys()
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.content
    }

    pub fn to_dict(&self) -> Map<String, Value> {
        self.content.clone()
    }

    pub fn into_dict(self) -> Map<String, Value> {
        self.content
    }
}

impl From<Map<String, Value>> for Note {
    fn from(content: Map<String, Value>) -> Self {
        Note::from_dict(content)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Object(self.content.clone()))
    }
}

fn empty_path() -> MessageError {
    MessageError::InvalidField {
        field: "<root>".to_string(),
        reason: "path must not be empty".to_string(),
    }
}

fn child<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => items.get(segment.parse::<usize>().ok()?),
        _ => None,
    }
}

fn child_mut<'a>(value: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match value {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?),
        _ => None,
    }
}

fn descend_or_create<'a>(value: &'a mut Value, segment: &str) -> MessageResult<&'a mut Value> {
    match value {
        Value::Object(map) => Ok(map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()))),
        Value::Array(items) => {
            let len = items.len();
            segment
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get_mut(index))
                .ok_or_else(|| MessageError::InvalidField {
                    field: segment.to_string(),
                    reason: format!("index out of range for array of length {}", len),
                })
        }
        _ => Err(MessageError::InvalidField {
            field: segment.to_string(),
            reason: "cannot descend into a scalar value".to_string(),
        }),
    }
}

fn assign(container: &mut Value, segment: &str, value: Value) -> MessageResult<()> {
    match container {
        Value::Object(map) => {
            map.insert(segment.to_string(), value);
            Ok(())
        }
        Value::Array(items) => match segment.parse::<usize>() {
            Ok(index) if index < items.len() => {
                items[index] = value;
                Ok(())
            }
            Ok(index) if index == items.len() => {
                items.push(value);
                Ok(())
            }
            _ => Err(MessageError::InvalidField {
                field: segment.to_string(),
                reason: format!("invalid index for array of length {}", items.len()),
            }),
        },
        _ => Err(MessageError::InvalidField {
            field: segment.to_string(),
            reason: "cannot assign into a scalar value".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn note(value: Value) -> Note {
        match value {
            Value::Object(map) => Note::from_dict(map),
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_get_nested_and_default() {
        let n = note(json!({"a": {"b": [10, {"c": "deep"}]}}));
        assert_eq!(n.get(&["a", "b", "0"]), Some(&json!(10)));
        assert_eq!(n.get(&["a", "b", "1", "c"]), Some(&json!("deep")));
        assert_eq!(n.get(&["a", "missing"]), None);
        assert_eq!(n.get(&["a", "b", "7"]), None);
        assert_eq!(n.get::<&str>(&[]), None);
    }

    #[test]
    fn test_set_creates_intermediate_objects() {
        let mut n = Note::new();
        n.set(&["metadata", "last_updated", "role"], json!(1.5)).unwrap();
        assert_eq!(n.to_dict(), *json!({"metadata": {"last_updated": {"role": 1.5}}}).as_object().unwrap());
    }

    #[test]
    fn test_set_into_arrays() {
        let mut n = note(json!({"items": [1, 2]}));
        n.set(&["items", "0"], json!("one")).unwrap();
        n.set(&["items", "2"], json!(3)).unwrap();
        assert_eq!(n.get(&["items"]), Some(&json!(["one", 2, 3])));
        assert!(n.set(&["items", "9"], json!(0)).is_err());
    }

    #[test]
    fn test_set_through_scalar_fails() {
        let mut n = note(json!({"a": 1}));
        assert!(matches!(
            n.set(&["a", "b"], json!(2)),
            Err(MessageError::InvalidField { .. })
        ));
        assert!(n.set::<&str>(&[], json!(2)).is_err());
    }

    #[test]
    fn test_pop_preserves_order() {
        let mut n = note(json!({"x": 1, "y": 2, "z": 3}));
        assert_eq!(n.pop(&["x"]), Some(json!(1)));
        assert_eq!(n.keys().collect::<Vec<_>>(), vec!["y", "z"]);
        assert_eq!(n.pop(&["x"]), None);
    }

    #[test]
    fn test_pop_nested() {
        let mut n = note(json!({"a": {"b": 1, "c": [1, 2, 3]}}));
        assert_eq!(n.pop(&["a", "b"]), Some(json!(1)));
        assert_eq!(n.pop(&["a", "c", "1"]), Some(json!(2)));
        assert_eq!(n.get(&["a"]), Some(&json!({"c": [1, 3]})));
    }

    #[test]
    fn test_insertion_order_and_display() {
        let mut n = Note::new();
        n.set(&["zeta"], json!(1)).unwrap();
        n.set(&["alpha"], json!(2)).unwrap();
        assert_eq!(n.to_string(), r#"{"zeta":1,"alpha":2}"#);
        assert_eq!(n.len(), 2);
        assert_eq!(n.into_dict().keys().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
    }
}
