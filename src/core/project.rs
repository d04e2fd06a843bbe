//! Purpose: Optional top-level field projection applied to retained records.
//! Exports: `Projection`.
//! Role: Narrows object records before they reach the sink.
//! Invariants: Non-object records pass through unchanged.
//! Invariants: Picked fields keep the order given; absent fields are omitted.
use serde_json::{Map, Value};

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Projection {
    fields: Vec<String>,
}

impl Projection {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    pub fn is_identity(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn apply(&self, value: Value) -> Value {
        if self.is_identity() {
            return value;
        }
        match value {
            Value::Object(mut object) => {
                let mut picked = Map::new();
                for field in &self.fields {
                    if let Some(inner) = object.remove(field) {
                        picked.insert(field.clone(), inner);
                    }
                }
                Value::Object(picked)
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Projection;
    use serde_json::json;

    #[test]
    fn identity_passes_everything() {
        let projection = Projection::default();
        let value = json!({"a":1,"b":2});
        assert_eq!(projection.apply(value.clone()), value);
    }

    #[test]
    fn picks_fields_in_given_order() {
        let projection = Projection::new(vec!["stars".into(), "missing".into(), "id".into()]);
        let picked = projection.apply(json!({"id":"r1","text":"long","stars":4}));
        assert_eq!(serde_json::to_string(&picked).unwrap(), r#"{"stars":4,"id":"r1"}"#);
    }

    #[test]
    fn repeated_field_is_kept_once() {
        let projection = Projection::new(vec!["a".into(), "a".into()]);
        assert_eq!(projection.apply(json!({"a":1,"b":2})), json!({"a":1}));
    }

    #[test]
    fn non_objects_pass_through() {
        let projection = Projection::new(vec!["a".into()]);
        assert_eq!(projection.apply(json!([1, 2])), json!([1, 2]));
        assert_eq!(projection.apply(json!("a")), json!("a"));
    }
}
