use serde_json::{Map, Value};

/// Overlay every non-null value of `source` onto `target`, recursing into objects.
pub(crate) fn merge_non_null_json_value(source: Value, target: &mut Value) {
    match (source, target) {
        (Value::Null, _) => {}
        (Value::Object(source), Value::Object(target)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(existing) => merge_non_null_json_value(value, existing),
                    None => {
                        if !value.is_null() {
                            target.insert(key, value);
                        }
                    }
                }
            }
        }
        (source, target) => *target = source,
    }
}

/// Keys of `update` whose values differ from `current`, nested the same way.
pub(crate) fn json_difference(current: Value, update: &Value) -> Value {
    match (current, update) {
        (Value::Object(current), Value::Object(update)) => {
            let mut diff = Map::new();
            let mut current = current;
            for (key, update_value) in update {
                match current.remove(key) {
                    Some(current_value) => {
                        let nested = json_difference(current_value, update_value);
                        let unchanged = nested.as_object().is_some_and(Map::is_empty);
                        if !unchanged {
                            diff.insert(key.clone(), nested);
                        }
                    }
                    None => {
                        diff.insert(key.clone(), update_value.clone());
                    }
                }
            }
            Value::Object(diff)
        }
        (current, update) if &current == update => Value::Object(Map::new()),
        (_, update) => update.clone(),
    }
}
