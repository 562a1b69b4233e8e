//! Fixed fields and group nesting shared by the bundled sinks

use serde_json::{Map, Value};

use super::{Field, Record};

/// Fields fixed by `with_fields`, plus the currently open group path.
///
/// Fields added after a group is opened land inside that group, as do the
/// fields of every record written through the scope.
#[derive(Debug, Clone, Default)]
pub(crate) struct Scope {
    fixed: Map<String, Value>,
    groups: Vec<String>,
}

impl Scope {
    pub(crate) fn with_fields(&self, fields: &[Field]) -> Self {
        let mut scope = self.clone();
        if fields.is_empty() {
            return scope;
        }
        let target = nested_mut(&mut scope.fixed, &scope.groups);
        for field in fields {
            target.insert(field.key.clone(), field.value.clone());
        }
        scope
    }

    pub(crate) fn with_group(&self, name: &str) -> Self {
        let mut scope = self.clone();
        if !name.is_empty() {
            scope.groups.push(name.to_string());
        }
        scope
    }

    /// Merge the fixed fields with the record's own fields.
    pub(crate) fn render(&self, record: &Record) -> Map<String, Value> {
        let mut out = self.fixed.clone();
        if !record.fields.is_empty() {
            let target = nested_mut(&mut out, &self.groups);
            for field in &record.fields {
                target.insert(field.key.clone(), field.value.clone());
            }
        }
        out
    }
}

/// Walk `path` from `root`, creating (or replacing non-object values with)
/// empty objects along the way.
fn nested_mut<'a>(root: &'a mut Map<String, Value>, path: &[String]) -> &'a mut Map<String, Value> {
    let mut current = root;
    for segment in path {
        let slot = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Value::Object(next) = slot else {
            unreachable!("slot was just set to an object");
        };
        current = next;
    }
    current
}
