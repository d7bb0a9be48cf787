//! Operation schemas: which keys a request declares and how each converts.

use std::collections::BTreeSet;

/// How a raw parameter value is converted.
#[derive(Debug, Clone, Copy)]
pub enum Kind {
    /// Passed through as-is.
    Str,
    /// Parsed as a signed integer.
    Int,
    /// Accepted on the wire but never bound.
    Ignored,
    /// Bound recursively against another schema.
    Nested(fn() -> Schema),
}

/// A declared field as seen by the binder.
#[derive(Debug, Clone, Copy)]
pub struct FieldDecl {
    pub key: &'static str,
    pub kind: Kind,
    pub required: bool,
    pub list: bool,
}

/// The declared keys of one operation (or one nested element).
#[derive(Debug, Clone)]
pub struct Schema {
    name: &'static str,
    fields: Vec<FieldDecl>,
}

impl Schema {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fields: Vec::new(),
        }
    }

    pub fn required(self, key: &'static str, kind: Kind) -> Self {
        self.declare(key, kind, true, false)
    }

    pub fn required_list(self, key: &'static str, kind: Kind) -> Self {
        self.declare(key, kind, true, true)
    }

    pub fn optional(self, key: &'static str, kind: Kind) -> Self {
        self.declare(key, kind, false, false)
    }

    pub fn optional_list(self, key: &'static str, kind: Kind) -> Self {
        self.declare(key, kind, false, true)
    }

    fn declare(mut self, key: &'static str, kind: Kind, required: bool, list: bool) -> Self {
        debug_assert!(
            self.field(key).is_none(),
            "{} declares {key} twice",
            self.name
        );
        self.fields.push(FieldDecl {
            key,
            kind,
            required,
            list,
        });
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn field(&self, key: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Union of required scalar keys and required list-group keys.
    pub fn required_keys(&self) -> BTreeSet<&'static str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.key)
            .collect()
    }

    pub fn lists(&self) -> impl Iterator<Item = &FieldDecl> {
        self.fields.iter().filter(|f| f.list)
    }

    pub fn scalars(&self) -> impl Iterator<Item = &FieldDecl> {
        self.fields.iter().filter(|f| !f.list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Schema {
        Schema::new("Sample")
            .required("Name", Kind::Str)
            .required_list("Zones", Kind::Str)
            .optional("Count", Kind::Int)
            .optional_list("Tags", Kind::Str)
    }

    #[test]
    fn required_keys_unite_scalars_and_lists() {
        let keys: Vec<&str> = sample().required_keys().into_iter().collect();
        assert_eq!(keys, vec!["Name", "Zones"]);
    }

    #[test]
    fn lists_and_scalars_partition_fields() {
        let schema = sample();
        let lists: Vec<&str> = schema.lists().map(|f| f.key).collect();
        let scalars: Vec<&str> = schema.scalars().map(|f| f.key).collect();
        assert_eq!(lists, vec!["Zones", "Tags"]);
        assert_eq!(scalars, vec!["Name", "Count"]);
    }

    #[test]
    fn field_lookup() {
        let schema = sample();
        assert!(schema.field("Count").is_some_and(|f| !f.required));
        assert!(schema.field("Bogus").is_none());
    }
}
