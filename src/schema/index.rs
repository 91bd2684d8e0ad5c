// ABOUTME: Property type index consulted by the decoder
// ABOUTME: Exact-name descriptors plus ordered regex rules, loadable from JSON

use super::types::{Dim, TypeDescriptor, TypeTag};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while building a [`SchemaIndex`]
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid property pattern {0:?}: {1}")]
    BadRegex(String, #[source] regex::Error),
    #[error("malformed schema index: {0}")]
    Json(#[from] serde_json::Error),
}

/// A property-name regex and the types it implies
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub regex: Regex,
    pub descriptor: TypeDescriptor,
}

/// Property name to type lookup tables for one decode run
#[derive(Debug, Clone, Default)]
pub struct SchemaIndex {
    exact: HashMap<String, TypeDescriptor>,
    patterns: Vec<PatternRule>,
}

#[derive(Deserialize)]
struct RawIndex {
    #[serde(default)]
    properties: HashMap<String, RawDescriptor>,
    #[serde(default)]
    patterns: Vec<RawPattern>,
}

#[derive(Deserialize)]
struct RawDescriptor {
    #[serde(rename = "type", default)]
    types: Vec<String>,
    #[serde(default)]
    dim: Option<Dim>,
}

#[derive(Deserialize)]
struct RawPattern {
    pattern: String,
    #[serde(flatten)]
    descriptor: RawDescriptor,
}

impl RawDescriptor {
    fn into_descriptor(self, owner: &str) -> TypeDescriptor {
        let types = self.types.iter().filter_map(|name| match name.parse::<TypeTag>() {
            Ok(tag) => Some(tag),
            Err(unknown) => {
                log::warn!("{owner}: ignoring unknown type {unknown:?}");
                None
            }
        });
        TypeDescriptor {
            types: types.collect(),
            dim: self.dim,
        }
    }
}

impl SchemaIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an index from its JSON form.
    ///
    /// ```json
    /// {
    ///   "properties": { "reg": { "type": ["uint32-matrix"] } },
    ///   "patterns": [ { "pattern": "-gpios$", "type": ["phandle-array"] } ]
    /// }
    /// ```
    ///
    /// Pattern order is preserved; it decides which rule wins.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let raw: RawIndex = serde_json::from_str(json)?;
        let mut index = SchemaIndex::new();

        for (name, descriptor) in raw.properties {
            let descriptor = descriptor.into_descriptor(&name);
            index.insert(name, descriptor);
        }
        for RawPattern {
            pattern,
            descriptor,
        } in raw.patterns
        {
            let descriptor = descriptor.into_descriptor(&pattern);
            index.push_pattern(&pattern, descriptor)?;
        }

        log::debug!(
            "schema index: {} properties, {} patterns",
            index.exact.len(),
            index.patterns.len()
        );
        Ok(index)
    }

    /// Register the descriptor for an exact property name
    pub fn insert(&mut self, name: impl Into<String>, descriptor: TypeDescriptor) {
        self.exact.insert(name.into(), descriptor);
    }

    /// Append a pattern rule; later rules have lower priority
    pub fn push_pattern(
        &mut self,
        pattern: &str,
        descriptor: TypeDescriptor,
    ) -> Result<(), SchemaError> {
        let regex =
            Regex::new(pattern).map_err(|e| SchemaError::BadRegex(pattern.to_string(), e))?;
        self.patterns.push(PatternRule { regex, descriptor });
        Ok(())
    }

    /// Descriptor registered for exactly `name`
    pub fn exact_type(&self, name: &str) -> Option<&TypeDescriptor> {
        self.exact.get(name)
    }

    /// Pattern rules in priority order
    pub fn pattern_types(&self) -> &[PatternRule] {
        &self.patterns
    }

    /// Whether the exact descriptor of `name` lists `tag`
    pub fn has_type(&self, name: &str, tag: TypeTag) -> bool {
        self.exact_type(name).is_some_and(|d| d.contains(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{IntBase, IntFormat, Shape};

    #[test]
    fn test_load_from_json() {
        let index = SchemaIndex::from_json(
            r#"{
                "properties": {
                    "reg": { "type": ["uint32-matrix"], "dim": [[1, 4], [2, 2]] },
                    "status": { "type": ["string"] },
                    "odd": { "type": ["uint24", "flag"] }
                },
                "patterns": [
                    { "pattern": "-gpios?$", "type": ["phandle-array"] },
                    { "pattern": "^pinctrl-[0-9]+$", "type": ["phandle-array"] }
                ]
            }"#,
        )
        .unwrap();

        let reg = index.exact_type("reg").unwrap();
        assert_eq!(
            reg.first(),
            Some(TypeTag::Int(IntFormat {
                base: IntBase::Uint32,
                shape: Shape::Matrix
            }))
        );
        assert_eq!(reg.dim, Some([[1, 4], [2, 2]]));
        assert!(index.has_type("status", TypeTag::String));
        assert_eq!(index.exact_type("odd").unwrap().types, vec![TypeTag::Flag]);

        let patterns = index.pattern_types();
        assert_eq!(patterns.len(), 2);
        assert!(patterns[0].regex.is_match("reset-gpios"));
        assert!(!patterns[1].regex.is_match("pinctrl-names"));
    }

    #[test]
    fn test_bad_pattern_is_reported() {
        let mut index = SchemaIndex::new();
        let err = index
            .push_pattern("(unclosed", TypeDescriptor::new([TypeTag::Flag]))
            .unwrap_err();
        assert!(matches!(err, SchemaError::BadRegex(ref p, _) if p == "(unclosed"));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            SchemaIndex::from_json("{\"properties\": 3}"),
            Err(SchemaError::Json(_))
        ));
    }
}
