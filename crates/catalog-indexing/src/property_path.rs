//! Property path evaluation over catalog items.
//!
//! Paths follow `segment(.segment)*`. A name segment reads a member of an
//! object, a numeric segment indexes into a list, and the configured mapped
//! list property consumes the following segment as a lookup key:
//! `productAttributes.heatRange` selects the `productAttributes` element
//! whose `name` is `heatRange` and yields its `value`.

use std::borrow::Cow;

use catalog_types::{AttributeValue, CatalogItem, FieldValue, MappedListSettings};

use crate::error::ResolveError;

/// Built-in property exposing the item identifier.
pub const ID_PROPERTY: &str = "id";

/// Anything a property path can be evaluated against.
pub trait PropertySource {
    fn property(&self, name: &str) -> Option<Cow<'_, AttributeValue>>;
}

impl PropertySource for CatalogItem {
    fn property(&self, name: &str) -> Option<Cow<'_, AttributeValue>> {
        if name == ID_PROPERTY {
            return Some(Cow::Owned(AttributeValue::from(self.id)));
        }
        self.attributes.get(name).map(Cow::Borrowed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Name(String),
    Index(usize),
    MappedKey {
        key: String,
        key_member: String,
        value_member: String,
    },
}

/// A parsed property path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyPath {
    raw: String,
    segments: Vec<Segment>,
}

impl PropertyPath {
    pub fn parse(path: &str, mapped: &MappedListSettings) -> Result<Self, ResolveError> {
        let invalid = |reason: &str| ResolveError::InvalidPath {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut parts = path.split('.');
        while let Some(part) = parts.next() {
            if part.is_empty() {
                return Err(invalid("empty segment"));
            }

            if part == mapped.list_property {
                let key = parts
                    .next()
                    .ok_or_else(|| invalid("mapped list property without a key"))?;
                if key.is_empty() {
                    return Err(invalid("empty segment"));
                }
                segments.push(Segment::Name(part.to_string()));
                segments.push(Segment::MappedKey {
                    key: key.to_string(),
                    key_member: mapped.key_member.clone(),
                    value_member: mapped.value_member.clone(),
                });
            } else if !segments.is_empty() && part.bytes().all(|b| b.is_ascii_digit()) {
                let index = part.parse().map_err(|_| invalid("list index out of range"))?;
                segments.push(Segment::Index(index));
            } else {
                segments.push(Segment::Name(part.to_string()));
            }
        }

        Ok(Self {
            raw: path.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Walk the path from `source` to the addressed attribute.
    pub fn evaluate<'a, S>(&self, source: &'a S) -> Result<Cow<'a, AttributeValue>, ResolveError>
    where
        S: PropertySource + ?Sized,
    {
        let mut segments = self.segments.iter();
        let mut current = match segments.next() {
            Some(Segment::Name(name)) => source
                .property(name)
                .ok_or_else(|| ResolveError::MissingProperty(self.raw.clone()))?,
            _ => {
                return Err(ResolveError::InvalidPath {
                    path: self.raw.clone(),
                    reason: "path must start with a property name".to_string(),
                })
            }
        };

        for segment in segments {
            current = match current {
                Cow::Borrowed(value) => Cow::Borrowed(self.step(value, segment)?),
                Cow::Owned(value) => Cow::Owned(self.step(&value, segment)?.clone()),
            };
        }
        Ok(current)
    }

    fn step<'v>(&self, value: &'v AttributeValue, segment: &Segment) -> Result<&'v AttributeValue, ResolveError> {
        let next = match (segment, value) {
            (Segment::Name(name), AttributeValue::Object(_)) => value.member(name),
            (Segment::Index(index), AttributeValue::List(items)) => items.get(*index),
            (
                Segment::MappedKey {
                    key,
                    key_member,
                    value_member,
                },
                AttributeValue::List(items),
            ) => items
                .iter()
                .find(|element| {
                    element
                        .member(key_member)
                        .and_then(AttributeValue::as_value)
                        .and_then(FieldValue::as_str)
                        == Some(key.as_str())
                })
                .and_then(|element| element.member(value_member)),
            (
                Segment::MappedKey {
                    key, value_member, ..
                },
                AttributeValue::Object(_),
            ) => value.member(key).and_then(|entry| entry.member(value_member)),
            _ => None,
        };
        next.ok_or_else(|| ResolveError::MissingProperty(self.raw.clone()))
    }
}

/// Convert a resolved attribute into index values.
///
/// Scalars yield one value and lists of scalars yield each element.
pub fn to_field_values(value: &AttributeValue, path: &str) -> Result<Vec<FieldValue>, ResolveError> {
    match value {
        AttributeValue::Value(v) => Ok(vec![v.clone()]),
        AttributeValue::List(items) => items
            .iter()
            .map(|item| {
                item.as_value()
                    .cloned()
                    .ok_or_else(|| ResolveError::NotIndexable(path.to_string()))
            })
            .collect(),
        AttributeValue::Object(_) => Err(ResolveError::NotIndexable(path.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> CatalogItem {
        CatalogItem::new(7)
            .with_attribute("name", "Hot Sauce")
            .with_attribute(
                "productAttributes",
                AttributeValue::List(vec![
                    AttributeValue::object([("name", "color"), ("value", "red")]),
                    AttributeValue::object([
                        ("name", AttributeValue::from("heatRange")),
                        ("value", AttributeValue::from(8)),
                    ]),
                ]),
            )
            .with_attribute(
                "sizes",
                AttributeValue::List(vec!["S".into(), "M".into(), "L".into()]),
            )
            .with_attribute(
                "manufacturer",
                AttributeValue::object([("name", "Acme"), ("country", "US")]),
            )
    }

    fn resolve(path: &str) -> Result<Vec<FieldValue>, ResolveError> {
        let item = item();
        let path = PropertyPath::parse(path, &MappedListSettings::default())?;
        let value = path.evaluate(&item)?;
        to_field_values(&value, path.as_str())
    }

    #[test]
    fn test_simple_property() {
        assert_eq!(resolve("name").unwrap(), vec![FieldValue::from("Hot Sauce")]);
    }

    #[test]
    fn test_builtin_id() {
        assert_eq!(resolve("id").unwrap(), vec![FieldValue::Integer(7)]);
    }

    #[test]
    fn test_nested_member() {
        assert_eq!(resolve("manufacturer.country").unwrap(), vec![FieldValue::from("US")]);
    }

    #[test]
    fn test_mapped_list_lookup() {
        assert_eq!(resolve("productAttributes.color").unwrap(), vec![FieldValue::from("red")]);
        assert_eq!(resolve("productAttributes.heatRange").unwrap(), vec![FieldValue::Integer(8)]);
    }

    #[test]
    fn test_list_values_and_index() {
        assert_eq!(
            resolve("sizes").unwrap(),
            vec![FieldValue::from("S"), FieldValue::from("M"), FieldValue::from("L")]
        );
        assert_eq!(resolve("sizes.1").unwrap(), vec![FieldValue::from("M")]);
        assert!(matches!(resolve("sizes.9"), Err(ResolveError::MissingProperty(_))));
    }

    #[test]
    fn test_missing_property() {
        assert!(matches!(resolve("weight"), Err(ResolveError::MissingProperty(_))));
        assert!(matches!(
            resolve("productAttributes.flavor"),
            Err(ResolveError::MissingProperty(_))
        ));
    }

    #[test]
    fn test_object_not_indexable() {
        assert!(matches!(resolve("manufacturer"), Err(ResolveError::NotIndexable(_))));
    }

    #[test]
    fn test_parse_errors() {
        let mapped = MappedListSettings::default();
        for path in ["", "name.", ".name", "a..b", "productAttributes"] {
            assert!(
                matches!(PropertyPath::parse(path, &mapped), Err(ResolveError::InvalidPath { .. })),
                "expected parse error for {:?}",
                path
            );
        }
    }

    #[test]
    fn test_custom_mapped_list() {
        let mapped = MappedListSettings {
            list_property: "specs".to_string(),
            key_member: "key".to_string(),
            value_member: "val".to_string(),
        };
        let item = CatalogItem::new(1).with_attribute(
            "specs",
            AttributeValue::List(vec![AttributeValue::object([("key", "weight"), ("val", "2kg")])]),
        );

        let path = PropertyPath::parse("specs.weight", &mapped).unwrap();
        let value = path.evaluate(&item).unwrap();
        assert_eq!(value.as_value(), Some(&FieldValue::from("2kg")));
    }
}
