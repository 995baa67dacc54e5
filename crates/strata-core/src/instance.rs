//! Typed values ("facts") flowing through a query.

use crate::schema::{QualifiedName, Schema};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A value tagged with the schema type it belongs to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypedInstance {
    /// Schema type of the value.
    pub type_name: QualifiedName,
    /// The value itself.
    pub value: InstanceValue,
}

/// Shape of a [`TypedInstance`] value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum InstanceValue {
    /// No value.
    Null,
    /// A single raw value.
    Scalar(Value),
    /// Attribute name to typed attribute value.
    Object(BTreeMap<String, TypedInstance>),
    /// Ordered typed members.
    Collection(Vec<TypedInstance>),
}

impl TypedInstance {
    /// Create a scalar instance.
    pub fn scalar(type_name: impl Into<QualifiedName>, value: impl Into<Value>) -> Self {
        Self {
            type_name: type_name.into(),
            value: InstanceValue::Scalar(value.into()),
        }
    }

    /// Create a null instance.
    pub fn null(type_name: impl Into<QualifiedName>) -> Self {
        Self {
            type_name: type_name.into(),
            value: InstanceValue::Null,
        }
    }

    /// Create an object instance.
    pub fn object<I, S>(type_name: impl Into<QualifiedName>, fields: I) -> Self
    where
        I: IntoIterator<Item = (S, TypedInstance)>,
        S: Into<String>,
    {
        Self {
            type_name: type_name.into(),
            value: InstanceValue::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }

    /// Create a collection instance.
    pub fn collection(type_name: impl Into<QualifiedName>, items: Vec<TypedInstance>) -> Self {
        Self {
            type_name: type_name.into(),
            value: InstanceValue::Collection(items),
        }
    }

    /// Type a raw JSON value according to the schema.
    ///
    /// Declared attributes missing from `json` become nulls, except calculated
    /// attributes, which are left for the engine to derive.
    pub fn from_json(schema: &Schema, type_name: &QualifiedName, json: &Value) -> Result<Self> {
        let ty = schema.type_of(type_name)?;
        if json.is_null() {
            return Ok(Self::null(type_name));
        }

        if let Some(member) = &ty.collection_of {
            let items = json.as_array().ok_or_else(|| {
                Error::invalid_data(format!("expected an array for {type_name}, got {json}"))
            })?;
            let items = items
                .iter()
                .map(|item| Self::from_json(schema, member, item))
                .collect::<Result<Vec<_>>>()?;
            return Ok(Self::collection(type_name, items));
        }

        let attributes = schema.attributes_of(type_name);
        if attributes.is_empty() {
            if json.is_object() || json.is_array() {
                return Err(Error::invalid_data(format!(
                    "expected a scalar for {type_name}, got {json}"
                )));
            }
            return Ok(Self::scalar(type_name, json.clone()));
        }

        let object = json.as_object().ok_or_else(|| {
            Error::invalid_data(format!("expected an object for {type_name}, got {json}"))
        })?;
        let mut fields = BTreeMap::new();
        for (name, field) in attributes {
            match object.get(name) {
                Some(raw) => {
                    fields.insert(
                        name.to_string(),
                        Self::from_json(schema, &field.type_name, raw)?,
                    );
                }
                None if field.formula.is_some() => {}
                None => {
                    fields.insert(name.to_string(), Self::null(&field.type_name));
                }
            }
        }
        Ok(Self {
            type_name: type_name.clone(),
            value: InstanceValue::Object(fields),
        })
    }

    /// The untyped JSON form of this instance.
    pub fn to_raw(&self) -> Value {
        match &self.value {
            InstanceValue::Null => Value::Null,
            InstanceValue::Scalar(v) => v.clone(),
            InstanceValue::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_raw()))
                    .collect(),
            ),
            InstanceValue::Collection(items) => {
                Value::Array(items.iter().map(TypedInstance::to_raw).collect())
            }
        }
    }

    /// Whether this instance carries no usable value.
    pub fn is_null(&self) -> bool {
        match &self.value {
            InstanceValue::Null => true,
            InstanceValue::Scalar(v) => v.is_null(),
            _ => false,
        }
    }

    /// Whether this instance is a collection.
    pub fn is_collection(&self) -> bool {
        matches!(self.value, InstanceValue::Collection(_))
    }

    /// An attribute of an object instance.
    pub fn attribute(&self, name: &str) -> Option<&TypedInstance> {
        match &self.value {
            InstanceValue::Object(fields) => fields.get(name),
            _ => None,
        }
    }

    /// Members of a collection; a non-collection is its own single member.
    pub fn members(&self) -> Vec<&TypedInstance> {
        match &self.value {
            InstanceValue::Collection(items) => items.iter().collect(),
            _ => vec![self],
        }
    }

    /// Directly nested instances: attribute values or collection members.
    pub fn children(&self) -> Vec<&TypedInstance> {
        match &self.value {
            InstanceValue::Object(fields) => fields.values().collect(),
            InstanceValue::Collection(items) => items.iter().collect(),
            InstanceValue::Null | InstanceValue::Scalar(_) => Vec::new(),
        }
    }
}

impl fmt::Display for TypedInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.type_name.short_name(), self.to_raw())
    }
}

// ============================================================================
// Tests
// ============================================================================
