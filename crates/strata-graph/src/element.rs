//! Graph nodes and edge labels.

use serde::{Deserialize, Serialize};
use std::fmt;
use strata_core::QualifiedName;

/// A node in the search graph.
///
/// Identity is by the wrapped value: two elements wrapping the same type are
/// the same node.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Element {
    /// A schema type.
    Type(QualifiedName),
    /// An attribute of a declaring type.
    Attribute {
        /// Type that declares the attribute.
        declaring: QualifiedName,
        /// Attribute name.
        name: String,
    },
    /// An operation, by `Service@@operation` name.
    Operation(String),
    /// A value of the given type produced by an operation.
    ///
    /// Kept apart from [`Element::Type`] so provided results do not alter the
    /// type-level graph.
    Instance(QualifiedName),
}

impl Element {
    /// Element for a type.
    pub fn type_of(name: impl Into<QualifiedName>) -> Self {
        Self::Type(name.into())
    }

    /// Element for an attribute.
    pub fn attribute(declaring: impl Into<QualifiedName>, name: impl Into<String>) -> Self {
        Self::Attribute {
            declaring: declaring.into(),
            name: name.into(),
        }
    }

    /// Element for an operation.
    pub fn operation(qualified_name: impl Into<String>) -> Self {
        Self::Operation(qualified_name.into())
    }

    /// Element for a provided instance.
    pub fn instance(type_name: impl Into<QualifiedName>) -> Self {
        Self::Instance(type_name.into())
    }

    /// Short label for the node category.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Type(_) => "type",
            Self::Attribute { .. } => "attribute",
            Self::Operation(_) => "operation",
            Self::Instance(_) => "instance",
        }
    }

    /// The wrapped type name, for type and instance elements.
    pub fn type_name(&self) -> Option<&QualifiedName> {
        match self {
            Self::Type(name) | Self::Instance(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type(name) => write!(f, "Type({name})"),
            Self::Attribute { declaring, name } => write!(f, "Attribute({declaring}.{name})"),
            Self::Operation(name) => write!(f, "Operation({name})"),
            Self::Instance(name) => write!(f, "Instance({name})"),
        }
    }
}

/// Edge labels between elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relationship {
    /// Type to one of its attributes.
    HasAttribute,
    /// Attribute to its value type.
    IsTypeOf,
    /// Attribute back to its declaring type.
    AttributeOf,
    /// Type to an operation that accepts it as a parameter.
    OperationParameter,
    /// Operation to the type of one of its parameters.
    RequiresParameter,
    /// Operation to the instance it returns.
    Provides,
    /// Provided instance to one of its attributes.
    InstanceHasAttribute,
    /// Provided instance to the type it populates.
    CanPopulate,
}

impl Relationship {
    /// Every relationship.
    pub const ALL: [Relationship; 8] = [
        Self::HasAttribute,
        Self::IsTypeOf,
        Self::AttributeOf,
        Self::OperationParameter,
        Self::RequiresParameter,
        Self::Provides,
        Self::InstanceHasAttribute,
        Self::CanPopulate,
    ];

    /// Canonical upper-case name.
    pub fn name(self) -> &'static str {
        match self {
            Self::HasAttribute => "HAS_ATTRIBUTE",
            Self::IsTypeOf => "IS_TYPE_OF",
            Self::AttributeOf => "ATTRIBUTE_OF",
            Self::OperationParameter => "OPERATION_PARAMETER",
            Self::RequiresParameter => "REQUIRES_PARAMETER",
            Self::Provides => "PROVIDES",
            Self::InstanceHasAttribute => "INSTANCE_HAS_ATTRIBUTE",
            Self::CanPopulate => "CAN_POPULATE",
        }
    }

    /// Cost of traversing an edge with this label.
    ///
    /// Uniform for now; weighting would change search order only.
    pub fn cost(self) -> u32 {
        1
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_element_identity_by_value() {
        let mut set = HashSet::new();
        set.insert(Element::type_of("OrderId"));
        set.insert(Element::type_of("OrderId"));
        set.insert(Element::instance("OrderId"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_element_display() {
        assert_eq!(Element::type_of("A").to_string(), "Type(A)");
        assert_eq!(Element::attribute("A", "b").to_string(), "Attribute(A.b)");
        assert_eq!(Element::operation("S@@op").to_string(), "Operation(S@@op)");
        assert_eq!(Element::instance("A").kind(), "instance");
    }

    #[test]
    fn test_relationship_names_are_unique() {
        let names: HashSet<_> = Relationship::ALL.iter().map(|r| r.name()).collect();
        assert_eq!(names.len(), Relationship::ALL.len());
        assert_eq!(Relationship::Provides.to_string(), "PROVIDES");
    }

    #[test]
    fn test_relationship_cost_is_uniform() {
        assert!(Relationship::ALL.iter().all(|r| r.cost() == 1));
    }
}
