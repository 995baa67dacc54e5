//! The schema catalog queried by the engine.
//!
//! A [`Schema`] is an immutable snapshot of the known types, their attributes,
//! and the services whose operations can produce or consume them. Schemas are
//! loaded from a serde-friendly [`SchemaDefinition`] (usually JSON) or built in
//! code with [`SchemaBuilder`]. Construction validates that every referenced
//! type exists.
//!
//! Parsing of a schema definition language is out of scope; any front end that
//! can produce a `SchemaDefinition` can feed the engine.

use crate::formula::Formula;
use crate::instance::TypedInstance;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Scalar types every schema understands without declaring them.
pub const PRIMITIVE_TYPES: [&str; 4] = ["String", "Int", "Decimal", "Boolean"];

/// Suffix that marks a collection type name, e.g. `Order[]`.
pub const COLLECTION_SUFFIX: &str = "[]";

// ============================================================================
// Names
// ============================================================================

/// A fully qualified schema name such as `com.acme.OrderId`.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QualifiedName(String);

impl QualifiedName {
    /// Create a qualified name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The full name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name without its namespace.
    pub fn short_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    /// Whether the name denotes a collection (`T[]`).
    pub fn is_collection(&self) -> bool {
        self.0.ends_with(COLLECTION_SUFFIX)
    }

    /// The collection name for this type (`T` becomes `T[]`).
    pub fn collection(&self) -> Self {
        Self(format!("{}{COLLECTION_SUFFIX}", self.0))
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QualifiedName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for QualifiedName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&QualifiedName> for QualifiedName {
    fn from(name: &QualifiedName) -> Self {
        name.clone()
    }
}

// ============================================================================
// Types
// ============================================================================

/// A schema type: a scalar, an object with attributes, or a collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Type {
    /// Qualified name of the type.
    pub name: QualifiedName,

    /// Base types this type is assignable to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inherits: Vec<QualifiedName>,

    /// Member type when this type is a collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_of: Option<QualifiedName>,

    /// Declared attributes, keyed by attribute name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Field>,
}

impl Type {
    /// Create a type with no attributes.
    pub fn new(name: impl Into<QualifiedName>) -> Self {
        Self {
            name: name.into(),
            inherits: Vec::new(),
            collection_of: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Create a collection type whose members are `member`.
    pub fn collection_of(member: impl Into<QualifiedName>) -> Self {
        let member = member.into();
        let mut ty = Self::new(member.collection());
        ty.collection_of = Some(member);
        ty
    }

    /// Add a base type.
    pub fn inherits(mut self, base: impl Into<QualifiedName>) -> Self {
        self.inherits.push(base.into());
        self
    }

    /// Add an attribute of the given type.
    pub fn attribute(self, name: impl Into<String>, type_name: impl Into<QualifiedName>) -> Self {
        self.with_field(name, Field::new(type_name))
    }

    /// Add a fully specified attribute.
    pub fn with_field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.attributes.insert(name.into(), field);
        self
    }

    /// Whether this type holds a single value (no attributes, not a collection).
    pub fn is_scalar(&self) -> bool {
        self.attributes.is_empty() && self.collection_of.is_none()
    }

    /// Whether this type is a collection.
    pub fn is_collection(&self) -> bool {
        self.collection_of.is_some()
    }
}

/// An attribute declaration on a type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Type of the attribute value.
    #[serde(rename = "type")]
    pub type_name: QualifiedName,

    /// Whether the attribute may be absent.
    #[serde(default)]
    pub nullable: bool,

    /// Expression deriving the value from sibling attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<Formula>,
}

impl Field {
    /// Create a non-nullable field.
    pub fn new(type_name: impl Into<QualifiedName>) -> Self {
        Self {
            type_name: type_name.into(),
            nullable: false,
            formula: None,
        }
    }

    /// Mark the field nullable.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Derive the field from sibling attributes.
    pub fn with_formula(mut self, formula: Formula) -> Self {
        self.formula = Some(formula);
        self
    }
}

// ============================================================================
// Services and operations
// ============================================================================

/// A named group of operations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Service {
    /// Qualified service name.
    pub name: QualifiedName,

    /// Operations exposed by the service.
    #[serde(default)]
    pub operations: Vec<Operation>,
}

/// A remote operation: ordered parameters in, one return type out.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Operation name, unique within its service.
    pub name: String,

    /// Owning service; filled in when the schema is assembled.
    #[serde(default)]
    pub service: QualifiedName,

    /// Ordered parameter list.
    #[serde(default)]
    pub parameters: Vec<Parameter>,

    /// Type produced by the operation.
    pub return_type: QualifiedName,
}

impl Operation {
    /// Create an operation with no parameters.
    pub fn new(name: impl Into<String>, return_type: impl Into<QualifiedName>) -> Self {
        Self {
            name: name.into(),
            service: QualifiedName::default(),
            parameters: Vec::new(),
            return_type: return_type.into(),
        }
    }

    /// Append a parameter.
    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// The `Service@@operation` name that identifies this operation globally.
    pub fn qualified_name(&self) -> String {
        format!("{}@@{}", self.service, self.name)
    }
}

/// One operation parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Optional parameter name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Required argument type.
    #[serde(rename = "type")]
    pub type_name: QualifiedName,

    /// Whether a null argument is acceptable.
    #[serde(default)]
    pub nullable: bool,

    /// Contracts an argument must satisfy before the call is made.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
}

impl Parameter {
    /// Create an unnamed parameter.
    pub fn new(type_name: impl Into<QualifiedName>) -> Self {
        Self {
            name: None,
            type_name: type_name.into(),
            nullable: false,
            constraints: Vec::new(),
        }
    }

    /// Create a named parameter.
    pub fn named(name: impl Into<String>, type_name: impl Into<QualifiedName>) -> Self {
        let mut param = Self::new(type_name);
        param.name = Some(name.into());
        param
    }

    /// Add a constraint.
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// The parameter name, or its type's short name when unnamed.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .unwrap_or_else(|| self.type_name.short_name())
    }

    /// Check every constraint against an argument.
    pub fn verify(&self, argument: &TypedInstance) -> std::result::Result<(), String> {
        if argument.is_null() && !self.nullable {
            return Err(format!("parameter {} must not be null", self.display_name()));
        }
        self.constraints
            .iter()
            .try_for_each(|constraint| constraint.check(argument))
    }
}

/// A contract on an operation argument.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Constraint {
    /// The named attribute of the argument must equal `value`.
    AttributeEquals {
        /// Attribute to inspect.
        attribute: String,
        /// Required raw value.
        value: serde_json::Value,
    },
    /// The argument's own value must equal `value`.
    ValueEquals {
        /// Required raw value.
        value: serde_json::Value,
    },
}

impl Constraint {
    /// Check the constraint, returning a description of the violation.
    pub fn check(&self, argument: &TypedInstance) -> std::result::Result<(), String> {
        match self {
            Self::AttributeEquals { attribute, value } => {
                let actual = argument
                    .attribute(attribute)
                    .map(TypedInstance::to_raw)
                    .unwrap_or(serde_json::Value::Null);
                if &actual == value {
                    Ok(())
                } else {
                    Err(format!(
                        "expected {}.{attribute} == {value}, found {actual}",
                        argument.type_name
                    ))
                }
            }
            Self::ValueEquals { value } => {
                let actual = argument.to_raw();
                if &actual == value {
                    Ok(())
                } else {
                    Err(format!(
                        "expected {} == {value}, found {actual}",
                        argument.type_name
                    ))
                }
            }
        }
    }
}

// ============================================================================
// Schema
// ============================================================================

/// Serializable input from which a [`Schema`] is assembled.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaDefinition {
    /// Declared types.
    pub types: Vec<Type>,
    /// Declared services.
    pub services: Vec<Service>,
}

/// An immutable, validated catalog of types and operations.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    types: BTreeMap<QualifiedName, Type>,
    services: BTreeMap<QualifiedName, Service>,
}

impl Schema {
    /// Start building a schema in code.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Parse a JSON [`SchemaDefinition`] and assemble it.
    pub fn from_json(json: &str) -> Result<Self> {
        let definition: SchemaDefinition = serde_json::from_str(json)?;
        Self::from_definition(definition)
    }

    /// Assemble and validate a schema.
    pub fn from_definition(definition: SchemaDefinition) -> Result<Self> {
        let mut types = BTreeMap::new();
        for name in PRIMITIVE_TYPES {
            types.insert(QualifiedName::from(name), Type::new(name));
        }
        for ty in definition.types {
            if types.contains_key(&ty.name) && !PRIMITIVE_TYPES.contains(&ty.name.as_str()) {
                return Err(Error::invalid_schema(format!(
                    "type {} is declared twice",
                    ty.name
                )));
            }
            types.insert(ty.name.clone(), ty);
        }

        let mut services = BTreeMap::new();
        for mut service in definition.services {
            let mut seen = BTreeSet::new();
            for operation in &mut service.operations {
                if !seen.insert(operation.name.clone()) {
                    return Err(Error::invalid_schema(format!(
                        "operation {}@@{} is declared twice",
                        service.name, operation.name
                    )));
                }
                operation.service = service.name.clone();
            }
            if services.insert(service.name.clone(), service).is_some() {
                return Err(Error::invalid_schema("service declared twice"));
            }
        }

        let mut schema = Self { types, services };
        schema.register_collection_types();
        schema.validate()?;
        Ok(schema)
    }

    /// Every referenced `T[]` name gets an implicit collection type.
    fn register_collection_types(&mut self) {
        let referenced: Vec<QualifiedName> = self
            .references()
            .into_iter()
            .map(|(name, _)| name)
            .filter(|name| name.is_collection() && !self.types.contains_key(name))
            .collect();
        for name in referenced {
            let member = name
                .as_str()
                .trim_end_matches(COLLECTION_SUFFIX)
                .to_string();
            self.types.insert(name, Type::collection_of(member));
        }
    }

    /// All type references with a description of where each one occurs.
    fn references(&self) -> Vec<(QualifiedName, String)> {
        let mut refs = Vec::new();
        for ty in self.types.values() {
            for base in &ty.inherits {
                refs.push((base.clone(), format!("base of {}", ty.name)));
            }
            if let Some(member) = &ty.collection_of {
                refs.push((member.clone(), format!("member of {}", ty.name)));
            }
            for (attr, field) in &ty.attributes {
                refs.push((field.type_name.clone(), format!("{}.{attr}", ty.name)));
            }
        }
        for operation in self.operations() {
            for param in &operation.parameters {
                refs.push((
                    param.type_name.clone(),
                    format!("parameter of {}", operation.qualified_name()),
                ));
            }
            refs.push((
                operation.return_type.clone(),
                format!("return of {}", operation.qualified_name()),
            ));
        }
        refs
    }

    fn validate(&self) -> Result<()> {
        for (name, site) in self.references() {
            if !self.types.contains_key(&name) {
                return Err(Error::invalid_schema(format!(
                    "unknown type {name} referenced by {site}"
                )));
            }
        }
        for ty in self.types.values() {
            for (attr, field) in &ty.attributes {
                let Some(formula) = &field.formula else {
                    continue;
                };
                for operand in &formula.operands {
                    if !ty.attributes.contains_key(operand) {
                        return Err(Error::invalid_schema(format!(
                            "formula for {}.{attr} uses unknown attribute {operand}",
                            ty.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Look up a type, failing if it is not declared.
    pub fn type_of(&self, name: &QualifiedName) -> Result<&Type> {
        self.types
            .get(name)
            .ok_or_else(|| Error::unknown_type(name.as_str()))
    }

    /// Look up a type.
    pub fn find_type(&self, name: &QualifiedName) -> Option<&Type> {
        self.types.get(name)
    }

    /// Whether a type is declared.
    pub fn has_type(&self, name: &QualifiedName) -> bool {
        self.types.contains_key(name)
    }

    /// All declared types, in name order.
    pub fn types(&self) -> impl Iterator<Item = &Type> {
        self.types.values()
    }

    /// All declared services, in name order.
    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.services.values()
    }

    /// All operations across all services.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.services.values().flat_map(|s| s.operations.iter())
    }

    /// Look up an operation by its `Service@@operation` name.
    pub fn operation(&self, qualified_name: &str) -> Result<&Operation> {
        let (service, name) = qualified_name
            .split_once("@@")
            .ok_or_else(|| Error::unknown_operation(qualified_name))?;
        self.services
            .get(&QualifiedName::from(service))
            .and_then(|s| s.operations.iter().find(|op| op.name == name))
            .ok_or_else(|| Error::unknown_operation(qualified_name))
    }

    /// Whether a value of `candidate` can stand in for `requested`.
    ///
    /// Holds for identical names and, transitively, for declared base types.
    pub fn is_assignable(&self, candidate: &QualifiedName, requested: &QualifiedName) -> bool {
        let mut visited = BTreeSet::new();
        let mut pending = vec![candidate];
        while let Some(name) = pending.pop() {
            if name == requested {
                return true;
            }
            if !visited.insert(name) {
                continue;
            }
            if let Some(ty) = self.types.get(name) {
                pending.extend(ty.inherits.iter());
            }
        }
        false
    }

    /// Attributes of a type including those inherited from its bases.
    pub fn attributes_of(&self, name: &QualifiedName) -> BTreeMap<&str, &Field> {
        let mut out = BTreeMap::new();
        let mut visited = BTreeSet::new();
        let mut pending = vec![name];
        while let Some(current) = pending.pop() {
            if !visited.insert(current) {
                continue;
            }
            if let Some(ty) = self.types.get(current) {
                for (attr, field) in &ty.attributes {
                    out.entry(attr.as_str()).or_insert(field);
                }
                pending.extend(ty.inherits.iter());
            }
        }
        out
    }

    /// Member type of a collection type.
    pub fn member_type(&self, name: &QualifiedName) -> Option<&QualifiedName> {
        self.types.get(name).and_then(|ty| ty.collection_of.as_ref())
    }

    /// Operations with at least one parameter that accepts `type_name`.
    pub fn operations_accepting(&self, type_name: &QualifiedName) -> Vec<&Operation> {
        self.operations()
            .filter(|op| {
                op.parameters
                    .iter()
                    .any(|p| self.is_assignable(type_name, &p.type_name))
            })
            .collect()
    }

    /// Operations returning `type_name` or a collection of it.
    pub fn operations_returning(&self, type_name: &QualifiedName) -> Vec<&Operation> {
        self.operations()
            .filter(|op| {
                self.is_assignable(&op.return_type, type_name)
                    || self
                        .member_type(&op.return_type)
                        .is_some_and(|member| self.is_assignable(member, type_name))
            })
            .collect()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Fluent, in-code construction of a [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    definition: SchemaDefinition,
}

impl SchemaBuilder {
    /// Declare a type.
    pub fn with_type(mut self, ty: Type) -> Self {
        self.definition.types.push(ty);
        self
    }

    /// Declare a scalar type, optionally inheriting from a primitive.
    pub fn with_scalar(self, name: impl Into<QualifiedName>) -> Self {
        self.with_type(Type::new(name))
    }

    /// Declare an operation on a service, creating the service if needed.
    pub fn with_operation(mut self, service: impl Into<QualifiedName>, operation: Operation) -> Self {
        let service = service.into();
        let services = &mut self.definition.services;
        match services.iter().position(|s| s.name == service) {
            Some(idx) => services[idx].operations.push(operation),
            None => services.push(Service {
                name: service,
                operations: vec![operation],
            }),
        }
        self
    }

    /// Assemble and validate.
    pub fn build(self) -> Result<Schema> {
        Schema::from_definition(self.definition)
    }
}

// ============================================================================
// Tests
// ============================================================================
