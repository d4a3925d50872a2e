// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Logic for parsing and interacting with schemas in Avro format.

mod name;
mod parser;
mod record;
mod union;

pub(crate) use crate::schema::parser::Parser;
pub use crate::schema::{
    name::{Name, Names, NamespaceRef},
    record::{RecordField, RecordSchema},
    union::UnionSchema,
};
use crate::{AvroResult, error::Details, types::Value};
use strum_macros::EnumDiscriminants;

/// Represents any valid Avro schema
/// More information about Avro schemas can be found in the
/// [Avro Specification](https://avro.apache.org/docs/current/specification/#schema-declaration)
#[derive(Clone, Debug, PartialEq, EnumDiscriminants)]
#[strum_discriminants(name(SchemaKind), derive(Hash, Ord, PartialOrd))]
pub enum Schema {
    /// A `null` Avro schema.
    Null,
    /// A `boolean` Avro schema.
    Boolean,
    /// An `int` Avro schema.
    Int,
    /// A `long` Avro schema.
    Long,
    /// A `float` Avro schema.
    Float,
    /// A `double` Avro schema.
    Double,
    /// A `bytes` Avro schema.
    /// `Bytes` represents a sequence of 8-bit unsigned bytes.
    Bytes,
    /// A `string` Avro schema.
    /// `String` represents a unicode character sequence.
    String,
    /// A `array` Avro schema. Avro arrays are required to have the same type for each element.
    /// This variant holds the `Schema` for the array element type.
    Array(ArraySchema),
    /// A `map` Avro schema.
    /// `Map` holds a pointer to the `Schema` of its values, which must all be the same schema.
    /// `Map` keys are assumed to be `string`.
    Map(MapSchema),
    /// A `union` Avro schema.
    Union(UnionSchema),
    /// A `record` Avro schema.
    Record(RecordSchema),
    /// An `enum` Avro schema.
    Enum(EnumSchema),
    /// A `fixed` Avro schema.
    Fixed(FixedSchema),
    /// A reference to another named schema, resolved through the [`Names`] registry of the
    /// document it was parsed from.
    Ref { name: Name },
}

impl From<&Value> for SchemaKind {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Boolean(_) => Self::Boolean,
            Value::Int(_) => Self::Int,
            Value::Long(_) => Self::Long,
            Value::Float(_) => Self::Float,
            Value::Double(_) => Self::Double,
            Value::Bytes(_) => Self::Bytes,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Map(_) => Self::Map,
            Value::Union(_, _) => Self::Union,
            Value::Record(_) => Self::Record,
            Value::Enum(_, _) => Self::Enum,
            Value::Fixed(_, _) => Self::Fixed,
        }
    }
}

/// A description of an Array schema.
#[derive(Clone, Debug, PartialEq)]
pub struct ArraySchema {
    pub items: Box<Schema>,
}

/// A description of a Map schema.
#[derive(Clone, Debug, PartialEq)]
pub struct MapSchema {
    pub types: Box<Schema>,
}

/// A description of an Enum schema.
#[derive(Clone, Debug, PartialEq)]
pub struct EnumSchema {
    /// The name of the schema
    pub name: Name,
    /// The aliases of the schema
    pub aliases: Vec<Name>,
    /// The set of symbols of the schema, in encoded index order
    pub symbols: Vec<String>,
}

/// A description of a Fixed schema.
#[derive(Clone, Debug, PartialEq)]
pub struct FixedSchema {
    /// The name of the schema
    pub name: Name,
    /// The aliases of the schema
    pub aliases: Vec<Name>,
    /// The size of the fixed schema
    pub size: usize,
}

impl Schema {
    /// Create a `Schema` from a string representing a JSON Avro schema.
    ///
    /// Named types are resolved within the document and then discarded; use
    /// [`ResolvedSchema::parse_str`] to keep the registry needed to decode references.
    pub fn parse_str(input: &str) -> AvroResult<Schema> {
        let mut parser = Parser::default();
        parser.parse_str(input)
    }

    /// Returns the name of the schema if it has one.
    pub fn name(&self) -> Option<&Name> {
        match self {
            Schema::Ref { name, .. }
            | Schema::Record(RecordSchema { name, .. })
            | Schema::Enum(EnumSchema { name, .. })
            | Schema::Fixed(FixedSchema { name, .. }) => Some(name),
            _ => None,
        }
    }
}

/// A parsed schema together with the registry of the named types it defines.
///
/// This is what the datum decoder works from: every [`Schema::Ref`] inside `schema` resolves
/// through `names`.
#[derive(Clone, Debug)]
pub struct ResolvedSchema {
    schema: Schema,
    names: Names,
}

impl ResolvedSchema {
    /// Parse a JSON schema document, keeping every named type it defines.
    pub fn parse_str(input: &str) -> AvroResult<Self> {
        let mut parser = Parser::default();
        let schema = parser.parse_str(input)?;
        Ok(ResolvedSchema {
            schema,
            names: parser.into_names(),
        })
    }

    /// Parse a JSON schema document given as raw bytes, as found in container metadata.
    pub fn parse_slice(input: &[u8]) -> AvroResult<Self> {
        let value: serde_json::Value =
            serde_json::from_slice(input).map_err(Details::ParseSchemaJson)?;
        let mut parser = Parser::default();
        let schema = parser.parse(&value, None)?;
        Ok(ResolvedSchema {
            schema,
            names: parser.into_names(),
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn names(&self) -> &Names {
        &self.names
    }

    /// Follow a [`Schema::Ref`] to the named type it points at. Any other schema is
    /// returned as is.
    pub fn resolve<'s>(&'s self, schema: &'s Schema) -> AvroResult<&'s Schema> {
        resolve_ref(schema, &self.names)
    }
}

/// Follow a [`Schema::Ref`] through `names`.
pub(crate) fn resolve_ref<'s>(schema: &'s Schema, names: &'s Names) -> AvroResult<&'s Schema> {
    match schema {
        Schema::Ref { name } => names
            .get(name)
            .ok_or_else(|| Details::SchemaResolutionError(name.clone()).into()),
        other => Ok(other),
    }
}
