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

use crate::error::Details;
use crate::schema::{
    ArraySchema, EnumSchema, FixedSchema, MapSchema, Name, Names, NamespaceRef, RecordField,
    RecordSchema, Schema, UnionSchema,
};
use crate::util::MapHelper;
use crate::validator::validate_enum_symbol_name;
use crate::{AvroResult, Error};
use log::{debug, warn};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

/// Parses one schema document, collecting every named type it defines.
///
/// A parser is created per document. Named types are registered in `parsed_schemas` under
/// their full name (and their aliases) in the depth-first order they are encountered, so
/// that later references in the same document resolve.
#[derive(Default)]
pub(crate) struct Parser {
    /// Used to resolve cyclic references, i.e. when a
    /// field's type is a reference to its record's type
    resolving_schemas: Names,
    parsed_schemas: Names,
}

impl Parser {
    /// Hand over the registry of named types found while parsing.
    pub(crate) fn into_names(self) -> Names {
        self.parsed_schemas
    }

    /// Create a `Schema` from a string representing a JSON Avro schema.
    pub(super) fn parse_str(&mut self, input: &str) -> AvroResult<Schema> {
        let value = serde_json::from_str(input).map_err(Details::ParseSchemaJson)?;
        self.parse(&value, None)
    }

    /// Create a `Schema` from a `serde_json::Value` representing a JSON Avro schema.
    pub(super) fn parse(
        &mut self,
        value: &Value,
        enclosing_namespace: NamespaceRef,
    ) -> AvroResult<Schema> {
        match *value {
            Value::String(ref t) => self.parse_known_schema(t.as_str(), enclosing_namespace),
            Value::Object(ref data) => self.parse_complex(data, enclosing_namespace),
            Value::Array(ref data) => self.parse_union(data, enclosing_namespace),
            _ => Err(Details::ParseSchemaFromValidJson.into()),
        }
    }

    /// Parse a string as a primitive type or reference to `parsed_schemas`.
    fn parse_known_schema(
        &mut self,
        name: &str,
        enclosing_namespace: NamespaceRef,
    ) -> AvroResult<Schema> {
        match name {
            "null" => Ok(Schema::Null),
            "boolean" => Ok(Schema::Boolean),
            "int" => Ok(Schema::Int),
            "long" => Ok(Schema::Long),
            "double" => Ok(Schema::Double),
            "float" => Ok(Schema::Float),
            "bytes" => Ok(Schema::Bytes),
            "string" => Ok(Schema::String),
            _ => self.fetch_schema_ref(name, enclosing_namespace),
        }
    }

    /// Given a name, returns a reference to a named type that was already defined in
    /// this document or that is currently being defined.
    fn fetch_schema_ref(
        &mut self,
        name: &str,
        enclosing_namespace: NamespaceRef,
    ) -> AvroResult<Schema> {
        // For good error reporting we add this check
        match name {
            "record" | "enum" | "fixed" | "array" | "map" => {
                return Err(Details::InvalidSchemaRecord(name.to_string()).into());
            }
            _ => (),
        }

        let fully_qualified_name = Name::new_with_enclosing_namespace(name, enclosing_namespace)
            .map_err(|_| Details::ParsePrimitive(name.to_string()))?;

        if self.parsed_schemas.contains_key(&fully_qualified_name)
            || self.resolving_schemas.contains_key(&fully_qualified_name)
        {
            return Ok(Schema::Ref {
                name: fully_qualified_name,
            });
        }

        // An unqualified name may also refer to a type declared without a namespace.
        if enclosing_namespace.is_some()
            && let Ok(bare) = Name::new(name)
            && (self.parsed_schemas.contains_key(&bare) || self.resolving_schemas.contains_key(&bare))
        {
            return Ok(Schema::Ref { name: bare });
        }

        Err(Details::ParsePrimitive(fully_qualified_name.to_string()).into())
    }

    /// Parse a `serde_json::Value` representing a complex Avro type into a `Schema`.
    ///
    /// Avro supports "recursive" definition of types.
    /// e.g: `{"type": {"type": "string"}}`
    pub(super) fn parse_complex(
        &mut self,
        complex: &Map<String, Value>,
        enclosing_namespace: NamespaceRef,
    ) -> AvroResult<Schema> {
        if let Some(logical_type) = complex.get("logicalType") {
            debug!("Decoding logical type {logical_type} as its underlying type");
        }

        match complex.get("type") {
            Some(Value::String(t)) => match t.as_str() {
                "record" => self.parse_record(complex, enclosing_namespace),
                "enum" => self.parse_enum(complex, enclosing_namespace),
                "array" => self.parse_array(complex, enclosing_namespace),
                "map" => self.parse_map(complex, enclosing_namespace),
                "fixed" => self.parse_fixed(complex, enclosing_namespace),
                other => self.parse_known_schema(other, enclosing_namespace),
            },
            Some(Value::Object(data)) => self.parse_complex(data, enclosing_namespace),
            Some(Value::Array(variants)) => self.parse_union(variants, enclosing_namespace),
            Some(unknown) => Err(Details::GetComplexType(unknown.clone()).into()),
            None => Err(Details::GetComplexTypeField.into()),
        }
    }

    fn parse_aliases(&self, complex: &Map<String, Value>, namespace: NamespaceRef) -> Vec<Name> {
        // An alias without a dot is relative to the namespace of the name it is an alias for.
        // https://avro.apache.org/docs/++version++/specification/#aliases
        complex
            .aliases()
            .unwrap_or_default()
            .iter()
            .filter_map(|alias| match Name::new_with_enclosing_namespace(alias, namespace) {
                Ok(name) => Some(name),
                Err(err) => {
                    warn!("Ignoring invalid alias {alias:?}: {err}");
                    None
                }
            })
            .collect()
    }

    fn register_resolving_schema(&mut self, name: &Name) -> AvroResult<()> {
        if self.parsed_schemas.contains_key(name) || self.resolving_schemas.contains_key(name) {
            return Err(Details::NameCollision(name.to_string()).into());
        }
        self.resolving_schemas
            .insert(name.clone(), Schema::Ref { name: name.clone() });
        Ok(())
    }

    fn register_parsed_schema(
        &mut self,
        fully_qualified_name: &Name,
        schema: &Schema,
        aliases: &[Name],
    ) -> AvroResult<()> {
        self.resolving_schemas.remove(fully_qualified_name);
        self.parsed_schemas
            .insert(fully_qualified_name.clone(), schema.clone());

        for alias in aliases {
            if self.parsed_schemas.contains_key(alias) {
                return Err(Details::NameCollision(alias.to_string()).into());
            }
            self.parsed_schemas.insert(alias.clone(), schema.clone());
        }
        Ok(())
    }

    /// Parse a `serde_json::Value` representing an Avro record type into a `Schema`.
    fn parse_record(
        &mut self,
        complex: &Map<String, Value>,
        enclosing_namespace: NamespaceRef,
    ) -> AvroResult<Schema> {
        let fully_qualified_name = Name::parse(complex, enclosing_namespace)?;
        let aliases = self.parse_aliases(complex, fully_qualified_name.namespace());

        self.register_resolving_schema(&fully_qualified_name)?;

        debug!("Going to parse record schema: {:?}", &fully_qualified_name);

        let fields: Vec<RecordField> = complex
            .get("fields")
            .and_then(|fields| fields.as_array())
            .ok_or_else(|| Error::new(Details::GetRecordFieldsJson))
            .and_then(|fields| {
                fields
                    .iter()
                    .enumerate()
                    .map(|(position, field)| {
                        let field = field
                            .as_object()
                            .ok_or_else(|| Error::new(Details::GetNameFieldFromRecord))?;
                        RecordField::parse(field, position, self, &fully_qualified_name)
                    })
                    .collect::<Result<_, _>>()
            })?;

        let mut lookup = BTreeMap::new();
        for (position, field) in fields.iter().enumerate() {
            if let Some(_old) = lookup.insert(field.name.clone(), position) {
                return Err(Details::FieldNameDuplicate(field.name.clone()).into());
            }
        }

        let schema = Schema::Record(RecordSchema {
            name: fully_qualified_name.clone(),
            aliases: aliases.clone(),
            fields,
            lookup,
        });

        self.register_parsed_schema(&fully_qualified_name, &schema, &aliases)?;
        Ok(schema)
    }

    /// Parse a `serde_json::Value` representing a Avro enum type into a `Schema`.
    fn parse_enum(
        &mut self,
        complex: &Map<String, Value>,
        enclosing_namespace: NamespaceRef,
    ) -> AvroResult<Schema> {
        let fully_qualified_name = Name::parse(complex, enclosing_namespace)?;
        let aliases = self.parse_aliases(complex, fully_qualified_name.namespace());

        self.register_resolving_schema(&fully_qualified_name)?;

        let symbols: Vec<String> = complex
            .get("symbols")
            .and_then(|v| v.as_array())
            .ok_or_else(|| Error::from(Details::GetEnumSymbolsField))
            .and_then(|symbols| {
                symbols
                    .iter()
                    .map(|symbol| symbol.as_str().map(|s| s.to_string()))
                    .collect::<Option<_>>()
                    .ok_or_else(|| Error::from(Details::GetEnumSymbols))
            })?;

        let mut existing_symbols: HashSet<&String> = HashSet::with_capacity(symbols.len());
        for symbol in symbols.iter() {
            validate_enum_symbol_name(symbol)?;

            // Ensure there are no duplicate symbols
            if !existing_symbols.insert(symbol) {
                return Err(Details::EnumSymbolDuplicate(symbol.to_string()).into());
            }
        }

        let schema = Schema::Enum(EnumSchema {
            name: fully_qualified_name.clone(),
            aliases: aliases.clone(),
            symbols,
        });

        self.register_parsed_schema(&fully_qualified_name, &schema, &aliases)?;

        Ok(schema)
    }

    /// Parse a `serde_json::Value` representing a Avro array type into a `Schema`.
    fn parse_array(
        &mut self,
        complex: &Map<String, Value>,
        enclosing_namespace: NamespaceRef,
    ) -> AvroResult<Schema> {
        complex
            .get("items")
            .ok_or_else(|| Details::GetArrayItemsField.into())
            .and_then(|items| self.parse(items, enclosing_namespace))
            .map(|items| {
                Schema::Array(ArraySchema {
                    items: Box::new(items),
                })
            })
    }

    /// Parse a `serde_json::Value` representing a Avro map type into a `Schema`.
    fn parse_map(
        &mut self,
        complex: &Map<String, Value>,
        enclosing_namespace: NamespaceRef,
    ) -> AvroResult<Schema> {
        complex
            .get("values")
            .ok_or_else(|| Details::GetMapValuesField.into())
            .and_then(|types| self.parse(types, enclosing_namespace))
            .map(|types| {
                Schema::Map(MapSchema {
                    types: Box::new(types),
                })
            })
    }

    /// Parse a `serde_json::Value` representing a Avro union type into a `Schema`.
    fn parse_union(
        &mut self,
        items: &[Value],
        enclosing_namespace: NamespaceRef,
    ) -> AvroResult<Schema> {
        let schemas = items
            .iter()
            .map(|v| self.parse(v, enclosing_namespace))
            .collect::<Result<Vec<_>, _>>()?;
        if schemas.is_empty() {
            warn!("Union schema without members! No value can be decoded with it.");
        }
        Ok(Schema::Union(UnionSchema::new(schemas)?))
    }

    /// Parse a `serde_json::Value` representing a Avro fixed type into a `Schema`.
    fn parse_fixed(
        &mut self,
        complex: &Map<String, Value>,
        enclosing_namespace: NamespaceRef,
    ) -> AvroResult<Schema> {
        let size = match complex.get("size") {
            Some(size) => size
                .as_u64()
                .ok_or_else(|| Details::GetFixedSizeFieldPositive(size.clone())),
            None => Err(Details::GetFixedSizeField),
        }?;

        let fully_qualified_name = Name::parse(complex, enclosing_namespace)?;
        let aliases = self.parse_aliases(complex, fully_qualified_name.namespace());

        self.register_resolving_schema(&fully_qualified_name)?;

        let schema = Schema::Fixed(FixedSchema {
            name: fully_qualified_name.clone(),
            aliases: aliases.clone(),
            size: size as usize,
        });

        self.register_parsed_schema(&fully_qualified_name, &schema, &aliases)?;

        Ok(schema)
    }
}
