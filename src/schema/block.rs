use std::collections::{BTreeMap, BTreeSet};

use super::{DocString, FromWire, TypeConstraint};
use crate::cty::Type;
use crate::error::CodecError;
use crate::provider::{tfplugin5, tfplugin6};

/// How repeated instances of a nested block or nested attribute collapse
/// into a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestingMode {
    Single,
    List,
    Set,
    Map,
    /// Like `Single`, but the block is never null: an absent block reads as
    /// an object whose attributes are all null.
    Group,
    Invalid,
}

impl NestingMode {
    /// Block and object nesting enums share numbering in both versions.
    pub(crate) fn from_wire(nesting: i32) -> Self {
        match nesting {
            1 => Self::Single,
            2 => Self::List,
            3 => Self::Set,
            4 => Self::Map,
            5 => Self::Group,
            _ => Self::Invalid,
        }
    }

    fn wrap(self, object: Type, what: &str) -> Result<Type, CodecError> {
        match self {
            Self::Single | Self::Group => Ok(object),
            Self::List => Ok(Type::list(object)),
            Self::Set => Ok(Type::set(object)),
            Self::Map => Ok(Type::map(object)),
            Self::Invalid => Err(CodecError::InvalidType(format!(
                "{what} has an invalid nesting mode"
            ))),
        }
    }
}

/// Whether an attribute must, may, or cannot be set in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeUsage {
    Required,
    Optional,
    /// May be set in configuration; the provider chooses a value otherwise.
    OptionalComputed,
    Computed,
    /// A flag combination no valid schema uses.
    Unsupported,
}

// ─── Schema ──────────────────────────────────────────────────────────────────

/// Schema of the provider configuration, a resource type, or provider_meta.
#[derive(Debug, Clone, Copy)]
pub struct Schema<'a>(SchemaRepr<'a>);

#[derive(Debug, Clone, Copy)]
enum SchemaRepr<'a> {
    V5(&'a tfplugin5::Schema),
    V6(&'a tfplugin6::Schema),
}

impl<'a> FromWire<'a, tfplugin5::Schema> for Schema<'a> {
    fn from_wire(wire: &'a tfplugin5::Schema) -> Self {
        Self(SchemaRepr::V5(wire))
    }
}

impl<'a> FromWire<'a, tfplugin6::Schema> for Schema<'a> {
    fn from_wire(wire: &'a tfplugin6::Schema) -> Self {
        Self(SchemaRepr::V6(wire))
    }
}

impl<'a> Schema<'a> {
    /// Version of a managed resource type's schema, used for state upgrades.
    /// Meaningless for other schemas.
    pub fn version(&self) -> i64 {
        by_version!(self.0, SchemaRepr, |s| s.version)
    }

    pub fn block(&self) -> BlockType<'a> {
        by_version!(self.0, SchemaRepr, |s| s
            .block
            .as_ref()
            .map(BlockType::from_wire)
            .unwrap_or_default())
    }
}

// ─── Blocks ──────────────────────────────────────────────────────────────────

/// The attributes and nested blocks of one block. A missing block reads as
/// an empty one.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockType<'a>(Option<BlockRepr<'a>>);

#[derive(Debug, Clone, Copy)]
enum BlockRepr<'a> {
    V5(&'a tfplugin5::schema::Block),
    V6(&'a tfplugin6::schema::Block),
}

impl<'a> FromWire<'a, tfplugin5::schema::Block> for BlockType<'a> {
    fn from_wire(wire: &'a tfplugin5::schema::Block) -> Self {
        Self(Some(BlockRepr::V5(wire)))
    }
}

impl<'a> FromWire<'a, tfplugin6::schema::Block> for BlockType<'a> {
    fn from_wire(wire: &'a tfplugin6::schema::Block) -> Self {
        Self(Some(BlockRepr::V6(wire)))
    }
}

impl<'a> BlockType<'a> {
    pub fn attributes(&self) -> Box<dyn Iterator<Item = Attribute<'a>> + 'a> {
        match self.0 {
            None => Box::new(std::iter::empty()),
            Some(repr) => by_version!(repr, BlockRepr, |b| Box::new(
                b.attributes.iter().map(Attribute::from_wire)
            )),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<Attribute<'a>> {
        self.attributes().find(|a| a.name() == name)
    }

    pub fn nested_block_types(&self) -> Box<dyn Iterator<Item = NestedBlockType<'a>> + 'a> {
        match self.0 {
            None => Box::new(std::iter::empty()),
            Some(repr) => by_version!(repr, BlockRepr, |b| Box::new(
                b.block_types.iter().map(NestedBlockType::from_wire)
            )),
        }
    }

    pub fn nested_block_type(&self, name: &str) -> Option<NestedBlockType<'a>> {
        self.nested_block_types().find(|b| b.type_name() == name)
    }

    pub fn description(&self) -> DocString<'a> {
        match self.0 {
            None => DocString::new("", 0),
            Some(repr) => by_version!(repr, BlockRepr, |b| DocString::new(
                &b.description,
                b.description_kind
            )),
        }
    }

    pub fn is_deprecated(&self) -> bool {
        match self.0 {
            None => false,
            Some(repr) => by_version!(repr, BlockRepr, |b| b.deprecated),
        }
    }

    /// Names used more than once across this block's attributes and nested
    /// block types. Always empty for a conformant plugin.
    pub fn duplicate_names(&self) -> Vec<&'a str> {
        let mut seen = BTreeSet::new();
        let mut duplicates = Vec::new();
        let names = self
            .attributes()
            .map(|a| a.name())
            .chain(self.nested_block_types().map(|b| b.type_name()));
        for name in names {
            if !seen.insert(name) {
                duplicates.push(name);
            }
        }
        duplicates
    }

    /// The object type values of this block are serialized against.
    pub fn implied_type(&self) -> Result<Type, CodecError> {
        let mut attributes = BTreeMap::new();
        for attr in self.attributes() {
            attributes.insert(attr.name().to_string(), attr.implied_type()?);
        }
        for nested in self.nested_block_types() {
            attributes.insert(nested.type_name().to_string(), nested.implied_type()?);
        }
        Ok(Type::Object {
            attributes,
            optional: BTreeSet::new(),
        })
    }
}

// ─── Attributes ──────────────────────────────────────────────────────────────

/// A single attribute. Its type is given either by a flat type constraint or
/// by a nested object type, never both.
#[derive(Debug, Clone, Copy)]
pub struct Attribute<'a>(AttributeRepr<'a>);

#[derive(Debug, Clone, Copy)]
enum AttributeRepr<'a> {
    V5(&'a tfplugin5::schema::Attribute),
    V6(&'a tfplugin6::schema::Attribute),
}

impl<'a> FromWire<'a, tfplugin5::schema::Attribute> for Attribute<'a> {
    fn from_wire(wire: &'a tfplugin5::schema::Attribute) -> Self {
        Self(AttributeRepr::V5(wire))
    }
}

impl<'a> FromWire<'a, tfplugin6::schema::Attribute> for Attribute<'a> {
    fn from_wire(wire: &'a tfplugin6::schema::Attribute) -> Self {
        Self(AttributeRepr::V6(wire))
    }
}

impl<'a> Attribute<'a> {
    pub fn name(&self) -> &'a str {
        by_version!(self.0, AttributeRepr, |a| a.name.as_str())
    }

    /// The flat type constraint, absent when the attribute uses a nested type.
    pub fn type_constraint(&self) -> Option<TypeConstraint<'a>> {
        if self.nested_type().is_some() {
            return None;
        }
        let raw: &'a [u8] = by_version!(self.0, AttributeRepr, |a| &a.r#type);
        (!raw.is_empty()).then(|| TypeConstraint::new(raw))
    }

    /// The structural nested type. Protocol 5 has none.
    pub fn nested_type(&self) -> Option<ObjectType<'a>> {
        match self.0 {
            AttributeRepr::V5(_) => None,
            AttributeRepr::V6(a) => a.nested_type.as_ref().map(ObjectType::from_wire),
        }
    }

    pub fn usage(&self) -> AttributeUsage {
        let flags = by_version!(self.0, AttributeRepr, |a| (a.required, a.optional, a.computed));
        match flags {
            (true, false, false) => AttributeUsage::Required,
            (false, true, false) => AttributeUsage::Optional,
            (false, true, true) => AttributeUsage::OptionalComputed,
            (false, false, true) => AttributeUsage::Computed,
            _ => AttributeUsage::Unsupported,
        }
    }

    pub fn is_sensitive(&self) -> bool {
        by_version!(self.0, AttributeRepr, |a| a.sensitive)
    }

    pub fn is_write_only(&self) -> bool {
        by_version!(self.0, AttributeRepr, |a| a.write_only)
    }

    pub fn is_deprecated(&self) -> bool {
        by_version!(self.0, AttributeRepr, |a| a.deprecated)
    }

    pub fn description(&self) -> DocString<'a> {
        by_version!(self.0, AttributeRepr, |a| DocString::new(
            &a.description,
            a.description_kind
        ))
    }

    pub fn implied_type(&self) -> Result<Type, CodecError> {
        if let Some(nested) = self.nested_type() {
            return nested.implied_type();
        }
        match self.type_constraint() {
            Some(constraint) => constraint.ty(),
            None => Err(CodecError::InvalidType(format!(
                "attribute {:?} has neither a type nor a nested type",
                self.name()
            ))),
        }
    }
}

/// The structural type of a nested attribute (protocol 6 only).
#[derive(Debug, Clone, Copy)]
pub struct ObjectType<'a>(&'a tfplugin6::schema::Object);

impl<'a> FromWire<'a, tfplugin6::schema::Object> for ObjectType<'a> {
    fn from_wire(wire: &'a tfplugin6::schema::Object) -> Self {
        Self(wire)
    }
}

impl<'a> ObjectType<'a> {
    pub fn attributes(&self) -> impl Iterator<Item = Attribute<'a>> + 'a {
        self.0.attributes.iter().map(Attribute::from_wire)
    }

    pub fn attribute(&self, name: &str) -> Option<Attribute<'a>> {
        self.attributes().find(|a| a.name() == name)
    }

    /// Nested attributes never use `Group`.
    pub fn nesting(&self) -> NestingMode {
        match NestingMode::from_wire(self.0.nesting) {
            NestingMode::Group => NestingMode::Invalid,
            mode => mode,
        }
    }

    pub fn implied_type(&self) -> Result<Type, CodecError> {
        let mut attributes = BTreeMap::new();
        for attr in self.attributes() {
            attributes.insert(attr.name().to_string(), attr.implied_type()?);
        }
        let object = Type::Object {
            attributes,
            optional: BTreeSet::new(),
        };
        self.nesting().wrap(object, "nested attribute type")
    }
}

// ─── Nested Blocks ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct NestedBlockType<'a>(NestedBlockRepr<'a>);

#[derive(Debug, Clone, Copy)]
enum NestedBlockRepr<'a> {
    V5(&'a tfplugin5::schema::NestedBlock),
    V6(&'a tfplugin6::schema::NestedBlock),
}

impl<'a> FromWire<'a, tfplugin5::schema::NestedBlock> for NestedBlockType<'a> {
    fn from_wire(wire: &'a tfplugin5::schema::NestedBlock) -> Self {
        Self(NestedBlockRepr::V5(wire))
    }
}

impl<'a> FromWire<'a, tfplugin6::schema::NestedBlock> for NestedBlockType<'a> {
    fn from_wire(wire: &'a tfplugin6::schema::NestedBlock) -> Self {
        Self(NestedBlockRepr::V6(wire))
    }
}

impl<'a> NestedBlockType<'a> {
    pub fn type_name(&self) -> &'a str {
        by_version!(self.0, NestedBlockRepr, |b| b.type_name.as_str())
    }

    pub fn block(&self) -> BlockType<'a> {
        by_version!(self.0, NestedBlockRepr, |b| b
            .block
            .as_ref()
            .map(BlockType::from_wire)
            .unwrap_or_default())
    }

    pub fn nesting(&self) -> NestingMode {
        by_version!(self.0, NestedBlockRepr, |b| NestingMode::from_wire(b.nesting))
    }

    /// Declared (min, max) item counts. Advisory only; zero means unset.
    pub fn item_limits(&self) -> (i64, i64) {
        by_version!(self.0, NestedBlockRepr, |b| (b.min_items, b.max_items))
    }

    pub fn implied_type(&self) -> Result<Type, CodecError> {
        let object = self.block().implied_type()?;
        self.nesting()
            .wrap(object, &format!("nested block {:?}", self.type_name()))
    }
}
