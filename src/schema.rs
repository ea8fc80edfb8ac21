//! Field tag table consumed by the codec.
//!
//! The table maps each field name to its tag, wire type and repetition.
//! `Schema::chain()` is the table of the chain's transaction format; other
//! tables can be loaded from JSON as long as they describe the same fields.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};

/// Largest tag representable in a field key.
pub const MAX_TAG: u32 = (1 << 29) - 1;

/// Tags set aside by the protobuf format for its own use.
pub const RESERVED_TAGS: std::ops::RangeInclusive<u32> = 19000..=19999;

/// Encoding category of a value on the wire.
#[repr(u8)]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WireType {
    Varint = 0,
    Fixed64 = 1,
    LengthDelimited = 2,
    StartGroup = 3,
    EndGroup = 4,
    Fixed32 = 5,
}

impl WireType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Varint),
            1 => Some(Self::Fixed64),
            2 => Some(Self::LengthDelimited),
            3 => Some(Self::StartGroup),
            4 => Some(Self::EndGroup),
            5 => Some(Self::Fixed32),
            _ => None,
        }
    }
}

/// One row of the table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub tag: u32,
    pub wire_type: WireType,
    #[serde(default)]
    pub repeated: bool,
}

impl FieldSpec {
    pub fn new(name: &str, tag: u32, wire_type: WireType) -> Self {
        Self {
            name: name.to_string(),
            tag,
            wire_type,
            repeated: false,
        }
    }

    pub fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }
}

/// The fields of one message type.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MessageSchema {
    pub name: String,
    pub fields: Vec<FieldSpec>,
}

impl MessageSchema {
    pub fn new(name: &str, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: name.to_string(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_by_tag(&self, tag: u32) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.tag == tag)
    }

    /// Checks tag ranges and uniqueness of tags and names.
    pub fn validate(&self) -> Result<()> {
        let mut tags = HashSet::new();
        let mut names = HashSet::new();
        for field in &self.fields {
            if field.tag == 0 || field.tag > MAX_TAG {
                return Err(CodecError::schema(format!(
                    "{}.{}: tag {} out of range 1..={}",
                    self.name, field.name, field.tag, MAX_TAG
                )));
            }
            if RESERVED_TAGS.contains(&field.tag) {
                return Err(CodecError::schema(format!(
                    "{}.{}: tag {} is reserved",
                    self.name, field.name, field.tag
                )));
            }
            if !tags.insert(field.tag) {
                return Err(CodecError::schema(format!(
                    "{}: tag {} assigned twice",
                    self.name, field.tag
                )));
            }
            if !names.insert(field.name.as_str()) {
                return Err(CodecError::schema(format!(
                    "{}: field {} declared twice",
                    self.name, field.name
                )));
            }
        }
        Ok(())
    }
}

/// Tag tables for every message the codec handles.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub transaction: MessageSchema,
    pub operation: MessageSchema,
    pub create_account: MessageSchema,
}

impl Schema {
    /// The chain's transaction format.
    pub fn chain() -> Self {
        use WireType::{LengthDelimited, Varint};

        Self {
            transaction: MessageSchema::new(
                "Transaction",
                vec![
                    FieldSpec::new("source_address", 1, LengthDelimited),
                    FieldSpec::new("nonce", 2, Varint),
                    FieldSpec::new("fee_limit", 3, Varint),
                    FieldSpec::new("gas_price", 4, Varint),
                    FieldSpec::new("metadata", 6, LengthDelimited),
                    FieldSpec::new("operations", 7, LengthDelimited).repeated(),
                ],
            ),
            operation: MessageSchema::new(
                "Operation",
                vec![
                    FieldSpec::new("type", 1, Varint),
                    FieldSpec::new("source_address", 2, LengthDelimited),
                    FieldSpec::new("metadata", 3, LengthDelimited),
                    FieldSpec::new("create_account", 4, LengthDelimited),
                ],
            ),
            create_account: MessageSchema::new(
                "OperationCreateAccount",
                vec![
                    FieldSpec::new("dest_address", 1, LengthDelimited),
                    FieldSpec::new("init_balance", 5, Varint),
                ],
            ),
        }
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn validate(&self) -> Result<()> {
        self.transaction.validate()?;
        self.operation.validate()?;
        self.create_account.validate()
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::chain()
    }
}
