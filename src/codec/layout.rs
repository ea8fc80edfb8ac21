//! Resolution of the schema table into per-message tag lookups.

use tracing::warn;

use crate::error::{CodecError, Result};
use crate::schema::{MessageSchema, Schema, WireType, MAX_TAG, RESERVED_TAGS};
use crate::tx::UnknownField;

/// A field the codec knows how to populate, with the wire shape it expects.
pub(crate) struct FieldDef<F> {
    pub field: F,
    pub name: &'static str,
    pub wire_type: WireType,
    pub repeated: bool,
}

/// The closed set of fields of one message type.
pub(crate) trait FieldSet: Copy + 'static {
    const FIELDS: &'static [FieldDef<Self>];

    /// Position of this field in `FIELDS`.
    fn index(self) -> usize;
}

/// Tags of one message type, resolved from the table.
pub(crate) struct FieldTable<F> {
    message: String,
    tags: Vec<u32>,
    by_tag: Vec<(u32, F, WireType)>,
}

impl<F: FieldSet> FieldTable<F> {
    pub(crate) fn resolve(message: &MessageSchema) -> Result<Self> {
        message.validate()?;

        let mut tags = Vec::with_capacity(F::FIELDS.len());
        let mut by_tag = Vec::with_capacity(F::FIELDS.len());
        for def in F::FIELDS {
            let spec = message.field(def.name).ok_or_else(|| {
                CodecError::schema(format!("{}.{} missing from schema", message.name, def.name))
            })?;
            if spec.wire_type != def.wire_type {
                return Err(CodecError::schema(format!(
                    "{}.{} must use wire type {:?}, table says {:?}",
                    message.name, def.name, def.wire_type, spec.wire_type
                )));
            }
            if spec.repeated != def.repeated {
                return Err(CodecError::schema(format!(
                    "{}.{} repetition mismatch",
                    message.name, def.name
                )));
            }
            tags.push(spec.tag);
            by_tag.push((spec.tag, def.field, spec.wire_type));
        }

        for spec in &message.fields {
            if !F::FIELDS.iter().any(|def| def.name == spec.name) {
                warn!(
                    schema = %message.name,
                    field = %spec.name,
                    tag = spec.tag,
                    "schema field has no codec binding, it will decode as unknown"
                );
            }
        }

        by_tag.sort_by_key(|(tag, _, _)| *tag);
        Ok(Self {
            message: message.name.clone(),
            tags,
            by_tag,
        })
    }

    pub(crate) fn tag(&self, field: F) -> u32 {
        self.tags[field.index()]
    }

    pub(crate) fn lookup(&self, tag: u32) -> Option<(F, WireType)> {
        self.by_tag
            .binary_search_by_key(&tag, |(t, _, _)| *t)
            .ok()
            .map(|i| (self.by_tag[i].1, self.by_tag[i].2))
    }

    /// Rejects unknown fields that would not read back as written: tags the
    /// key cannot carry, reserved tags, and tags this message already binds.
    pub(crate) fn check_unknown(&self, unknown: &[UnknownField]) -> Result<()> {
        for field in unknown {
            if field.tag == 0 || field.tag > MAX_TAG || RESERVED_TAGS.contains(&field.tag) {
                return Err(CodecError::schema(format!(
                    "{}: unknown field tag {} cannot be written",
                    self.message, field.tag
                )));
            }
            if let Some((bound, _)) = self.lookup(field.tag) {
                return Err(CodecError::schema(format!(
                    "{}: unknown field tag {} is bound to {}",
                    self.message,
                    field.tag,
                    F::FIELDS[bound.index()].name
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TxField {
    SourceAddress,
    Nonce,
    FeeLimit,
    GasPrice,
    Metadata,
    Operations,
}

impl FieldSet for TxField {
    const FIELDS: &'static [FieldDef<Self>] = &[
        FieldDef {
            field: TxField::SourceAddress,
            name: "source_address",
            wire_type: WireType::LengthDelimited,
            repeated: false,
        },
        FieldDef {
            field: TxField::Nonce,
            name: "nonce",
            wire_type: WireType::Varint,
            repeated: false,
        },
        FieldDef {
            field: TxField::FeeLimit,
            name: "fee_limit",
            wire_type: WireType::Varint,
            repeated: false,
        },
        FieldDef {
            field: TxField::GasPrice,
            name: "gas_price",
            wire_type: WireType::Varint,
            repeated: false,
        },
        FieldDef {
            field: TxField::Metadata,
            name: "metadata",
            wire_type: WireType::LengthDelimited,
            repeated: false,
        },
        FieldDef {
            field: TxField::Operations,
            name: "operations",
            wire_type: WireType::LengthDelimited,
            repeated: true,
        },
    ];

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OpField {
    Type,
    SourceAddress,
    Metadata,
    CreateAccount,
}

impl FieldSet for OpField {
    const FIELDS: &'static [FieldDef<Self>] = &[
        FieldDef {
            field: OpField::Type,
            name: "type",
            wire_type: WireType::Varint,
            repeated: false,
        },
        FieldDef {
            field: OpField::SourceAddress,
            name: "source_address",
            wire_type: WireType::LengthDelimited,
            repeated: false,
        },
        FieldDef {
            field: OpField::Metadata,
            name: "metadata",
            wire_type: WireType::LengthDelimited,
            repeated: false,
        },
        FieldDef {
            field: OpField::CreateAccount,
            name: "create_account",
            wire_type: WireType::LengthDelimited,
            repeated: false,
        },
    ];

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CreateAccountField {
    DestAddress,
    InitBalance,
}

impl FieldSet for CreateAccountField {
    const FIELDS: &'static [FieldDef<Self>] = &[
        FieldDef {
            field: CreateAccountField::DestAddress,
            name: "dest_address",
            wire_type: WireType::LengthDelimited,
            repeated: false,
        },
        FieldDef {
            field: CreateAccountField::InitBalance,
            name: "init_balance",
            wire_type: WireType::Varint,
            repeated: false,
        },
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// All tag lookups the codec needs.
pub(crate) struct Layout {
    pub transaction: FieldTable<TxField>,
    pub operation: FieldTable<OpField>,
    pub create_account: FieldTable<CreateAccountField>,
}

impl Layout {
    pub(crate) fn resolve(schema: &Schema) -> Result<Self> {
        Ok(Self {
            transaction: FieldTable::resolve(&schema.transaction)?,
            operation: FieldTable::resolve(&schema.operation)?,
            create_account: FieldTable::resolve(&schema.create_account)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;

    #[test]
    fn resolves_chain_schema() {
        let layout = Layout::resolve(&Schema::chain()).unwrap();
        assert_eq!(layout.transaction.tag(TxField::Operations), 7);
        assert_eq!(layout.create_account.tag(CreateAccountField::InitBalance), 5);
        assert_eq!(
            layout.operation.lookup(4),
            Some((OpField::CreateAccount, WireType::LengthDelimited))
        );
        assert_eq!(layout.transaction.lookup(5), None);
    }

    #[test]
    fn missing_field_is_schema_violation() {
        let mut schema = Schema::chain();
        schema.create_account.fields.retain(|f| f.name != "init_balance");
        assert!(matches!(
            Layout::resolve(&schema),
            Err(CodecError::SchemaViolation(_))
        ));
    }

    #[test]
    fn wrong_wire_type_is_schema_violation() {
        let mut schema = Schema::chain();
        schema.transaction.fields[1].wire_type = WireType::Fixed64;
        assert!(Layout::resolve(&schema).is_err());
    }

    #[test]
    fn repetition_must_match() {
        let mut schema = Schema::chain();
        schema.transaction.fields[5].repeated = false;
        assert!(Layout::resolve(&schema).is_err());
    }

    #[test]
    fn extra_fields_are_tolerated() {
        let mut schema = Schema::chain();
        schema
            .transaction
            .fields
            .push(FieldSpec::new("ceil_ledger_seq", 5, WireType::Varint));
        let layout = Layout::resolve(&schema).unwrap();
        assert_eq!(layout.transaction.lookup(5), None);
    }

    #[test]
    fn renumbered_tags_are_honored() {
        let mut schema = Schema::chain();
        schema.operation.fields[3].tag = 40;
        let layout = Layout::resolve(&schema).unwrap();
        assert_eq!(layout.operation.tag(OpField::CreateAccount), 40);
        assert_eq!(layout.operation.lookup(4), None);
    }
}
