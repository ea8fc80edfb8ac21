use tracing::trace;

use super::layout::{CreateAccountField, OpField, TxField};
use super::wire::Reader;
use super::Codec;
use crate::error::{CodecError, Result};
use crate::schema::WireType;
use crate::tx::{CreateAccount, Operation, OperationType, Transaction, UnknownField};

fn check_wire_type(name: &str, got: WireType, expected: WireType, offset: usize) -> Result<()> {
    if got != expected {
        return Err(CodecError::malformed(
            offset,
            format!("{} expects wire type {:?}, found {:?}", name, expected, got),
        ));
    }
    Ok(())
}

impl Codec {
    /// Decodes fields from `reader` into `tx`. Scalars overwrite, operations
    /// append.
    pub(super) fn merge_transaction(
        &self,
        tx: &mut Transaction,
        mut reader: Reader<'_>,
    ) -> Result<()> {
        while !reader.is_empty() {
            let (tag, wire_type, at) = reader.key()?;
            let (field, expected) = match self.layout.transaction.lookup(tag) {
                Some(known) => known,
                None => {
                    self.skip_unknown(&mut tx.unknown_fields, &mut reader, tag, wire_type, at)?;
                    continue;
                }
            };
            check_wire_type("Transaction field", wire_type, expected, at)?;

            match field {
                TxField::SourceAddress => tx.source_address = reader.string()?,
                TxField::Nonce => tx.nonce = reader.varint()?,
                TxField::FeeLimit => tx.fee_limit = reader.varint()? as i64,
                TxField::GasPrice => tx.gas_price = reader.varint()? as i64,
                TxField::Metadata => tx.metadata = reader.string()?,
                TxField::Operations => {
                    let (bytes, offset) = reader.bytes()?;
                    let mut op = Operation::default();
                    self.merge_operation(&mut op, Reader::nested(bytes, offset))?;
                    if let Some(reason) = op.payload_mismatch() {
                        return Err(CodecError::schema(format!(
                            "operations[{}]: {}",
                            tx.operations.len(),
                            reason
                        )));
                    }
                    tx.operations.push(op);
                }
            }
        }
        Ok(())
    }

    fn merge_operation(&self, op: &mut Operation, mut reader: Reader<'_>) -> Result<()> {
        while !reader.is_empty() {
            let (tag, wire_type, at) = reader.key()?;
            let (field, expected) = match self.layout.operation.lookup(tag) {
                Some(known) => known,
                None => {
                    self.skip_unknown(&mut op.unknown_fields, &mut reader, tag, wire_type, at)?;
                    continue;
                }
            };
            check_wire_type("Operation field", wire_type, expected, at)?;

            match field {
                OpField::Type => op.op_type = OperationType::from_i32(reader.varint()? as i32),
                OpField::SourceAddress => op.source_address = reader.string()?,
                OpField::Metadata => op.metadata = reader.string()?,
                OpField::CreateAccount => {
                    let (bytes, offset) = reader.bytes()?;
                    let create_account = op.create_account_mut();
                    self.merge_create_account(create_account, Reader::nested(bytes, offset))?;
                }
            }
        }
        Ok(())
    }

    fn merge_create_account(
        &self,
        create_account: &mut CreateAccount,
        mut reader: Reader<'_>,
    ) -> Result<()> {
        while !reader.is_empty() {
            let (tag, wire_type, at) = reader.key()?;
            let (field, expected) = match self.layout.create_account.lookup(tag) {
                Some(known) => known,
                None => {
                    self.skip_unknown(
                        &mut create_account.unknown_fields,
                        &mut reader,
                        tag,
                        wire_type,
                        at,
                    )?;
                    continue;
                }
            };
            check_wire_type("OperationCreateAccount field", wire_type, expected, at)?;

            match field {
                CreateAccountField::DestAddress => {
                    create_account.dest_address = reader.string()?
                }
                CreateAccountField::InitBalance => {
                    create_account.init_balance = reader.varint()? as i64
                }
            }
        }
        Ok(())
    }

    fn skip_unknown(
        &self,
        unknown: &mut Vec<UnknownField>,
        reader: &mut Reader<'_>,
        tag: u32,
        wire_type: WireType,
        at: usize,
    ) -> Result<()> {
        let value = reader.unknown(wire_type, at)?;
        if self.config.preserve_unknown_fields {
            trace!(tag, offset = at, ?wire_type, "preserving unknown field");
            unknown.push(UnknownField { tag, value });
        } else {
            trace!(tag, offset = at, ?wire_type, "skipping unknown field");
        }
        Ok(())
    }
}

