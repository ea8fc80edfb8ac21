use super::layout::{CreateAccountField, OpField, TxField};
use super::wire::{put_bytes, put_key, put_unknown, put_varint};
use super::Codec;
use crate::error::{CodecError, Result};
use crate::schema::WireType;
use crate::tx::{CreateAccount, Operation, Payload, Transaction, UnknownField};

enum Value<'a> {
    Varint(u64),
    Bytes(&'a [u8]),
    Message(Vec<u8>),
}

/// Fields of one message collected before they are written in tag order.
struct Fields<'a> {
    entries: Vec<(u32, Value<'a>)>,
}

impl<'a> Fields<'a> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn varint(&mut self, tag: u32, value: u64) {
        if value != 0 {
            self.entries.push((tag, Value::Varint(value)));
        }
    }

    fn string(&mut self, tag: u32, value: &'a str) {
        if !value.is_empty() {
            self.entries.push((tag, Value::Bytes(value.as_bytes())));
        }
    }

    /// Nested messages are written even when empty so their presence is kept.
    fn message(&mut self, tag: u32, encoded: Vec<u8>) {
        self.entries.push((tag, Value::Message(encoded)));
    }

    fn write(mut self, out: &mut Vec<u8>, unknown: &[UnknownField]) {
        // Stable, so repeated entries keep their order.
        self.entries.sort_by_key(|(tag, _)| *tag);
        for (tag, value) in self.entries {
            match value {
                Value::Varint(v) => {
                    put_key(out, tag, WireType::Varint);
                    put_varint(out, v);
                }
                Value::Bytes(bytes) => {
                    put_key(out, tag, WireType::LengthDelimited);
                    put_bytes(out, bytes);
                }
                Value::Message(encoded) => {
                    put_key(out, tag, WireType::LengthDelimited);
                    put_bytes(out, &encoded);
                }
            }
        }
        for field in unknown {
            put_unknown(out, field);
        }
    }
}

impl Codec {
    pub(super) fn encode_transaction(&self, tx: &Transaction, out: &mut Vec<u8>) -> Result<()> {
        let table = &self.layout.transaction;
        let mut fields = Fields::new();

        fields.string(table.tag(TxField::SourceAddress), &tx.source_address);
        fields.varint(table.tag(TxField::Nonce), tx.nonce);
        fields.varint(table.tag(TxField::FeeLimit), tx.fee_limit as u64);
        fields.varint(table.tag(TxField::GasPrice), tx.gas_price as u64);
        fields.string(table.tag(TxField::Metadata), &tx.metadata);
        for (index, op) in tx.operations.iter().enumerate() {
            let mut encoded = Vec::new();
            self.encode_operation(op, &mut encoded).map_err(|e| match e {
                CodecError::SchemaViolation(reason) => {
                    CodecError::SchemaViolation(format!("operations[{}]: {}", index, reason))
                }
                other => other,
            })?;
            fields.message(table.tag(TxField::Operations), encoded);
        }

        let unknown = self.unknown_to_write(&tx.unknown_fields);
        table.check_unknown(unknown)?;
        fields.write(out, unknown);
        Ok(())
    }

    fn encode_operation(&self, op: &Operation, out: &mut Vec<u8>) -> Result<()> {
        if let Some(reason) = op.payload_mismatch() {
            return Err(CodecError::schema(reason));
        }

        let table = &self.layout.operation;
        let mut fields = Fields::new();

        // Enums are int32 on the wire, sign-extended to 64 bits.
        fields.varint(table.tag(OpField::Type), i64::from(op.op_type.value()) as u64);
        fields.string(table.tag(OpField::SourceAddress), &op.source_address);
        fields.string(table.tag(OpField::Metadata), &op.metadata);
        match &op.payload {
            Some(Payload::CreateAccount(create_account)) => {
                let mut encoded = Vec::new();
                self.encode_create_account(create_account, &mut encoded)?;
                fields.message(table.tag(OpField::CreateAccount), encoded);
            }
            None => {}
        }

        let unknown = self.unknown_to_write(&op.unknown_fields);
        table.check_unknown(unknown)?;
        fields.write(out, unknown);
        Ok(())
    }

    fn encode_create_account(
        &self,
        create_account: &CreateAccount,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        let table = &self.layout.create_account;
        let mut fields = Fields::new();

        fields.string(
            table.tag(CreateAccountField::DestAddress),
            &create_account.dest_address,
        );
        fields.varint(
            table.tag(CreateAccountField::InitBalance),
            create_account.init_balance as u64,
        );

        let unknown = self.unknown_to_write(&create_account.unknown_fields);
        table.check_unknown(unknown)?;
        fields.write(out, unknown);
        Ok(())
    }

    fn unknown_to_write<'u>(&self, unknown: &'u [UnknownField]) -> &'u [UnknownField] {
        if self.config.preserve_unknown_fields {
            unknown
        } else {
            &[]
        }
    }
}
