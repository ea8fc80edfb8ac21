//! Tag-length-value codec for transactions.
//!
//! Every field is written as a varint key `(tag << 3) | wire_type` followed
//! by its value: a varint for integers and enums, a length-prefixed byte run
//! for text and nested messages. Zero and empty scalars are omitted, known
//! fields come out in ascending tag order, and preserved unknown fields
//! follow in the order they were read.

mod decode;
mod encode;
mod layout;
mod wire;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::CodecConfig;
use crate::error::Result;
use crate::schema::Schema;
use crate::tx::Transaction;

use layout::Layout;
use wire::{put_varint, Reader};

/// Encoder/decoder bound to one schema table.
///
/// Immutable after construction; share it freely across threads.
pub struct Codec {
    schema: Schema,
    layout: Layout,
    config: CodecConfig,
}

impl Codec {
    /// Builds a codec over `schema`, failing with `SchemaViolation` if the
    /// table does not describe every field the codec needs.
    pub fn new(schema: Schema) -> Result<Self> {
        Self::with_config(schema, CodecConfig::default())
    }

    pub fn with_config(schema: Schema, config: CodecConfig) -> Result<Self> {
        let layout = Layout::resolve(&schema)?;
        debug!(
            preserve_unknown_fields = config.preserve_unknown_fields,
            "codec ready"
        );
        Ok(Self {
            schema,
            layout,
            config,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn encode(&self, tx: &Transaction) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.encode_transaction(tx, &mut out)?;
        Ok(out)
    }

    /// Decodes a whole buffer. Either every byte is accounted for or an
    /// error is returned; no partially filled transaction escapes.
    pub fn decode(&self, buffer: &[u8]) -> Result<Transaction> {
        let mut tx = Transaction::default();
        self.merge_transaction(&mut tx, Reader::new(buffer))?;
        Ok(tx)
    }

    /// Encodes `tx` prefixed with its varint byte length.
    pub fn encode_length_delimited(&self, tx: &Transaction) -> Result<Vec<u8>> {
        let body = self.encode(tx)?;
        let mut out = Vec::with_capacity(body.len() + 5);
        put_varint(&mut out, body.len() as u64);
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Decodes one length-prefixed transaction from the front of `buffer`,
    /// returning it with the number of bytes consumed.
    pub fn decode_length_delimited(&self, buffer: &[u8]) -> Result<(Transaction, usize)> {
        let mut reader = Reader::new(buffer);
        let (body, offset) = reader.bytes()?;
        let mut tx = Transaction::default();
        self.merge_transaction(&mut tx, Reader::nested(body, offset))?;
        Ok((tx, reader.consumed()))
    }

    /// SHA-256 of the encoded transaction, hex encoded.
    pub fn hash(&self, tx: &Transaction) -> Result<String> {
        let encoded = self.encode(tx)?;
        Ok(hex::encode(Sha256::digest(&encoded)))
    }
}

impl std::fmt::Debug for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codec")
            .field("schema", &self.schema)
            .field("config", &self.config)
            .finish()
    }
}

/// Encodes with the built-in chain table.
pub fn encode(tx: &Transaction) -> Result<Vec<u8>> {
    Codec::new(Schema::chain())?.encode(tx)
}

/// Decodes with the built-in chain table.
pub fn decode(buffer: &[u8]) -> Result<Transaction> {
    Codec::new(Schema::chain())?.decode(buffer)
}
