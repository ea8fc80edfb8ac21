//! Binary encoding of chain transactions.
//!
//! A [`Transaction`] carries an ordered list of typed [`Operation`]s; the
//! [`Codec`] turns it into the chain's tag-length-value wire format and back,
//! driven by an explicit [`Schema`] tag table.
//!
//! ```
//! use chain_proto::{Codec, OperationType, Schema, Transaction};
//!
//! let codec = Codec::new(Schema::chain()).unwrap();
//! let mut tx = Transaction::new("buQiu6i3aVP4SXBNmPsvJZxwYEcEBHUZd4Wj", 1)
//!     .with_fees(1000, 1_000_000);
//! tx.add_operation(OperationType::CreateAccount)
//!     .create_account_mut()
//!     .init_balance = 1_000_000_000;
//!
//! let bytes = codec.encode(&tx).unwrap();
//! assert_eq!(codec.decode(&bytes).unwrap(), tx);
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod schema;
pub mod tx;

pub use crate::codec::Codec;
pub use crate::config::{CodecConfig, Settings};
pub use crate::error::CodecError;
pub use crate::schema::{FieldSpec, MessageSchema, Schema, WireType};
pub use crate::tx::{
    CreateAccount, Operation, OperationType, Payload, Transaction, UnknownField, UnknownValue,
};
