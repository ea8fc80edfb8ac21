use serde::{Deserialize, Serialize};

/// Represents a transaction submitted to the chain.
///
/// Empty strings and zero integers mean "not set" and are left out of the
/// encoded form.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Transaction {
    /// The account paying for and authorizing the transaction.
    pub source_address: String,
    /// The sequence number of the source account.
    pub nonce: u64,
    /// The maximum fee the source is willing to pay.
    pub fee_limit: i64,
    /// The price paid per unit of gas.
    pub gas_price: i64,
    /// Free-form caller data.
    pub metadata: String,
    /// The operations to apply, in order.
    pub operations: Vec<Operation>,
    /// Fields read from the wire that this schema does not know.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unknown_fields: Vec<UnknownField>,
}

impl Transaction {
    pub fn new(source_address: impl Into<String>, nonce: u64) -> Self {
        Self {
            source_address: source_address.into(),
            nonce,
            ..Self::default()
        }
    }

    pub fn with_fees(mut self, gas_price: i64, fee_limit: i64) -> Self {
        self.gas_price = gas_price;
        self.fee_limit = fee_limit;
        self
    }

    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = metadata.into();
        self
    }

    /// Appends a new operation of the given type and hands it back for
    /// in-place population.
    pub fn add_operation(&mut self, op_type: OperationType) -> &mut Operation {
        self.operations.push(Operation::new(op_type));
        let last = self.operations.len() - 1;
        &mut self.operations[last]
    }
}

/// The kind of an operation. Values this crate has no variant for are kept
/// as `Unrecognized` so they survive a decode/encode cycle.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    #[default]
    Unknown,
    CreateAccount,
    Unrecognized(i32),
}

impl OperationType {
    pub fn value(self) -> i32 {
        match self {
            OperationType::Unknown => 0,
            OperationType::CreateAccount => 1,
            OperationType::Unrecognized(v) => v,
        }
    }

    pub fn from_i32(v: i32) -> Self {
        match v {
            0 => OperationType::Unknown,
            1 => OperationType::CreateAccount,
            other => OperationType::Unrecognized(other),
        }
    }
}

/// Variant-specific body of an operation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    CreateAccount(CreateAccount),
}

impl Payload {
    /// The operation type this payload belongs to.
    pub fn operation_type(&self) -> OperationType {
        match self {
            Payload::CreateAccount(_) => OperationType::CreateAccount,
        }
    }
}

/// A single step of a transaction.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Operation {
    #[serde(rename = "type")]
    pub op_type: OperationType,
    /// Overrides the transaction source for this operation when set.
    pub source_address: String,
    pub metadata: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unknown_fields: Vec<UnknownField>,
}

impl Operation {
    pub fn new(op_type: OperationType) -> Self {
        Self {
            op_type,
            ..Self::default()
        }
    }

    /// Returns the create-account payload, attaching an empty one first if
    /// the operation has none.
    pub fn create_account_mut(&mut self) -> &mut CreateAccount {
        let payload = self
            .payload
            .get_or_insert_with(|| Payload::CreateAccount(CreateAccount::default()));
        match payload {
            Payload::CreateAccount(create_account) => create_account,
        }
    }

    pub fn create_account(&self) -> Option<&CreateAccount> {
        match &self.payload {
            Some(Payload::CreateAccount(create_account)) => Some(create_account),
            None => None,
        }
    }

    /// Checks that `op_type` and the attached payload agree.
    ///
    /// A payload must match the type exactly, and a type that has a payload
    /// variant must carry one. Unrecognized types travel without a payload,
    /// and may not reuse a value that has a named variant.
    pub fn payload_mismatch(&self) -> Option<String> {
        if let OperationType::Unrecognized(v) = self.op_type {
            let named = OperationType::from_i32(v);
            if named != self.op_type {
                return Some(format!("UNRECOGNIZED({}) aliases {:?}", v, named));
            }
        }
        match (&self.payload, self.op_type) {
            (Some(payload), op_type) if payload.operation_type().value() != op_type.value() => {
                Some(format!(
                    "operation type {:?} carries a {:?} payload",
                    op_type,
                    payload.operation_type()
                ))
            }
            (None, op_type) if op_type.value() == OperationType::CreateAccount.value() => {
                Some("CREATE_ACCOUNT operation without a create_account payload".to_string())
            }
            _ => None,
        }
    }
}

/// Payload of a CREATE_ACCOUNT operation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct CreateAccount {
    /// The address of the account to create.
    pub dest_address: String,
    /// The balance credited to the new account.
    pub init_balance: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unknown_fields: Vec<UnknownField>,
}

impl CreateAccount {
    pub fn new(dest_address: impl Into<String>, init_balance: i64) -> Self {
        Self {
            dest_address: dest_address.into(),
            init_balance,
            unknown_fields: Vec::new(),
        }
    }
}

/// A field carried on the wire under a tag the schema does not define.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UnknownField {
    pub tag: u32,
    pub value: UnknownValue,
}

/// Raw value of an unknown field, kept in its wire representation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnknownValue {
    Varint(u64),
    Fixed64(u64),
    LengthDelimited(#[serde(with = "hex::serde")] Vec<u8>),
    Fixed32(u32),
}
