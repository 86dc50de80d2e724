use thiserror::Error;

/// Closed classification of failures, for callers that branch on policy
/// rather than on individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed request data or a schema violation on an inbound PSBT.
    InvalidArgument,
    /// Selection could not cover the required amount plus fees.
    InsufficientFunds,
    /// Transient failure of an external provider (node RPC, indexer, fee oracle).
    Provider,
    /// Node-side finalization failure or mempool rejection.
    Protocol,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid {what} address `{address}` for chain {chain}")]
    InvalidAddress {
        what: &'static str,
        address: String,
        chain: String,
    },

    #[error("unknown chain: {0}")]
    UnknownChain(String),

    #[error("buyer public key is required for a P2SH payment address")]
    MissingPaymentPubkey,

    #[error("payment public key does not hash to the P2SH payment address")]
    PaymentPubkeyMismatch,

    #[error("taproot listings require the seller's internal key")]
    MissingTapInternalKey,

    #[error("fee of {0} basis points exceeds 100%")]
    FeeOutOfRange(u16),

    #[error("inscription record is inconsistent: {0}")]
    BadItem(String),

    #[error("vout {vout} not found in transaction {txid}")]
    MissingVout { txid: bitcoin::Txid, vout: u32 },

    #[error("listing must spend exactly one input (found {0})")]
    ListingInputCount(usize),

    #[error("listing input carries no usable signature")]
    ListingUnsigned,

    #[error("listing spends `{found}`, expected inscription `{expected}`")]
    ListingTokenMismatch { expected: String, found: String },

    #[error("listing pays {found} sats, expected {expected}")]
    ListingPriceMismatch { expected: u64, found: u64 },

    #[error("listing pays to `{found}`, expected `{expected}`")]
    ListingReceiverMismatch { expected: String, found: String },

    #[error("listing input is not owned by `{owner}`")]
    ListingOwnerMismatch { owner: String },

    #[error("listing is priced at the delist sentinel; treat as withdrawn")]
    ListingWithdrawn,

    #[error("purchase needs two spendable dummy outputs of {min}..={max} sats")]
    MissingDummyUtxos { min: u64, max: u64 },

    #[error("insufficient funds: need {needed} sats, only {available} spendable")]
    InsufficientFunds { needed: u64, available: u64 },

    #[error("listing state is missing {0}")]
    MissingState(&'static str),

    #[error("transaction layout violation: {0}")]
    Layout(String),

    #[error("psbt error: {0}")]
    Psbt(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("node rejected transaction: {0}")]
    Rejected(String),

    #[error("task error: {0}")]
    Task(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidAddress { .. }
            | Error::UnknownChain(_)
            | Error::MissingPaymentPubkey
            | Error::PaymentPubkeyMismatch
            | Error::MissingTapInternalKey
            | Error::FeeOutOfRange(_)
            | Error::BadItem(_)
            | Error::MissingVout { .. }
            | Error::ListingInputCount(_)
            | Error::ListingUnsigned
            | Error::ListingTokenMismatch { .. }
            | Error::ListingPriceMismatch { .. }
            | Error::ListingReceiverMismatch { .. }
            | Error::ListingOwnerMismatch { .. }
            | Error::ListingWithdrawn
            | Error::MissingState(_)
            | Error::Layout(_)
            | Error::Psbt(_) => ErrorKind::InvalidArgument,

            Error::MissingDummyUtxos { .. } | Error::InsufficientFunds { .. } => {
                ErrorKind::InsufficientFunds
            }

            Error::Provider(_) | Error::Task(_) => ErrorKind::Provider,

            Error::Rejected(_) => ErrorKind::Protocol,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
