use color_eyre::eyre::Result;
use fuels::types::Address;
use std::fmt;

/// Obtains a chain handle from the user's wallet.
pub trait WalletConnector {
    type Chain: Chain;

    fn connect(&self) -> impl Future<Output = Result<Self::Chain>>;
}

/// Everything the session needs from the ledger: the wallet's view of the
/// network, the token and collectible contract reads, and the three writes.
pub trait Chain {
    /// A submitted transaction that has not been confirmed yet.
    type Pending;

    fn network_id(&self) -> impl Future<Output = Result<u64>>;

    fn account_address(&self) -> impl Future<Output = Result<Address>>;

    fn total_supply(&self) -> impl Future<Output = Result<u64>>;

    fn token_balance_of(&self, owner: Address) -> impl Future<Output = Result<u64>>;

    fn token_id_claimed(&self, token_id: u64) -> impl Future<Output = Result<bool>>;

    fn collectible_balance_of(&self, owner: Address)
    -> impl Future<Output = Result<u64>>;

    fn collectible_of_owner_by_index(
        &self,
        owner: Address,
        index: u64,
    ) -> impl Future<Output = Result<u64>>;

    fn collectible_owner(&self) -> impl Future<Output = Result<Address>>;

    fn submit(&self, call: WriteCall) -> impl Future<Output = Result<Self::Pending>>;

    fn confirm(&self, pending: Self::Pending) -> impl Future<Output = Result<TxReceipt>>;
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TxKind {
    Mint,
    Claim,
    Withdraw,
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TxKind::Mint => "mint",
            TxKind::Claim => "claim",
            TxKind::Withdraw => "withdraw",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WriteCall {
    /// `amount` whole tokens, paying `payment` base units of the base asset.
    Mint { amount: u64, payment: u64 },
    Claim,
    Withdraw,
}

impl WriteCall {
    pub fn kind(&self) -> TxKind {
        match self {
            WriteCall::Mint { .. } => TxKind::Mint,
            WriteCall::Claim => TxKind::Claim,
            WriteCall::Withdraw => TxKind::Withdraw,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TxReceipt {
    pub kind: TxKind,
    pub tx_id: String,
}
