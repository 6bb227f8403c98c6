use crate::chain::TxKind;
use fuels::types::Address;
use thiserror::Error;

/// Every way a session operation can fail.
///
/// Chain adapters report plain `eyre` errors; the session decides which of
/// these variants a failure belongs to based on where in the call sequence
/// it happened.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("wallet unavailable: {0}")]
    WalletUnavailable(String),
    #[error("connected to network {actual}, expected network {expected}")]
    WrongNetwork { expected: u64, actual: u64 },
    #[error("read `{call}` failed: {reason}")]
    ReadFailure { call: &'static str, reason: String },
    #[error("{kind} transaction was not submitted: {reason}")]
    WriteRejected { kind: TxKind, reason: String },
    #[error("{kind} transaction failed on chain: {reason}")]
    WriteReverted { kind: TxKind, reason: String },
    #[error("account {caller} is not the contract owner {owner}")]
    Unauthorized { caller: Address, owner: Address },
    #[error("invalid mint amount {0}")]
    InvalidAmount(u64),
}

impl SessionError {
    pub(crate) fn read(call: &'static str, err: impl std::fmt::Display) -> Self {
        SessionError::ReadFailure {
            call,
            reason: err.to_string(),
        }
    }

    pub(crate) fn rejected(kind: TxKind, err: impl std::fmt::Display) -> Self {
        SessionError::WriteRejected {
            kind,
            reason: err.to_string(),
        }
    }

    pub(crate) fn reverted(kind: TxKind, err: impl std::fmt::Display) -> Self {
        SessionError::WriteReverted {
            kind,
            reason: err.to_string(),
        }
    }

    /// Failures raised by the connection or network guard rather than by a
    /// contract call. These never touch the snapshot.
    pub fn is_guard_failure(&self) -> bool {
        matches!(
            self,
            SessionError::WalletUnavailable(_) | SessionError::WrongNetwork { .. }
        )
    }
}
