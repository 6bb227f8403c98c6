use crate::{
    chain::{
        Chain,
        TxKind,
        TxReceipt,
        WalletConnector,
        WriteCall,
    },
    error::SessionError,
    pricing::Pricing,
};
use fuels::types::Address;
use tokio::sync::watch;
use tracing::{
    error,
    info,
    warn,
};

#[cfg(test)]
mod tests;

const MAX_ERRORS: usize = 50;

/// Where the single in-flight write currently is. Anything but `Idle` means
/// the session is busy.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum TxPhase {
    #[default]
    Idle,
    Submitting,
    AwaitingConfirmation,
    RefreshingReads,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ChainSnapshot {
    /// Token base units minted so far.
    pub total_minted: u64,
    /// Token base units held by the connected account.
    pub caller_balance: u64,
    /// Collectibles owned by the connected account that were not claimed yet.
    pub claimable_count: u64,
    pub is_owner: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PendingTransaction {
    pub kind: TxKind,
    pub amount: Option<u64>,
    pub payment: u64,
}

impl PendingTransaction {
    fn for_call(call: WriteCall) -> Self {
        match call {
            WriteCall::Mint { amount, payment } => PendingTransaction {
                kind: TxKind::Mint,
                amount: Some(amount),
                payment,
            },
            other => PendingTransaction {
                kind: other.kind(),
                amount: None,
                payment: 0,
            },
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct WalletSession {
    pub connected: bool,
    pub network_id: Option<u64>,
    pub account: Option<Address>,
}

#[derive(Clone, Debug)]
pub struct SessionSettings {
    pub expected_network: u64,
    pub pricing: Pricing,
    /// Run the owner withdraw path as part of the initial load.
    pub withdraw_on_connect: bool,
}

impl SessionSettings {
    pub fn new(expected_network: u64) -> Self {
        SessionSettings {
            expected_network,
            pricing: Pricing::default(),
            withdraw_on_connect: true,
        }
    }
}

/// Read-only chain handle. Only obtainable through [`Session::reader`], so
/// holding one means the network check passed.
pub struct Reader<'a, C> {
    chain: &'a C,
}

impl<C: Chain> Reader<'_, C> {
    pub async fn total_minted(&self) -> Result<u64, SessionError> {
        self.chain
            .total_supply()
            .await
            .map_err(|e| SessionError::read("total_supply", e))
    }

    pub async fn token_balance(&self, owner: Address) -> Result<u64, SessionError> {
        self.chain
            .token_balance_of(owner)
            .await
            .map_err(|e| SessionError::read("balance_of", e))
    }

    /// Collectibles held by `owner` whose token id has not been used for a
    /// claim yet.
    pub async fn claimable(&self, owner: Address) -> Result<u64, SessionError> {
        let owned = self
            .chain
            .collectible_balance_of(owner)
            .await
            .map_err(|e| SessionError::read("collectible_balance_of", e))?;
        let mut unclaimed = 0;
        for index in 0..owned {
            let token_id = self
                .chain
                .collectible_of_owner_by_index(owner, index)
                .await
                .map_err(|e| SessionError::read("token_of_owner_by_index", e))?;
            let claimed = self
                .chain
                .token_id_claimed(token_id)
                .await
                .map_err(|e| SessionError::read("token_ids_claimed", e))?;
            if !claimed {
                unclaimed += 1;
            }
        }
        Ok(unclaimed)
    }

    pub async fn owner(&self) -> Result<Address, SessionError> {
        self.chain
            .collectible_owner()
            .await
            .map_err(|e| SessionError::read("owner", e))
    }
}

/// Write-capable chain handle bound to the connected account.
pub struct Writer<'a, C> {
    chain: &'a C,
    address: Address,
}

impl<'a, C: Chain> Writer<'a, C> {
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn reader(&self) -> Reader<'a, C> {
        Reader { chain: self.chain }
    }

    async fn submit(&self, call: WriteCall) -> Result<C::Pending, SessionError> {
        self.chain
            .submit(call)
            .await
            .map_err(|e| SessionError::rejected(call.kind(), e))
    }

    async fn confirm(
        &self,
        kind: TxKind,
        pending: C::Pending,
    ) -> Result<TxReceipt, SessionError> {
        self.chain
            .confirm(pending)
            .await
            .map_err(|e| SessionError::reverted(kind, e))
    }
}

pub struct Session<W: WalletConnector> {
    connector: W,
    chain: Option<W::Chain>,
    settings: SessionSettings,
    wallet: WalletSession,
    snapshot: ChainSnapshot,
    pending: Option<PendingTransaction>,
    phase: watch::Sender<TxPhase>,
    status: String,
    alert: Option<String>,
    errors: Vec<String>,
}

impl<W: WalletConnector> Session<W> {
    pub fn new(connector: W, settings: SessionSettings) -> Self {
        let (phase, _) = watch::channel(TxPhase::Idle);
        Session {
            connector,
            chain: None,
            settings,
            wallet: WalletSession::default(),
            snapshot: ChainSnapshot::default(),
            pending: None,
            phase,
            status: String::from("Ready"),
            alert: None,
            errors: Vec::new(),
        }
    }

    pub fn connector(&self) -> &W {
        &self.connector
    }

    pub fn connector_mut(&mut self) -> &mut W {
        &mut self.connector
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn wallet(&self) -> &WalletSession {
        &self.wallet
    }

    pub fn is_connected(&self) -> bool {
        self.wallet.connected
    }

    pub fn snapshot(&self) -> &ChainSnapshot {
        &self.snapshot
    }

    pub fn pending(&self) -> Option<&PendingTransaction> {
        self.pending.as_ref()
    }

    pub fn phase(&self) -> TxPhase {
        *self.phase.borrow()
    }

    pub fn is_busy(&self) -> bool {
        self.phase() != TxPhase::Idle
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<TxPhase> {
        self.phase.subscribe()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
    }

    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    pub fn take_alert(&mut self) -> Option<String> {
        self.alert.take()
    }

    pub fn recent_errors(&self, count: usize) -> Vec<String> {
        self.errors.iter().rev().take(count).cloned().collect()
    }

    pub async fn connect(&mut self) -> Result<(), SessionError> {
        let chain = match self.connector.connect().await {
            Ok(chain) => chain,
            Err(e) => {
                let err = SessionError::WalletUnavailable(e.to_string());
                self.record_failure(&err);
                return Err(err);
            }
        };
        let network = chain.network_id().await;
        let account = chain.account_address().await.ok();
        if self.wallet.account != account {
            self.snapshot = ChainSnapshot::default();
        }
        self.chain = Some(chain);
        self.wallet.connected = true;
        self.wallet.account = account;
        info!(account = ?account, "wallet connected");
        self.set_status("Wallet connected");

        match network {
            Ok(actual) => {
                self.wallet.network_id = Some(actual);
                let expected = self.settings.expected_network;
                if actual != expected {
                    warn!(expected, actual, "wallet connected to the wrong network");
                    self.record_failure(&SessionError::WrongNetwork { expected, actual });
                }
            }
            Err(e) => {
                self.wallet.network_id = None;
                self.record_failure(&SessionError::read("network_id", e));
            }
        }
        Ok(())
    }

    /// The page-load sequence: connect, then populate the snapshot.
    pub async fn initial_load(&mut self) {
        if self.connect().await.is_err() {
            return;
        }
        let _ = self.refresh_total_minted().await;
        let _ = self.refresh_caller_balance().await;
        let _ = self.refresh_claimable().await;
        if self.settings.withdraw_on_connect {
            warn!("running the owner withdraw path as part of the initial load");
            let _ = self.withdraw().await;
        } else {
            let _ = self.refresh_owner().await;
        }
    }

    fn connected_chain(&self) -> Result<&W::Chain, SessionError> {
        self.chain.as_ref().ok_or_else(|| {
            SessionError::WalletUnavailable(String::from("wallet is not connected"))
        })
    }

    async fn require_network(&self, chain: &W::Chain) -> Result<u64, SessionError> {
        let actual = chain
            .network_id()
            .await
            .map_err(|e| SessionError::read("network_id", e))?;
        let expected = self.settings.expected_network;
        if actual != expected {
            warn!(expected, actual, "refusing chain access on the wrong network");
            return Err(SessionError::WrongNetwork { expected, actual });
        }
        Ok(actual)
    }

    pub async fn reader(&self) -> Result<Reader<'_, W::Chain>, SessionError> {
        let chain = self.connected_chain()?;
        self.require_network(chain).await?;
        Ok(Reader { chain })
    }

    pub async fn writer(&self) -> Result<Writer<'_, W::Chain>, SessionError> {
        let chain = self.connected_chain()?;
        self.require_network(chain).await?;
        let address = chain
            .account_address()
            .await
            .map_err(|e| SessionError::read("account_address", e))?;
        Ok(Writer { chain, address })
    }

    pub async fn read_total_minted(&self) -> Result<u64, SessionError> {
        self.reader().await?.total_minted().await
    }

    pub async fn read_caller_balance(&self) -> Result<u64, SessionError> {
        let writer = self.writer().await?;
        writer.reader().token_balance(writer.address()).await
    }

    pub async fn read_claimable(&self) -> Result<u64, SessionError> {
        let writer = self.writer().await?;
        writer.reader().claimable(writer.address()).await
    }

    pub async fn read_owner(&self) -> Result<Address, SessionError> {
        self.reader().await?.owner().await
    }

    async fn read_ownership(&self) -> Result<(Address, Address), SessionError> {
        let writer = self.writer().await?;
        let owner = writer.reader().owner().await?;
        Ok((writer.address(), owner))
    }

    pub async fn refresh_total_minted(&mut self) -> Result<u64, SessionError> {
        match self.read_total_minted().await {
            Ok(total) => {
                self.snapshot.total_minted = total;
                Ok(total)
            }
            Err(err) => {
                self.record_failure(&err);
                Err(err)
            }
        }
    }

    pub async fn refresh_caller_balance(&mut self) -> Result<u64, SessionError> {
        match self.read_caller_balance().await {
            Ok(balance) => {
                self.snapshot.caller_balance = balance;
                Ok(balance)
            }
            Err(err) => {
                if !err.is_guard_failure() {
                    self.snapshot.caller_balance = 0;
                }
                self.record_failure(&err);
                Err(err)
            }
        }
    }

    pub async fn refresh_claimable(&mut self) -> Result<u64, SessionError> {
        match self.read_claimable().await {
            Ok(count) => {
                self.snapshot.claimable_count = count;
                Ok(count)
            }
            Err(err) => {
                if !err.is_guard_failure() {
                    self.snapshot.claimable_count = 0;
                }
                self.record_failure(&err);
                Err(err)
            }
        }
    }

    pub async fn refresh_owner(&mut self) -> Result<bool, SessionError> {
        match self.read_ownership().await {
            Ok((caller, owner)) => {
                let is_owner = caller == owner;
                self.snapshot.is_owner = is_owner;
                Ok(is_owner)
            }
            Err(err) => {
                self.record_failure(&err);
                Err(err)
            }
        }
    }

    pub async fn refresh_reads(&mut self) {
        let _ = self.refresh_total_minted().await;
        let _ = self.refresh_caller_balance().await;
        let _ = self.refresh_claimable().await;
        let _ = self.refresh_owner().await;
    }

    pub async fn mint(&mut self, amount: u64) -> Result<TxReceipt, SessionError> {
        let payment = match self.settings.pricing.payment_for(amount) {
            Some(payment) if amount > 0 => payment,
            _ => {
                let err = SessionError::InvalidAmount(amount);
                self.record_failure(&err);
                return Err(err);
            }
        };
        self.execute_write(WriteCall::Mint { amount, payment }).await
    }

    pub async fn claim(&mut self) -> Result<TxReceipt, SessionError> {
        self.execute_write(WriteCall::Claim).await
    }

    pub async fn withdraw(&mut self) -> Result<TxReceipt, SessionError> {
        let (caller, owner) = match self.read_ownership().await {
            Ok(pair) => pair,
            Err(err) => {
                self.record_failure(&err);
                return Err(err);
            }
        };
        self.snapshot.is_owner = caller == owner;
        if caller != owner {
            let err = SessionError::Unauthorized { caller, owner };
            self.record_failure(&err);
            return Err(err);
        }
        self.execute_write(WriteCall::Withdraw).await
    }

    async fn execute_write(&mut self, call: WriteCall) -> Result<TxReceipt, SessionError> {
        let kind = call.kind();
        self.pending = Some(PendingTransaction::for_call(call));
        match self.submit_and_confirm(call).await {
            Ok(receipt) => {
                info!(%kind, tx_id = %receipt.tx_id, "transaction confirmed");
                self.set_phase(TxPhase::RefreshingReads);
                let prior_alert = self.alert.clone();
                self.refresh_reads().await;
                self.pending = None;
                self.set_phase(TxPhase::Idle);
                let message = success_message(kind);
                self.set_status(message);
                // An alert raised by the refresh takes precedence.
                if self.alert == prior_alert {
                    self.alert = Some(String::from(message));
                }
                Ok(receipt)
            }
            Err(err) => {
                self.pending = None;
                self.set_phase(TxPhase::Idle);
                self.record_failure(&err);
                Err(err)
            }
        }
    }

    async fn submit_and_confirm(&self, call: WriteCall) -> Result<TxReceipt, SessionError> {
        let kind = call.kind();
        let writer = self.writer().await?;
        self.set_phase(TxPhase::Submitting);
        info!(%kind, account = %writer.address(), "submitting transaction");
        let pending = writer.submit(call).await?;
        self.set_phase(TxPhase::AwaitingConfirmation);
        writer.confirm(kind, pending).await
    }

    fn set_phase(&self, phase: TxPhase) {
        self.phase.send_replace(phase);
    }

    fn record_failure(&mut self, err: &SessionError) {
        error!(error = %err, "session operation failed");
        match err {
            SessionError::WrongNetwork { expected, .. } => {
                self.alert = Some(format!("Change the network to {expected}"));
            }
            SessionError::WriteRejected { kind, .. }
            | SessionError::WriteReverted { kind, .. } => {
                self.set_status(format!("The {kind} transaction failed"));
            }
            _ => {}
        }
        self.push_errors(vec![err.to_string()]);
    }

    fn push_errors(&mut self, mut items: Vec<String>) {
        if items.is_empty() {
            return;
        }
        self.errors.append(&mut items);
        if self.errors.len() > MAX_ERRORS {
            let drain = self.errors.len() - MAX_ERRORS;
            self.errors.drain(0..drain);
        }
    }
}

fn success_message(kind: TxKind) -> &'static str {
    match kind {
        TxKind::Mint => "Successfully minted Crypto Dev Tokens",
        TxKind::Claim => "Successfully claimed Crypto Dev Tokens",
        TxKind::Withdraw => "Withdrew the contract balance to the owner",
    }
}
