//! In-memory stand-ins for the wallet and the two contracts.
//!
//! The fake ledger applies the same rules the deployed contracts enforce
//! (exact payment, supply cap, claim eligibility, owner-only withdraw) and
//! records every call it receives, together with the session phase at that
//! moment when a phase receiver is attached.

use crate::{
    chain::{
        Chain,
        TxKind,
        TxReceipt,
        WalletConnector,
        WriteCall,
    },
    pricing::Pricing,
    session::TxPhase,
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use fuels::types::Address;
use std::{
    collections::{
        HashMap,
        HashSet,
    },
    sync::{
        Arc,
        Mutex,
        MutexGuard,
    },
};
use tokio::sync::watch;

pub const TEST_NETWORK: u64 = 0;

pub fn address(byte: u8) -> Address {
    Address::from([byte; 32])
}

/// Calls that only talk to the wallet, not to a contract.
const WALLET_CALLS: [&str; 3] = ["connect", "network_id", "account_address"];

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RecordedCall {
    pub name: &'static str,
    pub phase: Option<TxPhase>,
}

impl RecordedCall {
    pub fn touches_contract(&self) -> bool {
        !WALLET_CALLS.contains(&self.name)
    }
}

#[derive(Debug)]
struct LedgerState {
    network_id: u64,
    owner: Address,
    pricing: Pricing,
    total_supply: u64,
    token_balances: HashMap<Address, u64>,
    collectibles: Vec<(u64, Address)>,
    claimed: HashSet<u64>,
    contract_funds: u64,
    withdrawn: u64,
    failing_reads: HashSet<&'static str>,
    reject_submissions: bool,
    revert_confirmations: bool,
    network_after_confirm: Option<u64>,
    calls: Vec<RecordedCall>,
    submitted: Vec<WriteCall>,
    next_tx: u64,
    phase_probe: Option<watch::Receiver<TxPhase>>,
}

impl LedgerState {
    fn record(&mut self, name: &'static str) {
        let phase = self.phase_probe.as_ref().map(|rx| *rx.borrow());
        self.calls.push(RecordedCall { name, phase });
    }

    fn read(&mut self, name: &'static str) -> Result<()> {
        self.record(name);
        if self.failing_reads.contains(name) {
            return Err(eyre!("rpc error while calling {name}"));
        }
        Ok(())
    }

    fn token_unit(&self) -> u64 {
        10u64.pow(self.pricing.token_decimals)
    }

    fn issue(&mut self, to: Address, whole_tokens: u64) -> Result<()> {
        let minted = whole_tokens
            .checked_mul(self.token_unit())
            .ok_or_else(|| eyre!("amount overflow"))?;
        let cap = self.pricing.max_supply.saturating_mul(self.token_unit());
        if self.total_supply.saturating_add(minted) > cap {
            return Err(eyre!("Exceeds the max total supply available."));
        }
        self.total_supply += minted;
        *self.token_balances.entry(to).or_default() += minted;
        Ok(())
    }

    fn execute(&mut self, caller: Address, call: WriteCall) -> Result<()> {
        match call {
            WriteCall::Mint { amount, payment } => {
                let required = amount
                    .checked_mul(self.pricing.unit_price)
                    .ok_or_else(|| eyre!("amount overflow"))?;
                if payment < required {
                    return Err(eyre!("Ether sent is incorrect"));
                }
                self.issue(caller, amount)?;
                self.contract_funds += payment;
                Ok(())
            }
            WriteCall::Claim => {
                let owned: Vec<u64> = self
                    .collectibles
                    .iter()
                    .filter(|(_, holder)| *holder == caller)
                    .map(|(id, _)| *id)
                    .collect();
                if owned.is_empty() {
                    return Err(eyre!("You dont own any Crypto Dev NFT's"));
                }
                let unclaimed: Vec<u64> = owned
                    .into_iter()
                    .filter(|id| !self.claimed.contains(id))
                    .collect();
                if unclaimed.is_empty() {
                    return Err(eyre!("You have already claimed all the tokens"));
                }
                let tokens = (unclaimed.len() as u64)
                    .saturating_mul(self.pricing.tokens_per_collectible);
                self.issue(caller, tokens)?;
                self.claimed.extend(unclaimed);
                Ok(())
            }
            WriteCall::Withdraw => {
                if caller != self.owner {
                    return Err(eyre!("Ownable: caller is not the owner"));
                }
                self.withdrawn += self.contract_funds;
                self.contract_funds = 0;
                Ok(())
            }
        }
    }
}

/// Shared handle to the in-memory ledger. Clones see the same state.
#[derive(Clone, Debug)]
pub struct FakeLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl FakeLedger {
    pub fn new(network_id: u64, owner: Address) -> Self {
        let state = LedgerState {
            network_id,
            owner,
            pricing: Pricing::default(),
            total_supply: 0,
            token_balances: HashMap::new(),
            collectibles: Vec::new(),
            claimed: HashSet::new(),
            contract_funds: 0,
            withdrawn: 0,
            failing_reads: HashSet::new(),
            reject_submissions: false,
            revert_confirmations: false,
            network_after_confirm: None,
            calls: Vec::new(),
            submitted: Vec::new(),
            next_tx: 0,
            phase_probe: None,
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap()
    }

    pub fn connector(&self, account: Address) -> FakeConnector {
        FakeConnector {
            ledger: self.clone(),
            account: Some(account),
        }
    }

    /// A connector for a machine with no wallet keystore.
    pub fn missing_wallet(&self) -> FakeConnector {
        FakeConnector {
            ledger: self.clone(),
            account: None,
        }
    }

    pub fn give_collectibles(&self, holder: Address, token_ids: &[u64]) {
        let mut state = self.lock();
        for id in token_ids {
            state.collectibles.push((*id, holder));
        }
    }

    pub fn mark_claimed(&self, token_id: u64) {
        self.lock().claimed.insert(token_id);
    }

    pub fn set_network(&self, network_id: u64) {
        self.lock().network_id = network_id;
    }

    pub fn set_total_supply(&self, total_supply: u64) {
        self.lock().total_supply = total_supply;
    }

    pub fn set_token_balance(&self, holder: Address, balance: u64) {
        self.lock().token_balances.insert(holder, balance);
    }

    pub fn set_contract_funds(&self, funds: u64) {
        self.lock().contract_funds = funds;
    }

    pub fn fail_read(&self, name: &'static str) {
        self.lock().failing_reads.insert(name);
    }

    pub fn heal_reads(&self) {
        self.lock().failing_reads.clear();
    }

    pub fn reject_submissions(&self) {
        self.lock().reject_submissions = true;
    }

    pub fn accept_submissions(&self) {
        self.lock().reject_submissions = false;
    }

    pub fn revert_confirmations(&self) {
        self.lock().revert_confirmations = true;
    }

    /// Moves the ledger to `network_id` once the next write has executed.
    pub fn switch_network_after_confirm(&self, network_id: u64) {
        self.lock().network_after_confirm = Some(network_id);
    }

    pub fn observe_phases(&self, phases: watch::Receiver<TxPhase>) {
        self.lock().phase_probe = Some(phases);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    pub fn call_names(&self) -> Vec<&'static str> {
        self.lock().calls.iter().map(|call| call.name).collect()
    }

    pub fn contract_calls(&self) -> Vec<RecordedCall> {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.touches_contract())
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn submitted(&self) -> Vec<WriteCall> {
        self.lock().submitted.clone()
    }

    pub fn total_supply(&self) -> u64 {
        self.lock().total_supply
    }

    pub fn token_balance(&self, holder: Address) -> u64 {
        self.lock()
            .token_balances
            .get(&holder)
            .copied()
            .unwrap_or_default()
    }

    pub fn contract_funds(&self) -> u64 {
        self.lock().contract_funds
    }

    pub fn withdrawn(&self) -> u64 {
        self.lock().withdrawn
    }

    pub fn is_claimed(&self, token_id: u64) -> bool {
        self.lock().claimed.contains(&token_id)
    }
}

#[derive(Clone, Debug)]
pub struct FakeConnector {
    ledger: FakeLedger,
    account: Option<Address>,
}

impl FakeConnector {
    pub fn switch_account(&mut self, account: Address) {
        self.account = Some(account);
    }
}

impl WalletConnector for FakeConnector {
    type Chain = FakeChain;

    async fn connect(&self) -> Result<FakeChain> {
        self.ledger.lock().record("connect");
        let account = self
            .account
            .ok_or_else(|| eyre!("no wallet keystore found"))?;
        Ok(FakeChain {
            ledger: self.ledger.clone(),
            account,
        })
    }
}

#[derive(Debug)]
pub struct FakePending {
    call: WriteCall,
    tx_id: u64,
}

#[derive(Clone, Debug)]
pub struct FakeChain {
    ledger: FakeLedger,
    account: Address,
}

impl Chain for FakeChain {
    type Pending = FakePending;

    async fn network_id(&self) -> Result<u64> {
        let mut state = self.ledger.lock();
        state.read("network_id")?;
        Ok(state.network_id)
    }

    async fn account_address(&self) -> Result<Address> {
        self.ledger.lock().read("account_address")?;
        Ok(self.account)
    }

    async fn total_supply(&self) -> Result<u64> {
        let mut state = self.ledger.lock();
        state.read("total_supply")?;
        Ok(state.total_supply)
    }

    async fn token_balance_of(&self, owner: Address) -> Result<u64> {
        let mut state = self.ledger.lock();
        state.read("balance_of")?;
        Ok(state.token_balances.get(&owner).copied().unwrap_or_default())
    }

    async fn token_id_claimed(&self, token_id: u64) -> Result<bool> {
        let mut state = self.ledger.lock();
        state.read("token_ids_claimed")?;
        Ok(state.claimed.contains(&token_id))
    }

    async fn collectible_balance_of(&self, owner: Address) -> Result<u64> {
        let mut state = self.ledger.lock();
        state.read("collectible_balance_of")?;
        let count = state
            .collectibles
            .iter()
            .filter(|(_, holder)| *holder == owner)
            .count();
        Ok(count as u64)
    }

    async fn collectible_of_owner_by_index(&self, owner: Address, index: u64) -> Result<u64> {
        let mut state = self.ledger.lock();
        state.read("token_of_owner_by_index")?;
        state
            .collectibles
            .iter()
            .filter(|(_, holder)| *holder == owner)
            .nth(index as usize)
            .map(|(id, _)| *id)
            .ok_or_else(|| eyre!("owner index out of bounds"))
    }

    async fn collectible_owner(&self) -> Result<Address> {
        let mut state = self.ledger.lock();
        state.read("owner")?;
        Ok(state.owner)
    }

    async fn submit(&self, call: WriteCall) -> Result<FakePending> {
        let mut state = self.ledger.lock();
        state.record("submit");
        if state.reject_submissions {
            return Err(eyre!("user rejected the signature request"));
        }
        state.submitted.push(call);
        state.next_tx += 1;
        Ok(FakePending {
            call,
            tx_id: state.next_tx,
        })
    }

    async fn confirm(&self, pending: FakePending) -> Result<TxReceipt> {
        let mut state = self.ledger.lock();
        state.record("confirm");
        if state.revert_confirmations {
            return Err(eyre!("transaction reverted"));
        }
        state.execute(self.account, pending.call)?;
        if let Some(network_id) = state.network_after_confirm.take() {
            state.network_id = network_id;
        }
        Ok(TxReceipt {
            kind: pending.call.kind(),
            tx_id: format!("0x{:064x}", pending.tx_id),
        })
    }
}

pub fn kinds(calls: &[WriteCall]) -> Vec<TxKind> {
    calls.iter().map(WriteCall::kind).collect()
}
