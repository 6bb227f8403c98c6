//! `fuels` backed implementation of the chain boundary.

use crate::{
    chain::{
        Chain,
        TxKind,
        TxReceipt,
        WalletConnector,
        WriteCall,
    },
    collectible_types::CryptoDevsNft,
    token_types::CryptoDevToken,
    wallets::{
        self,
        Keystore,
    },
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use fuels::{
    accounts::{
        ViewOnlyAccount,
        wallet::Wallet,
    },
    prelude::{
        AssetId,
        CallParameters,
        ContractId,
        Execution,
        Provider,
        TxPolicies,
        VariableOutputPolicy,
    },
    programs::{
        calls::ContractCall,
        responses::SubmitResponse,
    },
    types::{
        Address,
        Bits256,
    },
};
use std::path::PathBuf;
use tracing::{
    debug,
    info,
};

const DEFAULT_SAFE_SCRIPT_GAS_LIMIT: u64 = 29_000_000;

/// Where to find the node, the keystore and the two deployed contracts.
#[derive(Clone, Debug)]
pub struct ConnectorConfig {
    pub rpc_url: String,
    pub wallet_dir: PathBuf,
    pub wallet_name: Option<String>,
    pub token_contract: ContractId,
    pub collectible_contract: ContractId,
}

/// Connects by unlocking a local keystore with a password supplied up front.
#[derive(Debug)]
pub struct KeystoreConnector {
    config: ConnectorConfig,
    password: Option<String>,
}

impl KeystoreConnector {
    pub fn new(config: ConnectorConfig) -> Self {
        Self {
            config,
            password: None,
        }
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.password = Some(password.into());
    }

    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    pub fn keystore(&self) -> Result<Keystore> {
        wallets::select_keystore(&self.config.wallet_dir, self.config.wallet_name.as_deref())
    }
}

impl WalletConnector for KeystoreConnector {
    type Chain = FuelChain;

    async fn connect(&self) -> Result<FuelChain> {
        let keystore = self.keystore()?;
        let password = self
            .password
            .as_deref()
            .ok_or_else(|| eyre!("Wallet '{}' is locked", keystore.name))?;
        let signer = wallets::unlock_signer(&keystore, password)?;

        let url = &self.config.rpc_url;
        let provider = Provider::connect(url)
            .await
            .wrap_err_with(|| format!("Failed to connect to provider at {url}"))?;
        let wallet = Wallet::new(signer, provider.clone());

        let consensus_parameters = provider.consensus_parameters().await?;
        let payment_asset = *consensus_parameters.base_asset_id();
        let max_gas_per_tx = consensus_parameters.tx_params().max_gas_per_tx();
        let gas_limit = max_gas_per_tx
            .saturating_sub(1)
            .clamp(1, DEFAULT_SAFE_SCRIPT_GAS_LIMIT);
        debug!(gas_limit, max_gas_per_tx, "using safe script gas limit");

        let account: Address = (*wallet.address()).into();
        info!(wallet = %keystore.name, %account, %url, "unlocked keystore");

        Ok(FuelChain {
            token: CryptoDevToken::new(self.config.token_contract, wallet.clone()),
            collectible: CryptoDevsNft::new(self.config.collectible_contract, wallet),
            provider,
            account,
            payment_asset,
            gas_limit,
        })
    }
}

pub struct FuelChain {
    provider: Provider,
    token: CryptoDevToken<Wallet>,
    collectible: CryptoDevsNft<Wallet>,
    account: Address,
    payment_asset: AssetId,
    gas_limit: u64,
}

/// A write accepted by the node, still waiting for its execution result.
pub struct FuelPending {
    kind: TxKind,
    response: SubmitResponse<Wallet, ContractCall, ()>,
}

impl FuelChain {
    fn policies(&self) -> TxPolicies {
        TxPolicies::default().with_script_gas_limit(self.gas_limit)
    }
}

impl Chain for FuelChain {
    type Pending = FuelPending;

    async fn network_id(&self) -> Result<u64> {
        let consensus_parameters = self.provider.consensus_parameters().await?;
        Ok(u64::from(consensus_parameters.chain_id()))
    }

    async fn account_address(&self) -> Result<Address> {
        Ok(self.account)
    }

    async fn total_supply(&self) -> Result<u64> {
        let value = self
            .token
            .methods()
            .total_supply()
            .with_tx_policies(self.policies())
            .simulate(Execution::realistic())
            .await?
            .value;
        Ok(value)
    }

    async fn token_balance_of(&self, owner: Address) -> Result<u64> {
        let value = self
            .token
            .methods()
            .balance_of(Bits256(*owner))
            .with_tx_policies(self.policies())
            .simulate(Execution::realistic())
            .await?
            .value;
        Ok(value)
    }

    async fn token_id_claimed(&self, token_id: u64) -> Result<bool> {
        let value = self
            .token
            .methods()
            .token_ids_claimed(token_id)
            .with_tx_policies(self.policies())
            .simulate(Execution::realistic())
            .await?
            .value;
        Ok(value)
    }

    async fn collectible_balance_of(&self, owner: Address) -> Result<u64> {
        let value = self
            .collectible
            .methods()
            .balance_of(Bits256(*owner))
            .with_tx_policies(self.policies())
            .simulate(Execution::realistic())
            .await?
            .value;
        Ok(value)
    }

    async fn collectible_of_owner_by_index(&self, owner: Address, index: u64) -> Result<u64> {
        let value = self
            .collectible
            .methods()
            .token_of_owner_by_index(Bits256(*owner), index)
            .with_tx_policies(self.policies())
            .simulate(Execution::realistic())
            .await?
            .value;
        Ok(value)
    }

    async fn collectible_owner(&self) -> Result<Address> {
        let owner = self
            .collectible
            .methods()
            .owner()
            .with_tx_policies(self.policies())
            .simulate(Execution::realistic())
            .await?
            .value;
        Ok(Address::from(owner.0))
    }

    async fn submit(&self, call: WriteCall) -> Result<FuelPending> {
        let methods = self.token.methods();
        let response = match call {
            WriteCall::Mint { amount, payment } => {
                let params = CallParameters::new(payment, self.payment_asset, self.gas_limit);
                methods
                    .mint(amount)
                    .with_variable_output_policy(VariableOutputPolicy::EstimateMinimum)
                    .call_params(params)?
                    .with_tx_policies(self.policies())
                    .submit()
                    .await?
            }
            WriteCall::Claim => {
                methods
                    .claim()
                    .with_variable_output_policy(VariableOutputPolicy::EstimateMinimum)
                    .with_tx_policies(self.policies())
                    .submit()
                    .await?
            }
            WriteCall::Withdraw => {
                methods
                    .withdraw()
                    .with_variable_output_policy(VariableOutputPolicy::EstimateMinimum)
                    .with_tx_policies(self.policies())
                    .submit()
                    .await?
            }
        };
        debug!(kind = %call.kind(), tx_id = %response.tx_id(), "transaction submitted");
        Ok(FuelPending {
            kind: call.kind(),
            response,
        })
    }

    async fn confirm(&self, pending: FuelPending) -> Result<TxReceipt> {
        let tx_id = format!("0x{}", pending.response.tx_id());
        pending
            .response
            .response()
            .await
            .wrap_err_with(|| format!("transaction {tx_id} did not succeed"))?;
        Ok(TxReceipt {
            kind: pending.kind,
            tx_id,
        })
    }
}
