use crate::{
    deployment::{
        DEPLOYMENTS_ROOT,
        DeploymentEnv,
        DeploymentRecord,
        DeploymentStore,
        parse_contract_id,
    },
    fuel::ConnectorConfig,
    wallets,
};
use clap::{
    ArgGroup,
    Parser,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use std::{
    path::{
        Path,
        PathBuf,
    },
    time::Duration,
};
use tracing::info;

pub const DEFAULT_TESTNET_RPC_URL: &str = "https://testnet.fuel.network";
pub const DEFAULT_DEVNET_RPC_URL: &str = "https://devnet.fuel.network";
pub const DEFAULT_LOCAL_RPC_URL: &str = "http://localhost:4000/";
/// Chain id reported by the public networks and by a default local node.
pub const DEFAULT_CHAIN_ID: u64 = 0;
pub const DEFAULT_REFRESH_SECS: u64 = 15;
pub const DEFAULT_LOG_DIR: &str = "logs";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Terminal client for the Crypto Devs token sale",
    long_about = None,
    group(
        ArgGroup::new("network")
            .args(["testnet", "devnet", "local"])
            .multiple(false)
    )
)]
pub struct Args {
    /// Connect to Fuel testnet (the default)
    #[arg(long)]
    pub testnet: bool,

    /// Connect to Fuel devnet
    #[arg(long)]
    pub devnet: bool,

    /// Connect to a local Fuel node
    #[arg(long)]
    pub local: bool,

    /// Override the RPC URL for the selected network
    #[arg(long)]
    pub rpc_url: Option<String>,

    /// Chain id the wallet must be connected to
    #[arg(long)]
    pub chain_id: Option<u64>,

    /// Keystore to use (defaults to the first one found)
    #[arg(long)]
    pub wallet: Option<String>,

    /// Keystore directory (defaults to ~/.fuel/wallets)
    #[arg(long)]
    pub wallet_dir: Option<String>,

    #[arg(long)]
    pub token_contract: Option<String>,

    #[arg(long)]
    pub collectible_contract: Option<String>,

    /// Skip the owner withdraw attempt after connecting
    #[arg(long)]
    pub no_withdraw_on_connect: bool,

    #[arg(long, default_value = DEFAULT_LOG_DIR)]
    pub log_dir: PathBuf,

    /// Seconds between background read refreshes
    #[arg(long, default_value_t = DEFAULT_REFRESH_SECS)]
    pub refresh_secs: u64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NetworkTarget {
    Testnet,
    Devnet,
    Local,
}

impl NetworkTarget {
    pub fn from_flags(args: &Args) -> Self {
        if args.devnet {
            NetworkTarget::Devnet
        } else if args.local {
            NetworkTarget::Local
        } else {
            NetworkTarget::Testnet
        }
    }

    pub fn default_rpc_url(self) -> &'static str {
        match self {
            NetworkTarget::Testnet => DEFAULT_TESTNET_RPC_URL,
            NetworkTarget::Devnet => DEFAULT_DEVNET_RPC_URL,
            NetworkTarget::Local => DEFAULT_LOCAL_RPC_URL,
        }
    }

    pub fn deployment_env(self) -> DeploymentEnv {
        match self {
            NetworkTarget::Testnet => DeploymentEnv::Test,
            NetworkTarget::Devnet => DeploymentEnv::Dev,
            NetworkTarget::Local => DeploymentEnv::Local,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub network: NetworkTarget,
    pub expected_chain_id: u64,
    pub connector: ConnectorConfig,
    pub withdraw_on_connect: bool,
    pub log_dir: PathBuf,
    pub refresh_interval: Duration,
}

impl AppConfig {
    pub fn from_args(args: Args) -> Result<Self> {
        Self::resolve(args, DEPLOYMENTS_ROOT)
    }

    /// Merges the command line with the deployment record under
    /// `deployments_root`. Flags win; contract ids given on the command line
    /// are written back to the record.
    pub fn resolve(args: Args, deployments_root: impl AsRef<Path>) -> Result<Self> {
        let network = NetworkTarget::from_flags(&args);
        let env = network.deployment_env();
        let store = DeploymentStore::under(deployments_root, env);
        let record = store.load().wrap_err("loading deployment record")?;

        let token_contract = match (&args.token_contract, &record) {
            (Some(raw), _) => parse_contract_id(raw).wrap_err("parsing --token-contract")?,
            (None, Some(record)) => record.token_contract()?,
            (None, None) => {
                return Err(eyre!(
                    "No token contract for {env}; pass --token-contract or add {}",
                    store.path().display()
                ));
            }
        };
        let collectible_contract = match (&args.collectible_contract, &record) {
            (Some(raw), _) => {
                parse_contract_id(raw).wrap_err("parsing --collectible-contract")?
            }
            (None, Some(record)) => record.collectible_contract()?,
            (None, None) => {
                return Err(eyre!(
                    "No collectible contract for {env}; pass --collectible-contract or add {}",
                    store.path().display()
                ));
            }
        };

        let rpc_url = args
            .rpc_url
            .clone()
            .or_else(|| record.as_ref().map(|r| r.network_url.clone()))
            .unwrap_or_else(|| network.default_rpc_url().to_owned());
        let expected_chain_id = args
            .chain_id
            .or_else(|| record.as_ref().and_then(|r| r.chain_id))
            .unwrap_or(DEFAULT_CHAIN_ID);

        if args.token_contract.is_some() || args.collectible_contract.is_some() {
            let updated = DeploymentRecord::new(
                token_contract,
                collectible_contract,
                rpc_url.clone(),
                Some(expected_chain_id),
            );
            store.save(&updated)?;
            info!(path = %store.path().display(), "updated deployment record");
        }

        let wallet_dir = wallets::resolve_wallet_dir(args.wallet_dir.as_deref())?;
        Ok(AppConfig {
            network,
            expected_chain_id,
            connector: ConnectorConfig {
                rpc_url,
                wallet_dir,
                wallet_name: args.wallet,
                token_contract,
                collectible_contract,
            },
            withdraw_on_connect: !args.no_withdraw_on_connect,
            log_dir: args.log_dir,
            refresh_interval: Duration::from_secs(args.refresh_secs.max(1)),
        })
    }
}
