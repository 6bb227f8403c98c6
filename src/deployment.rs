use chrono::Utc;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use fuels::prelude::ContractId;
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    fs,
    path::{
        Path,
        PathBuf,
    },
    str::FromStr,
};

pub const DEPLOYMENTS_ROOT: &str = ".deployments";
const DEPLOYMENT_FILE: &str = "deployment.json";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeploymentEnv {
    Dev,
    Test,
    Local,
}

impl DeploymentEnv {
    pub fn dir_name(self) -> &'static str {
        match self {
            DeploymentEnv::Dev => "dev",
            DeploymentEnv::Test => "test",
            DeploymentEnv::Local => "local",
        }
    }
}

impl fmt::Display for DeploymentEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeploymentEnv::Dev => "Devnet",
            DeploymentEnv::Test => "Testnet",
            DeploymentEnv::Local => "Local",
        };
        write!(f, "{name}")
    }
}

/// Where the token and collectible contracts live on one network.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub token_contract_id: String,
    pub collectible_contract_id: String,
    pub network_url: String,
    #[serde(default)]
    pub chain_id: Option<u64>,
    pub recorded_at: String,
}

impl DeploymentRecord {
    pub fn new(
        token_contract: ContractId,
        collectible_contract: ContractId,
        network_url: impl Into<String>,
        chain_id: Option<u64>,
    ) -> Self {
        Self {
            token_contract_id: format!("0x{token_contract}"),
            collectible_contract_id: format!("0x{collectible_contract}"),
            network_url: network_url.into(),
            chain_id,
            recorded_at: Utc::now().to_rfc3339(),
        }
    }

    pub fn token_contract(&self) -> Result<ContractId> {
        parse_contract_id(&self.token_contract_id)
            .wrap_err("Deployment record contains an invalid token contract id")
    }

    pub fn collectible_contract(&self) -> Result<ContractId> {
        parse_contract_id(&self.collectible_contract_id)
            .wrap_err("Deployment record contains an invalid collectible contract id")
    }
}

/// Accepts hex ids with or without a `0x` or `fuel` prefix.
pub fn parse_contract_id(raw: &str) -> Result<ContractId> {
    let trimmed = raw.trim().trim_start_matches("fuel");
    ContractId::from_str(trimmed).map_err(|e| eyre!("invalid contract id {raw:?}: {e}"))
}

#[derive(Debug)]
pub struct DeploymentStore {
    path: PathBuf,
}

impl DeploymentStore {
    /// A store for `env` under `root`. Nothing is created until `save`.
    pub fn under(root: impl AsRef<Path>, env: DeploymentEnv) -> Self {
        Self {
            path: root.as_ref().join(env.dir_name()).join(DEPLOYMENT_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<DeploymentRecord>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = fs::read(&self.path).wrap_err("Failed to read deployment record")?;
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        let record = serde_json::from_slice::<DeploymentRecord>(&data)
            .wrap_err("Failed to parse deployment record JSON")?;
        Ok(Some(record))
    }

    pub fn save(&self, record: &DeploymentRecord) -> Result<()> {
        let json = serde_json::to_vec_pretty(record)
            .wrap_err("Failed to serialize deployment record")?;
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).wrap_err_with(|| {
                format!("Failed to create deployment directory {}", dir.display())
            })?;
        }
        fs::write(&self.path, json).wrap_err("Failed to write deployment record")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    fn scratch_root(label: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!(
            "crypto-devs-ico-deployments-{label}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&root);
        root
    }

    #[test]
    fn load__fresh_store__returns_none_and_creates_nothing() {
        // given
        let root = scratch_root("fresh");
        let store = DeploymentStore::under(&root, DeploymentEnv::Local);

        // when
        let record = store.load().unwrap();

        // then
        assert!(record.is_none());
        assert!(store.path().ends_with("local/deployment.json"));
        assert!(!root.exists());
    }

    #[test]
    fn save__then_load__returns_same_contract_ids() {
        // given
        let root = scratch_root("saved");
        let store = DeploymentStore::under(&root, DeploymentEnv::Test);
        let token = ContractId::from([1u8; 32]);
        let collectible = ContractId::from([2u8; 32]);
        let record =
            DeploymentRecord::new(token, collectible, "https://testnet.fuel.network", Some(0));

        // when
        store.save(&record).unwrap();
        let loaded = store.load().unwrap().unwrap();

        // then
        assert_eq!(loaded, record);
        assert_eq!(loaded.token_contract().unwrap(), token);
        assert_eq!(loaded.collectible_contract().unwrap(), collectible);
        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn parse_contract_id__garbage__fails() {
        assert!(parse_contract_id("not-a-contract").is_err());
    }
}
