use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use eth_keystore::decrypt_key;
use fuels::{
    crypto::SecretKey,
    prelude::{
        derivation::DEFAULT_DERIVATION_PATH,
        private_key::PrivateKeySigner,
    },
};
use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

const KEYSTORE_EXTENSION: &str = "wallet";
const MIN_MNEMONIC_WORDS: usize = 12;

/// A `*.wallet` keystore file found in the wallet directory.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Keystore {
    pub name: String,
    pub path: PathBuf,
}

pub fn default_wallet_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").wrap_err("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".fuel").join("wallets"))
}

pub fn resolve_wallet_dir(dir: Option<&str>) -> Result<PathBuf> {
    match dir {
        Some(raw) => Ok(PathBuf::from(shellexpand::tilde(raw).into_owned())),
        None => default_wallet_dir(),
    }
}

/// Keystores in `dir`, sorted by name. A missing directory holds no keystores.
pub fn discover_keystores(dir: &Path) -> Result<Vec<Keystore>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(dir)
        .wrap_err_with(|| format!("Failed to read wallet directory {}", dir.display()))?;
    let mut keystores = Vec::new();
    for entry in entries {
        let path = entry.wrap_err("Failed to read wallet entry")?.path();
        let is_keystore = path.is_file()
            && path.extension().and_then(|ext| ext.to_str()) == Some(KEYSTORE_EXTENSION);
        if !is_keystore {
            continue;
        }
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| eyre!("Invalid wallet filename {:?}", path))?
            .to_owned();
        keystores.push(Keystore { name, path });
    }
    keystores.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(keystores)
}

/// The keystore called `name`, or the first one by name when no name is given.
pub fn select_keystore(dir: &Path, name: Option<&str>) -> Result<Keystore> {
    let mut keystores = discover_keystores(dir)?.into_iter();
    let found = match name {
        Some(name) => keystores.find(|k| k.name == name),
        None => keystores.next(),
    };
    found.ok_or_else(|| match name {
        Some(name) => eyre!("Wallet '{name}' not found in {}", dir.display()),
        None => eyre!("No wallet keystore found in {}", dir.display()),
    })
}

pub fn prompt_password(keystore: &Keystore) -> Result<String> {
    let prompt = format!("Enter password for wallet '{}': ", keystore.name);
    rpassword::prompt_password(prompt).wrap_err("Failed to read wallet password")
}

/// Decrypts the keystore into a signer. The payload is either a raw secret
/// key or a mnemonic phrase derived along the default path.
pub fn unlock_signer(keystore: &Keystore, password: &str) -> Result<PrivateKeySigner> {
    let secret = decrypt_key(&keystore.path, password.as_bytes())
        .map_err(|_| eyre!("Invalid password for wallet '{}'", keystore.name))?;

    if let Ok(secret_key) = SecretKey::try_from(secret.as_slice()) {
        return Ok(PrivateKeySigner::new(secret_key));
    }

    let mnemonic = std::str::from_utf8(&secret)
        .ok()
        .filter(|phrase| phrase.split_whitespace().count() >= MIN_MNEMONIC_WORDS);
    if let Some(phrase) = mnemonic {
        let secret_key =
            SecretKey::new_from_mnemonic_phrase_with_path(phrase, DEFAULT_DERIVATION_PATH)?;
        return Ok(PrivateKeySigner::new(secret_key));
    }

    Err(eyre!(
        "Wallet '{}' contained unsupported key material",
        keystore.name
    ))
}
