pub mod app;
pub mod chain;
pub mod config;
pub mod deployment;
pub mod error;
pub mod fuel;
pub mod pricing;
pub mod session;
pub mod ui;
pub mod wallets;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub mod token_types {
    use fuels::macros::abigen;

    abigen!(Contract(
        name = "CryptoDevToken",
        abi = "abi/crypto-dev-token-abi.json"
    ));
}

pub mod collectible_types {
    use fuels::macros::abigen;

    abigen!(Contract(
        name = "CryptoDevsNft",
        abi = "abi/crypto-devs-nft-abi.json"
    ));
}
