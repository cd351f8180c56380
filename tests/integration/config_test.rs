//! Configuration loading tests

use snipe_race::config::{Config, NetworkPreset};
use tokio_test::{assert_err, assert_ok};

#[test]
fn test_config_example_loads() {
    let config: Config = toml::from_str(include_str!("../../config.toml.example")).unwrap();
    assert_eq!(config.network.preset, NetworkPreset::Testnet);
    assert_eq!(config.confirm.poll_interval_ms, 100);
    assert_ok!(config.validate());
}

#[test]
fn test_mainnet_preset_addresses() {
    let config: Config = toml::from_str("[network]\npreset = \"mainnet\"").unwrap();
    assert_eq!(config.network.chain_id(), 56);
    assert_eq!(
        config.network.wrapped_native().to_string().to_lowercase(),
        "0xbb4cdb9cbd36b01bd1cbaebf2de08d9173bc095c"
    );
    assert_eq!(
        config.network.factory().to_string().to_lowercase(),
        "0xca143ce32fe78f1f7019d7d551a6402fc5350c73"
    );
}

#[test]
fn test_zero_pair_block_range_rejected() {
    let config: Config = toml::from_str("[pairs]
max_block_range = 0").unwrap();
    assert_err!(config.validate());
}

#[test]
fn test_slippage_of_full_range_rejected() {
    let config: Config = toml::from_str("[trade]\nsell_slippage_bps = 10000").unwrap();
    assert_err!(config.validate());
}
