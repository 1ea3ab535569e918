use crate::constants::{EthDexAddress, FEE_TIERS_BPS, WETH, tick_spacing_for_fee_bps};
use crate::pools::PoolVersion;
use alloy_primitives::Address;
use dotenvy::dotenv;
use regex::{Captures, Regex};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use std::{env, fs};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("Error loading config: {0}")]
    ConfigError(String),
}

/// Static description of one exchange venue.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VenueConfig {
    /// Stable identifier carried through pools, routes and quotes.
    pub name: String,
    pub version: PoolVersion,
    pub factory: Address,
    pub router: Address,
    /// Off-chain quoting contract; required for v3 venues.
    pub quoter: Option<Address>,
    /// Fee tiers this venue supports, in basis points. One tier for v2
    /// venues, up to four for v3.
    pub fee_tiers_bps: Vec<u16>,
}

/// Immutable engine configuration, injected into the router and pool
/// manager at construction time so tests can substitute mock venues.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// HTTP RPC URL used for all read-only contract calls.
    pub rpc_http_url: String,
    /// Timeout for a single RPC call in seconds.
    pub rpc_timeout_secs: u64,
    /// Overall deadline for one quote request in seconds.
    pub request_deadline_secs: u64,
    /// Bounded fan-out width for concurrent RPC calls.
    pub max_concurrent_rpc: usize,
    /// Assumed gas price in wei used to rank routes by gas-adjusted output.
    pub gas_price_wei: u64,
    /// Wrapped-native token; swaps selling it forward native value.
    pub wrapped_native: Address,
    /// Horizon added to "now" for default transaction deadlines, in seconds.
    pub tx_deadline_secs: u64,
    pub venues: Vec<VenueConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rpc_http_url: "https://eth.llamarpc.com".to_string(),
            rpc_timeout_secs: 10,
            request_deadline_secs: 30,
            max_concurrent_rpc: 8,
            gas_price_wei: 1_000_000_000,
            wrapped_native: WETH,
            tx_deadline_secs: 300,
            venues: vec![
                VenueConfig {
                    name: "uniswap-v2".to_string(),
                    version: PoolVersion::V2,
                    factory: EthDexAddress::UNISWAP_V2_FACTORY,
                    router: EthDexAddress::UNISWAP_V2_ROUTER,
                    quoter: None,
                    fee_tiers_bps: vec![30],
                },
                VenueConfig {
                    name: "sushiswap".to_string(),
                    version: PoolVersion::V2,
                    factory: EthDexAddress::SUSHISWAP_FACTORY,
                    router: EthDexAddress::SUSHISWAP_ROUTER,
                    quoter: None,
                    fee_tiers_bps: vec![30],
                },
                VenueConfig {
                    name: "uniswap-v3".to_string(),
                    version: PoolVersion::V3,
                    factory: EthDexAddress::UNISWAP_V3_FACTORY,
                    router: EthDexAddress::UNISWAP_V3_ROUTER,
                    quoter: Some(EthDexAddress::UNISWAP_V3_QUOTER),
                    fee_tiers_bps: FEE_TIERS_BPS.to_vec(),
                },
            ],
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables on top of defaults.
    pub fn from_env() -> eyre::Result<Self> {
        let mut config = Self::default();

        if let Ok(rpc_http_url) = env::var("RPC_HTTP_URL") {
            let _url = Url::parse(&rpc_http_url)
                .map_err(|e| eyre::eyre!("Invalid RPC_HTTP_URL: {}", e))?;
            config.rpc_http_url = rpc_http_url;
        }

        if let Ok(timeout_str) = env::var("RPC_TIMEOUT_SECS") {
            config.rpc_timeout_secs = timeout_str
                .parse()
                .map_err(|e| eyre::eyre!("Invalid RPC_TIMEOUT_SECS: {}", e))?;
        }

        if let Ok(deadline_str) = env::var("REQUEST_DEADLINE_SECS") {
            config.request_deadline_secs = deadline_str
                .parse()
                .map_err(|e| eyre::eyre!("Invalid REQUEST_DEADLINE_SECS: {}", e))?;
        }

        if let Ok(width_str) = env::var("MAX_CONCURRENT_RPC") {
            config.max_concurrent_rpc = width_str
                .parse()
                .map_err(|e| eyre::eyre!("Invalid MAX_CONCURRENT_RPC: {}", e))?;
        }

        if let Ok(gas_price_str) = env::var("GAS_PRICE_WEI") {
            config.gas_price_wei = gas_price_str
                .parse()
                .map_err(|e| eyre::eyre!("Invalid GAS_PRICE_WEI: {}", e))?;
        }

        Ok(config)
    }

    /// Load the `[engine]` section of a TOML file, with `${VAR}` expansion.
    pub async fn load_from_file(file_name: String) -> Result<Self, LoadConfigError> {
        let root: EngineConfigRoot = load_from_file(file_name).await?;
        root.engine.validate()?;
        Ok(root.engine)
    }

    pub fn load_from_file_sync(file_name: String) -> Result<Self, LoadConfigError> {
        let root: EngineConfigRoot = load_from_file_sync(file_name)?;
        root.engine.validate()?;
        Ok(root.engine)
    }

    pub fn validate(&self) -> Result<(), LoadConfigError> {
        for venue in &self.venues {
            if venue.fee_tiers_bps.is_empty() {
                return Err(LoadConfigError::ConfigError(format!(
                    "venue {:?} has no fee tiers",
                    venue.name
                )));
            }
            for &fee_bps in &venue.fee_tiers_bps {
                if tick_spacing_for_fee_bps(fee_bps).is_none() {
                    return Err(LoadConfigError::ConfigError(format!(
                        "venue {:?} has unsupported fee tier {} bps",
                        venue.name, fee_bps
                    )));
                }
            }
            match venue.version {
                PoolVersion::V2 => {
                    if venue.fee_tiers_bps.len() != 1 {
                        return Err(LoadConfigError::ConfigError(format!(
                            "v2 venue {:?} must have exactly one fee tier",
                            venue.name
                        )));
                    }
                }
                PoolVersion::V3 => {
                    if venue.quoter.is_none() {
                        return Err(LoadConfigError::ConfigError(format!(
                            "v3 venue {:?} has no quoter address",
                            venue.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn venue(&self, name: &str) -> Option<&VenueConfig> {
        self.venues.iter().find(|v| v.name == name)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn request_deadline(&self) -> Duration {
        Duration::from_secs(self.request_deadline_secs)
    }

    pub fn tx_deadline(&self) -> Duration {
        Duration::from_secs(self.tx_deadline_secs)
    }
}

#[derive(Clone, Deserialize, Debug)]
pub struct EngineConfigRoot {
    pub engine: EngineConfig,
}

pub async fn load_from_file<T: DeserializeOwned>(file_name: String) -> Result<T, LoadConfigError> {
    dotenv().ok();
    let contents = tokio::fs::read_to_string(file_name).await?;
    let contents = expand_vars(&contents);
    let config: T = toml::from_str(&contents)?;
    Ok(config)
}

pub fn load_from_file_sync<T: DeserializeOwned>(file_name: String) -> Result<T, LoadConfigError> {
    dotenv().ok();
    let contents = fs::read_to_string(file_name)?;
    let contents = expand_vars(&contents);
    let config: T = toml::from_str(&contents)?;
    Ok(config)
}

fn expand_vars(raw_config: &str) -> String {
    let re = Regex::new(r"\$\{([a-zA-Z_][0-9a-zA-Z_]*)\}").expect("static regex");
    re.replace_all(raw_config, |caps: &Captures| match env::var(&caps[1]) {
        Ok(val) => val,
        Err(_) => caps[0].to_string(),
    })
    .to_string()
}
