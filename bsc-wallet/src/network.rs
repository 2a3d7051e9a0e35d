//! Named public BNB Smart Chain RPC endpoints.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Chain id of BNB Smart Chain mainnet.
pub const MAINNET_CHAIN_ID: u64 = 56;

/// Chain id of the BNB Smart Chain testnet.
pub const TESTNET_CHAIN_ID: u64 = 97;

/// A fixed public endpoint, selected by the caller at construction time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    /// Production dataseed.
    #[default]
    Mainnet,
    /// Testnet seed 1, server 1.
    #[serde(rename = "testnet-1-s1")]
    Testnet1S1,
    /// Testnet seed 2, server 1.
    #[serde(rename = "testnet-2-s1")]
    Testnet2S1,
    /// Testnet seed 1, server 2.
    #[serde(rename = "testnet-1-s2")]
    Testnet1S2,
    /// Testnet seed 2, server 2.
    #[serde(rename = "testnet-2-s2")]
    Testnet2S2,
    /// Testnet seed 1, server 3.
    #[serde(rename = "testnet-1-s3")]
    Testnet1S3,
    /// Testnet seed 2, server 3.
    #[serde(rename = "testnet-2-s3")]
    Testnet2S3,
}

impl Network {
    /// Every known endpoint.
    pub const ALL: [Self; 7] = [
        Self::Mainnet,
        Self::Testnet1S1,
        Self::Testnet2S1,
        Self::Testnet1S2,
        Self::Testnet2S2,
        Self::Testnet1S3,
        Self::Testnet2S3,
    ];

    /// JSON-RPC endpoint URL.
    #[must_use]
    pub const fn url(self) -> &'static str {
        match self {
            Self::Mainnet => "https://bsc-dataseed.binance.org/",
            Self::Testnet1S1 => "https://data-seed-prebsc-1-s1.bnbchain.org:8545",
            Self::Testnet2S1 => "https://data-seed-prebsc-2-s1.bnbchain.org:8545",
            Self::Testnet1S2 => "https://data-seed-prebsc-1-s2.bnbchain.org:8545",
            Self::Testnet2S2 => "https://data-seed-prebsc-2-s2.bnbchain.org:8545",
            Self::Testnet1S3 => "https://data-seed-prebsc-1-s3.bnbchain.org:8545",
            Self::Testnet2S3 => "https://data-seed-prebsc-2-s3.bnbchain.org:8545",
        }
    }

    /// Short kebab-case name, as accepted by [`FromStr`].
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet1S1 => "testnet-1-s1",
            Self::Testnet2S1 => "testnet-2-s1",
            Self::Testnet1S2 => "testnet-1-s2",
            Self::Testnet2S2 => "testnet-2-s2",
            Self::Testnet1S3 => "testnet-1-s3",
            Self::Testnet2S3 => "testnet-2-s3",
        }
    }

    /// Returns `true` for every endpoint except mainnet.
    #[must_use]
    pub const fn is_testnet(self) -> bool {
        !matches!(self, Self::Mainnet)
    }

    /// Chain id the endpoint is expected to report.
    #[must_use]
    pub const fn expected_chain_id(self) -> u64 {
        if self.is_testnet() {
            TESTNET_CHAIN_ID
        } else {
            MAINNET_CHAIN_ID
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|network| network.name() == wanted)
            .ok_or_else(|| Error::config(format!("unknown network '{s}'")))
    }
}
