//! Known EVM networks, token deployments and the default delegation target.

use alloy_primitives::{Address, address};

/// An EIP-155 chain ID (e.g., 8453 for Base, 84532 for Base Sepolia).
pub type ChainId = u64;

/// Ethereum Mainnet chain ID.
pub const ETHEREUM_MAINNET: ChainId = 1;

/// Ethereum Sepolia (testnet) chain ID.
pub const ETHEREUM_SEPOLIA: ChainId = 11_155_111;

/// Base Mainnet chain ID.
pub const BASE_MAINNET: ChainId = 8453;

/// Base Sepolia (testnet) chain ID.
pub const BASE_SEPOLIA: ChainId = 84532;

/// Optimism Mainnet chain ID.
pub const OPTIMISM_MAINNET: ChainId = 10;

/// Default batch-execution implementation accounts delegate to.
pub const DEFAULT_IMPLEMENTATION: Address = address!("000100abaad02f1cfc8bbe32bd5a564817339e72");

/// USDC contract address on Base Mainnet.
pub const USDC_BASE: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");

/// USDC contract address on Base Sepolia.
pub const USDC_BASE_SEPOLIA: Address = address!("036CbD53842c5426634e7929541eC2318f3dCF7e");

/// USDC contract address on Ethereum Mainnet.
pub const USDC_ETHEREUM: Address = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");

/// Token listed as WETH on Base in the batch-transfer sample data.
pub const WETH_BASE: Address = address!("4ed4E862860beD51a9570b96d89aF5E1B0Efefed");

/// A token deployment on an EVM network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    /// Ticker symbol.
    pub symbol: &'static str,
    /// Contract address.
    pub address: Address,
    /// Number of decimals (e.g., 6 for USDC).
    pub decimals: u8,
}

/// A known EVM network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Human-readable network name.
    pub name: &'static str,
    /// EIP-155 chain ID.
    pub chain_id: ChainId,
    /// Well-known token deployments.
    pub tokens: Vec<TokenInfo>,
}

impl NetworkConfig {
    /// Finds a token by contract address.
    #[must_use]
    pub fn find_token(&self, address: Address) -> Option<&TokenInfo> {
        self.tokens.iter().find(|t| t.address == address)
    }

    /// Finds a token by symbol (case-insensitive).
    #[must_use]
    pub fn find_symbol(&self, symbol: &str) -> Option<&TokenInfo> {
        self.tokens
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
    }
}

/// Returns all known networks.
#[must_use]
pub fn known_networks() -> Vec<NetworkConfig> {
    vec![
        NetworkConfig {
            name: "ethereum",
            chain_id: ETHEREUM_MAINNET,
            tokens: vec![usdc(USDC_ETHEREUM)],
        },
        NetworkConfig {
            name: "ethereum-sepolia",
            chain_id: ETHEREUM_SEPOLIA,
            tokens: vec![],
        },
        NetworkConfig {
            name: "base",
            chain_id: BASE_MAINNET,
            tokens: vec![
                usdc(USDC_BASE),
                TokenInfo {
                    symbol: "WETH",
                    address: WETH_BASE,
                    decimals: 18,
                },
            ],
        },
        NetworkConfig {
            name: "base-sepolia",
            chain_id: BASE_SEPOLIA,
            tokens: vec![usdc(USDC_BASE_SEPOLIA)],
        },
        NetworkConfig {
            name: "optimism",
            chain_id: OPTIMISM_MAINNET,
            tokens: vec![],
        },
    ]
}

/// Looks up a known network by chain ID.
#[must_use]
pub fn network_by_chain_id(chain_id: ChainId) -> Option<NetworkConfig> {
    known_networks()
        .into_iter()
        .find(|n| n.chain_id == chain_id)
}

const fn usdc(address: Address) -> TokenInfo {
    TokenInfo {
        symbol: "USDC",
        address,
        decimals: 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_by_chain_id() {
        assert_eq!(network_by_chain_id(BASE_SEPOLIA).unwrap().name, "base-sepolia");
        assert_eq!(network_by_chain_id(BASE_MAINNET).unwrap().name, "base");
        assert!(network_by_chain_id(999_999).is_none());
    }

    #[test]
    fn test_find_token() {
        let base = network_by_chain_id(BASE_MAINNET).unwrap();
        assert_eq!(base.find_token(USDC_BASE).unwrap().decimals, 6);
        assert_eq!(base.find_symbol("weth").unwrap().decimals, 18);
        assert!(base.find_token(USDC_ETHEREUM).is_none());
    }
}
