//! Network configurations and node selection

use crate::error::WasmAlgoError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// An algod or indexer endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Human-readable provider name (e.g., "AlgoNode")
    pub canonical_name: String,
    /// Base URL of the node
    pub url: String,
    /// Port, empty for the scheme default
    #[serde(default)]
    pub port: String,
}

/// Network configuration: chain identity plus the nodes serving it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    /// Display name (e.g., "Algorand MainNet")
    pub name: String,
    /// Genesis ID (e.g., "mainnet-v1.0")
    pub genesis_id: String,
    /// Base64 genesis hash
    pub genesis_hash: String,
    /// Whether this is a test network
    #[serde(default)]
    pub is_test_net: bool,
    pub algods: Vec<Node>,
    pub indexers: Vec<Node>,
}

impl Network {
    /// Decoded 32-byte genesis hash
    pub fn genesis_hash_bytes(&self) -> Result<[u8; 32], WasmAlgoError> {
        let bytes = BASE64
            .decode(&self.genesis_hash)
            .map_err(|e| WasmAlgoError::Config(format!("Invalid genesis hash: {}", e)))?;
        bytes.try_into().map_err(|b: Vec<u8>| {
            WasmAlgoError::Config(format!("Genesis hash must be 32 bytes, got {}", b.len()))
        })
    }

    /// Pick an algod node at random. No health check, no retry.
    pub fn random_algod(&self) -> Result<&Node, WasmAlgoError> {
        let node = choose(&self.algods, &self.name, "algod")?;
        debug!(network = %self.name, node = %node.canonical_name, "Selected algod node");
        Ok(node)
    }

    /// Pick an indexer node at random. No health check, no retry.
    pub fn random_indexer(&self) -> Result<&Node, WasmAlgoError> {
        let node = choose(&self.indexers, &self.name, "indexer")?;
        debug!(network = %self.name, node = %node.canonical_name, "Selected indexer node");
        Ok(node)
    }
}

fn choose<'a>(nodes: &'a [Node], network: &str, kind: &str) -> Result<&'a Node, WasmAlgoError> {
    nodes
        .choose(&mut rand::thread_rng())
        .ok_or_else(|| WasmAlgoError::Config(format!("Network {} has no {} nodes", network, kind)))
}

/// Find a network by its base64 genesis hash
pub fn find_by_genesis_hash<'a>(networks: &'a [Network], genesis_hash: &str) -> Option<&'a Network> {
    networks.iter().find(|n| n.genesis_hash == genesis_hash)
}

fn node(canonical_name: &str, url: &str) -> Node {
    Node {
        canonical_name: canonical_name.to_string(),
        url: url.to_string(),
        port: String::new(),
    }
}

/// Networks known to the wallet out of the box
pub fn default_networks() -> Vec<Network> {
    vec![
        Network {
            name: "Algorand MainNet".to_string(),
            genesis_id: "mainnet-v1.0".to_string(),
            genesis_hash: "wGHE2Pwdvd7S12BL5FaOP20EGYesN73ktiC1qzkkit8=".to_string(),
            is_test_net: false,
            algods: vec![
                node("AlgoNode", "https://mainnet-api.algonode.cloud"),
                node("Nodely", "https://mainnet-api.4160.nodely.dev"),
            ],
            indexers: vec![
                node("AlgoNode", "https://mainnet-idx.algonode.cloud"),
                node("Nodely", "https://mainnet-idx.4160.nodely.dev"),
            ],
        },
        Network {
            name: "Algorand TestNet".to_string(),
            genesis_id: "testnet-v1.0".to_string(),
            genesis_hash: "SGO1GKSzyE7IEPItTxCByw9x8FmnrCDexi9/cOUJOiI=".to_string(),
            is_test_net: true,
            algods: vec![node("AlgoNode", "https://testnet-api.algonode.cloud")],
            indexers: vec![node("AlgoNode", "https://testnet-idx.algonode.cloud")],
        },
        Network {
            name: "Algorand BetaNet".to_string(),
            genesis_id: "betanet-v1.0".to_string(),
            genesis_hash: "mFgazF+2uRS1tMiL9dsj01hJGySEmPN28B/TjjvpVW0=".to_string(),
            is_test_net: true,
            algods: vec![node("AlgoNode", "https://betanet-api.algonode.cloud")],
            indexers: vec![node("AlgoNode", "https://betanet-idx.algonode.cloud")],
        },
        Network {
            name: "Voi TestNet".to_string(),
            genesis_id: "voitest-v1".to_string(),
            genesis_hash: "IXnoWtviVVJW5LGivNFc0Dq14V3kqaXuK2u5OQrdVZo=".to_string(),
            is_test_net: true,
            algods: vec![node("Nodly", "https://testnet-api.voi.nodly.io")],
            indexers: vec![node("Nodly", "https://testnet-idx.voi.nodly.io")],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_genesis_hashes_decode() {
        for network in default_networks() {
            assert!(network.genesis_hash_bytes().is_ok(), "{}", network.name);
        }
    }

    #[test]
    fn test_random_algod_is_from_network() {
        let mainnet = &default_networks()[0];
        for _ in 0..16 {
            let node = mainnet.random_algod().unwrap();
            assert!(mainnet.algods.contains(node));
        }
        assert!(mainnet.indexers.contains(mainnet.random_indexer().unwrap()));
    }

    #[test]
    fn test_empty_node_list() {
        let mut network = default_networks().remove(1);
        network.algods.clear();
        assert!(network.random_algod().is_err());
    }

    #[test]
    fn test_find_by_genesis_hash() {
        let networks = default_networks();
        let found =
            find_by_genesis_hash(&networks, "SGO1GKSzyE7IEPItTxCByw9x8FmnrCDexi9/cOUJOiI=").unwrap();
        assert_eq!(found.genesis_id, "testnet-v1.0");
        assert!(find_by_genesis_hash(&networks, "unknown").is_none());
    }

    #[test]
    fn test_deserialize_network() {
        let json = r#"{
            "name": "Localnet",
            "genesisId": "dockernet-v1",
            "genesisHash": "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=",
            "algods": [{ "canonicalName": "local", "url": "http://localhost", "port": "4001" }],
            "indexers": []
        }"#;

        let network: Network = serde_json::from_str(json).unwrap();
        assert_eq!(network.algods[0].port, "4001");
        assert!(!network.is_test_net);
        assert_eq!(network.genesis_hash_bytes().unwrap(), [0u8; 32]);
    }
}
