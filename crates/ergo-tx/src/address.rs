//! Ergo address utilities

use ergo_lib::ergotree_ir::chain::address::{Address, AddressEncoder, NetworkPrefix};
use ergo_lib::ergotree_ir::ergo_tree::ErgoTree;
use ergo_lib::ergotree_ir::serialization::SigmaSerializable;
use gluon_core::Network;

/// Convert an Ergo address (base58) to its ErgoTree hex representation.
///
/// Tries both mainnet and testnet prefixes.
pub fn address_to_ergo_tree(address: &str) -> Result<String, AddressError> {
    for prefix in [NetworkPrefix::Mainnet, NetworkPrefix::Testnet] {
        let encoder = AddressEncoder::new(prefix);
        if let Ok(addr) = encoder.parse_address_from_str(address) {
            if let Ok(tree) = addr.script() {
                if let Ok(bytes) = tree.sigma_serialize_bytes() {
                    return Ok(hex::encode(bytes));
                }
            }
        }
    }

    Err(AddressError::InvalidAddress(address.to_string()))
}

/// Render an ErgoTree (hex) as a base58 address for `network`.
pub fn ergo_tree_to_address(ergo_tree_hex: &str, network: Network) -> Result<String, AddressError> {
    let invalid = || AddressError::InvalidErgoTree(ergo_tree_hex.to_string());

    let bytes = hex::decode(ergo_tree_hex).map_err(|_| invalid())?;
    let tree = ErgoTree::sigma_parse_bytes(&bytes).map_err(|_| invalid())?;
    let address = Address::recreate_from_ergo_tree(&tree).map_err(|_| invalid())?;

    let prefix = match network {
        Network::Mainnet => NetworkPrefix::Mainnet,
        Network::Testnet => NetworkPrefix::Testnet,
    };
    Ok(AddressEncoder::new(prefix).address_to_str(&address))
}

#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("Invalid Ergo address: {0}")]
    InvalidAddress(String),

    #[error("Invalid ErgoTree: {0}")]
    InvalidErgoTree(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAINNET_P2PK: &str = "9hY16vzHmmfyVBwKeFGHvb2bMFsG94A1u7To1QWtUokACyFVENQ";

    #[test]
    fn test_valid_mainnet_address() {
        let tree = address_to_ergo_tree(MAINNET_P2PK).unwrap();
        assert!(tree.starts_with("0008cd")); // P2PK prefix
    }

    #[test]
    fn test_invalid_address() {
        assert!(address_to_ergo_tree("not_an_address").is_err());
    }

    #[test]
    fn test_tree_renders_back_to_address() {
        let tree = address_to_ergo_tree(MAINNET_P2PK).unwrap();
        let rendered = ergo_tree_to_address(&tree, Network::Mainnet).unwrap();
        assert_eq!(rendered, MAINNET_P2PK);
    }

    #[test]
    fn test_invalid_tree() {
        assert!(ergo_tree_to_address("zz", Network::Mainnet).is_err());
        assert!(ergo_tree_to_address("", Network::Mainnet).is_err());
    }
}
