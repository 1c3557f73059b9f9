//! Node query helpers

use ergo_lib::ergotree_ir::chain::ergo_box::ErgoBox;
use ergo_node_interface::NodeInterface;
use ergo_tx::Eip12InputBox;
use gluon_core::{BoxId, NodeError, TokenId};

use crate::Result;

/// Get an unspent box by its ID, mempool included
pub async fn get_box_by_id(node: &NodeInterface, box_id: &BoxId) -> Result<ErgoBox> {
    node.box_from_id_with_pool(box_id.as_str())
        .await
        .map_err(|e| {
            let message = e.to_string();
            if message.contains("not found") || message.contains("404") {
                NodeError::BoxNotFound {
                    box_id: box_id.to_string(),
                }
            } else {
                NodeError::ApiError { message }
            }
        })
}

/// Get unspent boxes containing a specific token
///
/// Requires a node running with extraIndex.
pub async fn get_boxes_by_token_id(
    node: &NodeInterface,
    token_id: &TokenId,
    limit: u64,
) -> Result<Vec<ErgoBox>> {
    let ergo_token_id: ergo_lib::ergotree_ir::chain::token::TokenId =
        token_id.as_str().parse().map_err(|e| NodeError::ApiError {
            message: format!("Invalid token ID format: {}", e),
        })?;

    node.unspent_boxes_by_token_id(&ergo_token_id, 0, limit)
        .await
        .map_err(|e| {
            let message = e.to_string();
            if message.contains("404") {
                NodeError::ExtraIndexRequired {
                    feature: "token ID lookup",
                }
            } else {
                NodeError::ApiError { message }
            }
        })
}

/// Get the transaction ID and output index where a box was created.
///
/// Queries `/blockchain/box/byId/{box_id}`.
pub async fn get_box_creation_info(node: &NodeInterface, box_id: &str) -> Result<(String, u16)> {
    let endpoint = format!("/blockchain/box/byId/{}", box_id);
    let response = node
        .send_get_req(&endpoint)
        .await
        .map_err(|e| NodeError::ApiError {
            message: format!("Failed to get box details for {}: {}", box_id, e),
        })?;

    let json: serde_json::Value = response.json().await.map_err(|e| NodeError::ApiError {
        message: format!("Failed to parse box response: {}", e),
    })?;

    box_context_from_json(box_id, &json)
}

/// Extract `(transactionId, index)` from a node box response
pub fn box_context_from_json(box_id: &str, json: &serde_json::Value) -> Result<(String, u16)> {
    let tx_id = json["transactionId"]
        .as_str()
        .ok_or_else(|| NodeError::ParseError(format!("Missing transactionId in box {}", box_id)))?
        .to_string();

    let index = json["index"]
        .as_u64()
        .and_then(|i| u16::try_from(i).ok())
        .ok_or_else(|| NodeError::ParseError(format!("Missing index in box {}", box_id)))?;

    Ok((tx_id, index))
}

/// Convert a node box into a spendable EIP-12 input
pub async fn to_eip12_input(node: &NodeInterface, ergo_box: &ErgoBox) -> Result<Eip12InputBox> {
    let box_id = ergo_box.box_id().to_string();
    let (tx_id, index) = get_box_creation_info(node, &box_id).await?;
    Ok(Eip12InputBox::from_ergo_box(ergo_box, tx_id, index))
}
