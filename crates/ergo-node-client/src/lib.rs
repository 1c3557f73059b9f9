//! ergo-node-client: Ledger access for the Gluon toolkit
//!
//! [`LedgerGateway`] is the only way the protocol layer reads chain state.
//! [`NodeClient`] implements it on top of ergo-node-interface-rust; tests
//! substitute their own in-memory gateway.

pub mod queries;

use std::sync::Arc;

use async_trait::async_trait;
use ergo_node_interface::NodeInterface;
use ergo_tx::Eip12InputBox;
use gluon_core::{BlockHeight, BoxId, NodeConfig, NodeError, TokenId};

/// Default timeout for node API calls (30 seconds).
const NODE_REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Upper bound on boxes returned by a single token lookup
const TOKEN_LOOKUP_LIMIT: u64 = 50;

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, NodeError>;

/// Read-only view of the ledger.
///
/// Boxes are returned in full EIP-12 form (transaction id and output index
/// included) so they can be spent or used as data inputs directly.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Unspent boxes holding `token_id`; singleton NFTs yield one box
    async fn unspent_boxes_by_token_id(&self, token_id: &TokenId) -> Result<Vec<Eip12InputBox>>;

    /// A single unspent box by id
    async fn box_by_id(&self, box_id: &BoxId) -> Result<Eip12InputBox>;

    /// Current network height
    async fn network_height(&self) -> Result<BlockHeight>;
}

/// Ergo node backed [`LedgerGateway`]
#[derive(Clone)]
pub struct NodeClient {
    inner: Arc<NodeInterface>,
    config: NodeConfig,
}

impl NodeClient {
    /// Connect to the node described by `config`
    pub async fn new(config: NodeConfig) -> Result<Self> {
        let node = NodeInterface::from_url_str(&config.api_key, &config.url)
            .await
            .map_err(|e| NodeError::Unreachable {
                url: format!("{}: {}", config.url, e),
            })?;

        tracing::debug!(url = %config.url, "Connected to Ergo node");

        Ok(Self {
            inner: Arc::new(node),
            config,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }
}

#[async_trait]
impl LedgerGateway for NodeClient {
    async fn unspent_boxes_by_token_id(&self, token_id: &TokenId) -> Result<Vec<Eip12InputBox>> {
        let boxes = timed(queries::get_boxes_by_token_id(
            &self.inner,
            token_id,
            TOKEN_LOOKUP_LIMIT,
        ))
        .await?;

        let mut eip12_boxes = Vec::with_capacity(boxes.len());
        for ergo_box in boxes {
            eip12_boxes.push(timed(queries::to_eip12_input(&self.inner, &ergo_box)).await?);
        }

        tracing::debug!(token_id = %token_id, count = eip12_boxes.len(), "Fetched boxes by token");
        Ok(eip12_boxes)
    }

    async fn box_by_id(&self, box_id: &BoxId) -> Result<Eip12InputBox> {
        let ergo_box = timed(queries::get_box_by_id(&self.inner, box_id)).await?;
        timed(queries::to_eip12_input(&self.inner, &ergo_box)).await
    }

    async fn network_height(&self) -> Result<BlockHeight> {
        timed_request(self.inner.current_block_height()).await
    }
}

/// Bound a gateway call by [`NODE_REQUEST_TIMEOUT`]
async fn timed<T>(fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(NODE_REQUEST_TIMEOUT, fut)
        .await
        .map_err(|_| NodeError::ApiError {
            message: format!(
                "Node request timed out after {}s",
                NODE_REQUEST_TIMEOUT.as_secs()
            ),
        })?
}

/// Bound a raw node-interface call, mapping its error to [`NodeError`]
async fn timed_request<T, E: std::fmt::Display>(
    fut: impl std::future::Future<Output = std::result::Result<T, E>>,
) -> Result<T> {
    timed(async {
        fut.await.map_err(|e| NodeError::ApiError {
            message: e.to_string(),
        })
    })
    .await
}
