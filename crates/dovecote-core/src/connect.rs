//! Store-connection setup.
//!
//! Opening the storage connection is a two-step resource acquisition:
//! an optional port-forward attempt, then the network join. The
//! fallback policy is asymmetric on purpose: forwarding failure
//! degrades to the unmapped bind address (a working-but-unreachable-
//! from-outside node is still a working node), while join failure is
//! fatal for the connect attempt.

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    dht::{DhtError, DhtNetwork},
    storage_gate::StorageGate,
};

/// Configuration for the storage connection.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Address to bind the DHT node to.
    pub address: String,

    /// Port to bind (and, if enabled, forward).
    pub port: u16,

    /// Whether to attempt a UPnP-style port mapping before joining.
    pub forward_port: bool,

    /// Seed peers for the network join.
    pub seeds: Vec<(String, u16)>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { address: "0.0.0.0".to_string(), port: 44_678, forward_port: false, seeds: vec![] }
    }
}

/// Errors from a port mapper.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("port mapping failed: {reason}")]
pub struct PortMapperError {
    /// The mapper's description of the failure.
    pub reason: String,
}

/// NAT port-mapping capability.
///
/// Both operations are best-effort: any failure here downgrades the
/// advertised address, it never aborts the connection.
#[async_trait]
pub trait PortMapper: Send + Sync {
    /// Request a public→private mapping for `port`.
    ///
    /// # Errors
    ///
    /// Returns `PortMapperError` if the gateway refuses or cannot be
    /// reached.
    async fn map(&self, port: u16) -> Result<(), PortMapperError>;

    /// Discover the gateway's external IP.
    ///
    /// # Errors
    ///
    /// Returns `PortMapperError` if discovery fails.
    async fn external_ip(&self) -> Result<String, PortMapperError>;
}

/// A mapper for environments with no NAT gateway access.
///
/// Always reports failure, which the fallback policy turns into "use
/// the unmapped bind address".
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPortMapper;

#[async_trait]
impl PortMapper for NoPortMapper {
    async fn map(&self, _port: u16) -> Result<(), PortMapperError> {
        Err(PortMapperError { reason: "port mapping not available".to_string() })
    }

    async fn external_ip(&self) -> Result<String, PortMapperError> {
        Err(PortMapperError { reason: "external ip discovery not available".to_string() })
    }
}

/// Errors from opening the storage connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// The network join failed; the connect attempt is dead.
    #[error("could not join storage network: {0}")]
    Join(#[source] DhtError),
}

/// Open the storage connection and wrap the joined handle in a gate.
///
/// # Errors
///
/// Returns `ConnectError::Join` if the network join fails. Port
/// mapping failures are logged and degrade the advertised address;
/// they never surface as errors.
pub async fn open_store<N, M>(
    network: &N,
    mapper: &M,
    config: &StoreConfig,
) -> Result<StorageGate<N::Handle>, ConnectError>
where
    N: DhtNetwork,
    M: PortMapper,
{
    let address = resolve_address(mapper, config).await;

    let handle = network.join(&address, config).await.map_err(ConnectError::Join)?;

    tracing::info!(address = %address, port = config.port, "joined storage network");

    Ok(StorageGate::new(handle))
}

/// Pick the address to advertise: the mapped external IP when
/// forwarding succeeds, the configured bind address otherwise.
async fn resolve_address<M: PortMapper>(mapper: &M, config: &StoreConfig) -> String {
    if !config.forward_port {
        return config.address.clone();
    }

    if let Err(e) = mapper.map(config.port).await {
        tracing::warn!(error = %e, "port mapping failed, using unmapped address");
        return config.address.clone();
    }

    match mapper.external_ip().await {
        Ok(ip) => ip,
        Err(e) => {
            tracing::warn!(error = %e, "external ip discovery failed, using unmapped address");
            config.address.clone()
        },
    }
}
