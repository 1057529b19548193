//! Alloy-backed [`ChainClient`].

use std::num::NonZeroUsize;
use std::time::Duration;

use alloy_network::{Ethereum as AlloyEthereum, EthereumWallet, NetworkWallet};
use alloy_primitives::{Address, Bytes, TxHash};
use alloy_provider::fillers::{
    BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller,
    SimpleNonceManager, WalletFiller,
};
use alloy_provider::{Identity, Provider, ProviderBuilder, RootProvider};
use alloy_rpc_client::RpcClient;
use alloy_rpc_types_eth::TransactionRequest;
use alloy_transport::layers::{FallbackLayer, ThrottleLayer};
use alloy_transport_http::Http;
use tower::ServiceBuilder;
use url::Url;

use crate::client::{ChainClient, ReceiptSummary};
use crate::error::ChainError;

/// Default time to wait for a receipt.
pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default delay between receipt polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Combined filler type for gas, blob gas, nonce, and chain ID.
///
/// Nonces are queried from the node for every transaction rather than
/// cached, so an authorization signed against a fresh nonce read and the
/// transaction carrying it agree on the account state.
pub type InnerFiller = JoinFill<
    GasFiller,
    JoinFill<BlobGasFiller, JoinFill<NonceFiller<SimpleNonceManager>, ChainIdFiller>>,
>;

/// The fully composed provider type built by [`Eip155ChainClient::connect`].
pub type InnerProvider = FillProvider<
    JoinFill<JoinFill<Identity, InnerFiller>, WalletFiller<EthereumWallet>>,
    RootProvider,
>;

/// HTTP chain client with the default filler stack.
pub type HttpChainClient = Eip155ChainClient<InnerProvider>;

/// HTTP chain client without a wallet.
pub type ReadOnlyChainClient = Eip155ChainClient<RootProvider>;

/// A [`ChainClient`] over any alloy [`Provider`].
///
/// Transactions are signed by the provider's wallet, using the signer that
/// matches the request's `from` address.
#[derive(Debug, Clone)]
pub struct Eip155ChainClient<P> {
    inner: P,
    receipt_timeout: Duration,
    poll_interval: Duration,
}

impl<P> Eip155ChainClient<P> {
    /// Wraps an existing provider.
    pub const fn new(inner: P) -> Self {
        Self {
            inner,
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Sets how long [`ChainClient::await_receipt`] waits before giving up.
    #[must_use]
    pub const fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }

    /// Sets the delay between receipt polls.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Returns the underlying provider.
    pub const fn inner(&self) -> &P {
        &self.inner
    }
}

impl Eip155ChainClient<RootProvider> {
    /// Connects without a wallet, for queries only.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Custom`] if no HTTP endpoint is given.
    pub fn read_only(endpoints: &[(Url, Option<u32>)]) -> Result<Self, ChainError> {
        let client = HttpChainClient::rpc_client(endpoints)?;
        Ok(Self::new(RootProvider::new(client)))
    }
}

impl Eip155ChainClient<InnerProvider> {
    /// Creates an RPC client from HTTP endpoint URLs with optional per-endpoint rate limits.
    ///
    /// Each entry in `endpoints` is a `(url, optional_rate_limit)` pair.
    /// Non-HTTP(S) URLs are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Custom`] if no HTTP endpoint remains.
    pub fn rpc_client(endpoints: &[(Url, Option<u32>)]) -> Result<RpcClient, ChainError> {
        let transports = endpoints
            .iter()
            .filter_map(|(url, rate_limit)| {
                let scheme = url.scheme();
                if scheme != "http" && scheme != "https" {
                    return None;
                }
                #[cfg(feature = "telemetry")]
                tracing::info!(rpc_url=%url, rate_limit=?rate_limit, "Using HTTP transport");
                let limit = rate_limit.unwrap_or(u32::MAX);
                let service = ServiceBuilder::new()
                    .layer(ThrottleLayer::new(limit))
                    .service(Http::new(url.clone()));
                Some(service)
            })
            .collect::<Vec<_>>();
        let active = NonZeroUsize::new(transports.len())
            .ok_or_else(|| ChainError::Custom("at least one HTTP(S) RPC endpoint is required".into()))?;
        let fallback = ServiceBuilder::new()
            .layer(FallbackLayer::default().with_active_transport_count(active))
            .service(transports);
        Ok(RpcClient::new(fallback, false))
    }

    /// Connects to `endpoints` with `wallet` signing submitted transactions.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Custom`] if the wallet has no signers or no HTTP
    /// endpoint is given.
    pub fn connect(
        endpoints: &[(Url, Option<u32>)],
        wallet: EthereumWallet,
    ) -> Result<Self, ChainError> {
        let signer_addresses =
            NetworkWallet::<AlloyEthereum>::signer_addresses(&wallet).collect::<Vec<_>>();
        if signer_addresses.is_empty() {
            return Err(ChainError::Custom("at least one signer must be provided".into()));
        }
        let client = Self::rpc_client(endpoints)?;
        let filler = JoinFill::new(
            GasFiller,
            JoinFill::new(
                BlobGasFiller::default(),
                JoinFill::new(
                    NonceFiller::new(SimpleNonceManager::default()),
                    ChainIdFiller::default(),
                ),
            ),
        );
        let inner: InnerProvider = ProviderBuilder::default()
            .filler(filler)
            .wallet(wallet)
            .connect_client(client);

        #[cfg(feature = "telemetry")]
        tracing::info!(signers=?signer_addresses, "Using EVM provider");

        Ok(Self::new(inner))
    }
}

impl<P> ChainClient for Eip155ChainClient<P>
where
    P: Provider + Send + Sync,
{
    async fn chain_id(&self) -> Result<u64, ChainError> {
        Ok(self.inner.get_chain_id().await?)
    }

    async fn get_account_code(&self, address: Address) -> Result<Bytes, ChainError> {
        let code_fut = self.inner.get_code_at(address).into_future();
        let code = traced!(
            code_fut,
            tracing::info_span!("get_code_at", address = %address, otel.kind = "client")
        )?;
        Ok(code)
    }

    async fn get_transaction_count(&self, address: Address) -> Result<u64, ChainError> {
        Ok(self.inner.get_transaction_count(address).await?)
    }

    async fn call(&self, tx: TransactionRequest) -> Result<Bytes, ChainError> {
        Ok(self.inner.call(tx).await?)
    }

    async fn submit_transaction(&self, tx: TransactionRequest) -> Result<TxHash, ChainError> {
        let send_fut = self.inner.send_transaction(tx);
        let pending = traced!(
            send_fut,
            tracing::info_span!("send_transaction", otel.kind = "client")
        )?;
        Ok(*pending.tx_hash())
    }

    async fn await_receipt(&self, tx_hash: TxHash) -> Result<ReceiptSummary, ChainError> {
        let poll = async {
            loop {
                if let Some(receipt) = self.inner.get_transaction_receipt(tx_hash).await? {
                    return Ok::<_, ChainError>(ReceiptSummary {
                        transaction_hash: receipt.transaction_hash,
                        status: receipt.status(),
                        block_number: receipt.block_number,
                        gas_used: receipt.gas_used,
                    });
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };
        tokio::time::timeout(self.receipt_timeout, poll)
            .await
            .map_err(|_| ChainError::ReceiptTimeout {
                tx_hash,
                timeout: self.receipt_timeout,
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_json_rpc::ErrorPayload;
    use alloy_primitives::{address, b256};
    use alloy_transport::mock::Asserter;

    fn mocked(asserter: &Asserter) -> ReadOnlyChainClient {
        Eip155ChainClient::new(RootProvider::new(RpcClient::mocked(asserter.clone())))
    }

    #[tokio::test]
    async fn test_receipt_wait_is_bounded() {
        let asserter = Asserter::new();
        for _ in 0..100 {
            asserter.push_success(&Option::<()>::None);
        }
        let client = mocked(&asserter)
            .with_receipt_timeout(Duration::from_millis(50))
            .with_poll_interval(Duration::from_millis(10));
        let tx_hash = b256!("1111111111111111111111111111111111111111111111111111111111111111");

        let err = client.await_receipt(tx_hash).await.unwrap_err();
        let ChainError::ReceiptTimeout {
            tx_hash: waited_for,
            timeout,
        } = err
        else {
            panic!("expected a receipt timeout, got {err:?}");
        };
        assert_eq!(waited_for, tx_hash);
        assert_eq!(timeout, Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_node_error_surfaces_as_rejected() {
        let asserter = Asserter::new();
        asserter.push_failure(ErrorPayload {
            code: -32000,
            message: "nonce too low".into(),
            data: None,
        });
        let client = mocked(&asserter);

        let err = client
            .get_transaction_count(address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"))
            .await
            .unwrap_err();
        let ChainError::Rejected { code, message } = err else {
            panic!("expected a rejection, got {err:?}");
        };
        assert_eq!(code, -32000);
        assert_eq!(message, "nonce too low");
    }

    #[test]
    fn test_rpc_client_requires_http_endpoint() {
        let ws: Url = "ws://localhost:8546".parse().unwrap();
        assert!(matches!(
            HttpChainClient::rpc_client(&[(ws, None)]),
            Err(ChainError::Custom(_))
        ));
    }
}
