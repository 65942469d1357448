//! Ethereum RPC client.

use crate::{
    error::Error,
    eth,
    format::{self, DataFormat, Formatted},
    method::{self, Arg, Method},
    net,
    normalize::Input,
    subscription::{
        manager::Manager,
        registry::{Registry, SubscriptionKind},
        SubscribeArgs, Subscription,
    },
    transport::Transport,
    types::{BlockSelector, Hydrated, LogFilter, LogFilterBlocks, TransactionRequest},
    web3,
};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

/// Client configuration. Changes apply to calls made after them.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Configuration {
    /// The block used by calls that take an optional block.
    pub default_block: BlockSelector,
    /// The return format used by calls without an explicit format.
    pub default_format: DataFormat,
}

/// An Ethereum RPC client.
#[derive(Clone)]
pub struct Client {
    shared: Arc<Shared>,
}

struct Shared {
    transport: Arc<dyn Transport>,
    config: Arc<RwLock<Configuration>>,
    registry: Registry,
    subscriptions: Arc<Manager>,
}

impl Client {
    /// Creates a new client with the default configuration.
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::with_config(transport, Configuration::default())
    }

    /// Creates a new client with the specified configuration.
    pub fn with_config(transport: impl Transport + 'static, config: Configuration) -> Self {
        Self::with_registry(transport, config, Registry::default())
    }

    /// Creates a new client with the specified configuration and subscription
    /// registry.
    pub fn with_registry(
        transport: impl Transport + 'static,
        config: Configuration,
        registry: Registry,
    ) -> Self {
        let transport = Arc::new(transport) as Arc<dyn Transport>;
        let config = Arc::new(RwLock::new(config));
        let subscriptions = Manager::new(transport.clone(), config.clone());
        Self {
            shared: Arc::new(Shared {
                transport,
                config,
                registry,
                subscriptions,
            }),
        }
    }

    /// Returns a snapshot of the current configuration.
    pub fn configuration(&self) -> Configuration {
        self.shared
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sets the block used by calls without an explicit block.
    pub fn set_default_block(&self, block: impl Into<BlockSelector>) {
        self.shared
            .config
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .default_block = block.into();
    }

    /// Sets the return format used by calls without an explicit format.
    pub fn set_default_format(&self, format: DataFormat) {
        self.shared
            .config
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .default_format = format;
    }

    fn block(&self, block: Option<BlockSelector>) -> BlockSelector {
        block.unwrap_or_else(|| self.configuration().default_block)
    }

    /// Executes a method, converting its result with the requested format or
    /// the configured default.
    pub async fn execute<M>(
        &self,
        method: M,
        args: &[Arg],
        format: Option<DataFormat>,
    ) -> Result<Formatted, Error>
    where
        M: Method,
    {
        let format = format.unwrap_or_else(|| self.configuration().default_format);
        let params = method::encode_params(&method, args)?;
        debug!(method = method.name(), %params, "sending request");
        let result = self.shared.transport.send(method.name(), params).await?;
        Ok(format::convert(
            &Formatted::from(result),
            &method.result(),
            format,
        )?)
    }

    /// Returns the Ethereum protocol version of the node.
    pub async fn get_protocol_version(&self) -> Result<Formatted, Error> {
        self.execute(eth::ProtocolVersion, &[], None).await
    }

    /// Returns `false` or the sync progress of the node.
    pub async fn is_syncing(&self, format: Option<DataFormat>) -> Result<Formatted, Error> {
        self.execute(eth::Syncing, &[], format).await
    }

    /// Returns the coinbase address of the node.
    pub async fn get_coinbase(&self, format: Option<DataFormat>) -> Result<Formatted, Error> {
        self.execute(eth::Coinbase, &[], format).await
    }

    /// Returns whether the node is mining.
    pub async fn is_mining(&self) -> Result<Formatted, Error> {
        self.execute(eth::Mining, &[], None).await
    }

    /// Returns the number of hashes per second the node is mining with.
    pub async fn get_hash_rate(&self, format: Option<DataFormat>) -> Result<Formatted, Error> {
        self.execute(eth::Hashrate, &[], format).await
    }

    /// Returns the current gas price in wei.
    pub async fn get_gas_price(&self, format: Option<DataFormat>) -> Result<Formatted, Error> {
        self.execute(eth::GasPrice, &[], format).await
    }

    /// Returns the accounts owned by the node.
    pub async fn get_accounts(&self, format: Option<DataFormat>) -> Result<Formatted, Error> {
        self.execute(eth::Accounts, &[], format).await
    }

    /// Returns the number of the most recent block.
    pub async fn get_block_number(&self, format: Option<DataFormat>) -> Result<Formatted, Error> {
        self.execute(eth::BlockNumber, &[], format).await
    }

    /// Returns the balance of an account at a block.
    pub async fn get_balance(
        &self,
        address: impl Into<Input>,
        block: Option<BlockSelector>,
        format: Option<DataFormat>,
    ) -> Result<Formatted, Error> {
        let args = [Arg::Value(address.into()), self.block(block).into()];
        self.execute(eth::GetBalance, &args, format).await
    }

    /// Returns the value of a storage slot of an account at a block.
    pub async fn get_storage_at(
        &self,
        address: impl Into<Input>,
        position: impl Into<Input>,
        block: Option<BlockSelector>,
        format: Option<DataFormat>,
    ) -> Result<Formatted, Error> {
        let args = [
            Arg::Value(address.into()),
            Arg::Value(position.into()),
            self.block(block).into(),
        ];
        self.execute(eth::GetStorageAt, &args, format).await
    }

    /// Returns the code of an account at a block.
    pub async fn get_code(
        &self,
        address: impl Into<Input>,
        block: Option<BlockSelector>,
        format: Option<DataFormat>,
    ) -> Result<Formatted, Error> {
        let args = [Arg::Value(address.into()), self.block(block).into()];
        self.execute(eth::GetCode, &args, format).await
    }

    /// Returns a block by hash or number, with full transactions if
    /// `hydrated`.
    pub async fn get_block(
        &self,
        block: Option<BlockSelector>,
        hydrated: impl Into<Hydrated>,
        format: Option<DataFormat>,
    ) -> Result<Formatted, Error> {
        let hydrated: Hydrated = hydrated.into();
        let hydrated = Arg::from(hydrated);
        match self.block(block) {
            BlockSelector::Hash(hash) => {
                self.execute(eth::GetBlockByHash, &[Arg::Value(hash), hydrated], format)
                    .await
            }
            block => {
                self.execute(eth::GetBlockByNumber, &[Arg::Block(block), hydrated], format)
                    .await
            }
        }
    }

    /// Returns the number of transactions in a block by hash or number.
    pub async fn get_block_transaction_count(
        &self,
        block: Option<BlockSelector>,
        format: Option<DataFormat>,
    ) -> Result<Formatted, Error> {
        match self.block(block) {
            BlockSelector::Hash(hash) => {
                self.execute(eth::GetBlockTransactionCountByHash, &[Arg::Value(hash)], format)
                    .await
            }
            block => {
                self.execute(eth::GetBlockTransactionCountByNumber, &[Arg::Block(block)], format)
                    .await
            }
        }
    }

    /// Returns the number of uncles in a block by hash or number.
    pub async fn get_block_uncle_count(
        &self,
        block: Option<BlockSelector>,
        format: Option<DataFormat>,
    ) -> Result<Formatted, Error> {
        match self.block(block) {
            BlockSelector::Hash(hash) => {
                self.execute(eth::GetUncleCountByBlockHash, &[Arg::Value(hash)], format)
                    .await
            }
            block => {
                self.execute(eth::GetUncleCountByBlockNumber, &[Arg::Block(block)], format)
                    .await
            }
        }
    }

    /// Returns an uncle of a block by hash or number and uncle index.
    pub async fn get_uncle(
        &self,
        block: Option<BlockSelector>,
        uncle_index: impl Into<Input>,
        format: Option<DataFormat>,
    ) -> Result<Formatted, Error> {
        let index = Arg::Value(uncle_index.into());
        match self.block(block) {
            BlockSelector::Hash(hash) => {
                self.execute(eth::GetUncleByBlockHashAndIndex, &[Arg::Value(hash), index], format)
                    .await
            }
            block => {
                self.execute(
                    eth::GetUncleByBlockNumberAndIndex,
                    &[Arg::Block(block), index],
                    format,
                )
                .await
            }
        }
    }

    /// Returns a transaction by hash.
    pub async fn get_transaction(
        &self,
        transaction_hash: impl Into<Input>,
        format: Option<DataFormat>,
    ) -> Result<Formatted, Error> {
        let args = [Arg::Value(transaction_hash.into())];
        self.execute(eth::GetTransactionByHash, &args, format).await
    }

    /// Returns the pending transactions of the node.
    pub async fn get_pending_transactions(
        &self,
        format: Option<DataFormat>,
    ) -> Result<Formatted, Error> {
        self.execute(eth::PendingTransactions, &[], format).await
    }

    /// Returns a transaction by block hash or number and index.
    pub async fn get_transaction_from_block(
        &self,
        block: Option<BlockSelector>,
        transaction_index: impl Into<Input>,
        format: Option<DataFormat>,
    ) -> Result<Formatted, Error> {
        let index = Arg::Value(transaction_index.into());
        match self.block(block) {
            BlockSelector::Hash(hash) => {
                let args = [Arg::Value(hash), index];
                self.execute(eth::GetTransactionByBlockHashAndIndex, &args, format)
                    .await
            }
            block => {
                let args = [Arg::Block(block), index];
                self.execute(eth::GetTransactionByBlockNumberAndIndex, &args, format)
                    .await
            }
        }
    }

    /// Returns the receipt of a transaction by hash.
    pub async fn get_transaction_receipt(
        &self,
        transaction_hash: impl Into<Input>,
        format: Option<DataFormat>,
    ) -> Result<Formatted, Error> {
        let args = [Arg::Value(transaction_hash.into())];
        self.execute(eth::GetTransactionReceipt, &args, format)
            .await
    }

    /// Returns the number of transactions sent from an account at a block.
    pub async fn get_transaction_count(
        &self,
        address: impl Into<Input>,
        block: Option<BlockSelector>,
        format: Option<DataFormat>,
    ) -> Result<Formatted, Error> {
        let args = [Arg::Value(address.into()), self.block(block).into()];
        self.execute(eth::GetTransactionCount, &args, format).await
    }

    /// Submits a transaction for the node to sign and returns its hash.
    pub async fn send_transaction(
        &self,
        transaction: TransactionRequest,
        format: Option<DataFormat>,
    ) -> Result<Formatted, Error> {
        self.execute(eth::SendTransaction, &[Arg::Transaction(transaction)], format)
            .await
    }

    /// Submits a signed raw transaction and returns its hash.
    pub async fn send_signed_transaction(
        &self,
        transaction: impl Into<Input>,
        format: Option<DataFormat>,
    ) -> Result<Formatted, Error> {
        let args = [Arg::Value(transaction.into())];
        self.execute(eth::SendRawTransaction, &args, format).await
    }

    /// Signs a message with an account of the node.
    pub async fn sign(
        &self,
        message: impl Into<Input>,
        address: impl Into<Input>,
        format: Option<DataFormat>,
    ) -> Result<Formatted, Error> {
        let args = [Arg::Value(address.into()), Arg::Value(message.into())];
        self.execute(eth::Sign, &args, format).await
    }

    /// Signs a transaction with an account of the node, returning the raw
    /// transaction and its decoded fields.
    pub async fn sign_transaction(
        &self,
        transaction: TransactionRequest,
        format: Option<DataFormat>,
    ) -> Result<Formatted, Error> {
        self.execute(eth::SignTransaction, &[Arg::Transaction(transaction)], format)
            .await
    }

    /// Executes a message call at a block without creating a transaction.
    pub async fn call(
        &self,
        transaction: TransactionRequest,
        block: Option<BlockSelector>,
        format: Option<DataFormat>,
    ) -> Result<Formatted, Error> {
        let args = [Arg::Transaction(transaction), self.block(block).into()];
        self.execute(eth::Call, &args, format).await
    }

    /// Estimates the gas a transaction would use.
    pub async fn estimate_gas(
        &self,
        transaction: TransactionRequest,
        block: Option<BlockSelector>,
        format: Option<DataFormat>,
    ) -> Result<Formatted, Error> {
        let args = [Arg::Transaction(transaction), self.block(block).into()];
        self.execute(eth::EstimateGas, &args, format).await
    }

    /// Returns the logs matching a filter.
    pub async fn get_past_logs(
        &self,
        filter: LogFilter,
        format: Option<DataFormat>,
    ) -> Result<Formatted, Error> {
        self.execute(eth::GetLogs, &[Arg::Filter(filter)], format).await
    }

    /// Returns the proof-of-work package: header hash, seed hash and
    /// boundary condition.
    pub async fn get_work(&self, format: Option<DataFormat>) -> Result<Formatted, Error> {
        self.execute(eth::GetWork, &[], format).await
    }

    /// Submits a proof-of-work solution.
    pub async fn submit_work(
        &self,
        nonce: impl Into<Input>,
        hash: impl Into<Input>,
        digest: impl Into<Input>,
    ) -> Result<Formatted, Error> {
        let args = [
            Arg::Value(nonce.into()),
            Arg::Value(hash.into()),
            Arg::Value(digest.into()),
        ];
        self.execute(eth::SubmitWork, &args, None).await
    }

    /// Requests the accounts of the node's wallet.
    pub async fn request_accounts(&self, format: Option<DataFormat>) -> Result<Formatted, Error> {
        self.execute(eth::RequestAccounts, &[], format).await
    }

    /// Returns the chain ID.
    pub async fn get_chain_id(&self, format: Option<DataFormat>) -> Result<Formatted, Error> {
        self.execute(eth::ChainId, &[], format).await
    }

    /// Returns the network ID.
    pub async fn get_network_id(&self, format: Option<DataFormat>) -> Result<Formatted, Error> {
        self.execute(net::Version, &[], format).await
    }

    /// Returns the client version string of the node.
    pub async fn get_node_info(&self) -> Result<Formatted, Error> {
        self.execute(web3::ClientVersion, &[], None).await
    }

    /// Returns the account and storage proofs of an account at a block.
    pub async fn get_proof(
        &self,
        address: impl Into<Input>,
        storage_keys: impl IntoIterator<Item = impl Into<Input>>,
        block: Option<BlockSelector>,
        format: Option<DataFormat>,
    ) -> Result<Formatted, Error> {
        let args = [
            Arg::Value(address.into()),
            Arg::List(storage_keys.into_iter().map(Into::into).collect()),
            self.block(block).into(),
        ];
        self.execute(eth::GetProof, &args, format).await
    }

    /// Returns the fee history for a range of blocks.
    pub async fn get_fee_history(
        &self,
        block_count: impl Into<Input>,
        newest_block: Option<BlockSelector>,
        reward_percentiles: Vec<f64>,
        format: Option<DataFormat>,
    ) -> Result<Formatted, Error> {
        let args = [
            Arg::Value(block_count.into()),
            self.block(newest_block).into(),
            Arg::Floats(reward_percentiles),
        ];
        self.execute(eth::FeeHistory, &args, format).await
    }

    /// Subscribes to a push channel by name. Log subscriptions with a numeric
    /// starting block also replay the past logs from that block, in the
    /// background.
    pub async fn subscribe(
        &self,
        name: &str,
        args: impl Into<SubscribeArgs>,
    ) -> Result<Subscription, Error> {
        let (options, callback) = args.into().resolve();
        let kind = self.shared.registry.resolve(name)?;
        let subscription = self.shared.subscriptions.subscribe(kind, &options).await?;
        if let Some(callback) = callback {
            subscription.attach(callback);
        }

        let from = options.from_block.as_ref().and_then(BlockSelector::number);
        if let (SubscriptionKind::Logs, Some(from)) = (kind, from) {
            let filter = LogFilter {
                blocks: LogFilterBlocks::Range {
                    from: Some(from.into()),
                    to: None,
                },
                address: options.address,
                topics: options.topics,
            };
            tokio::spawn(replay(self.clone(), subscription.clone(), filter));
        }

        Ok(subscription)
    }

    /// Unsubscribes every live subscription, except `syncing` subscriptions
    /// when `keep_syncing` is set. Returns once every teardown settled, with
    /// the result of each.
    pub async fn clear_subscriptions(
        &self,
        keep_syncing: bool,
    ) -> Vec<(Subscription, Result<(), Error>)> {
        self.shared.subscriptions.clear(keep_syncing).await
    }

    /// Returns the live subscriptions.
    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.shared.subscriptions.subscriptions()
    }
}

/// Emits the past logs matching a filter as data events of a log
/// subscription. Events are dropped if the subscription closed meanwhile.
async fn replay(client: Client, subscription: Subscription, filter: LogFilter) {
    match client.get_past_logs(filter, None).await {
        Ok(logs) => {
            let logs = logs.as_array().unwrap_or_default();
            debug!(id = ?subscription.id(), count = logs.len(), "replaying past logs");
            for log in logs {
                subscription.emit_data(log.clone());
            }
        }
        Err(err) => {
            warn!(id = ?subscription.id(), %err, "failed to replay past logs");
            subscription.emit_error(err);
        }
    }
}
