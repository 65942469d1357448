//! A typed Ethereum RPC client.
//!
//! Every call normalizes its arguments into the canonical wire encoding,
//! sends a single request through a [`Transport`], and converts the result
//! into the caller's requested [`DataFormat`]. Push subscriptions are managed
//! by the [`Client`] as well, including replay of past logs.
//!
//! Documentation for the APIs can be found here:
//! <https://ethereum.github.io/execution-apis/>

pub mod client;
mod debug;
pub mod error;
pub mod format;
pub mod hex;
#[cfg(feature = "http")]
pub mod http;
pub mod jsonrpc;
#[macro_use]
pub mod method;
pub mod normalize;
pub mod schema;
pub mod subscription;
pub mod transport;
pub mod types;

pub use self::{
    client::{Client, Configuration},
    error::Error,
    format::{ByteFormat, DataFormat, Formatted, NumberFormat},
    normalize::Input,
    subscription::{SubscribeArgs, Subscription, SubscriptionOptions},
    transport::Transport,
    types::{BlockSelector, BlockTag},
};

module! {
    /// The `eth` namespace.
    pub mod eth {
        /// Returns the current Ethereum protocol version.
        pub struct ProtocolVersion as "eth_protocolVersion"
            [] => ANY;

        /// Returns an object with data about the sync status or false.
        pub struct Syncing as "eth_syncing"
            [] => SYNCING;

        /// Returns the client coinbase address.
        pub struct Coinbase as "eth_coinbase"
            [] => ADDRESS;

        /// Returns whether the client is actively mining new blocks.
        pub struct Mining as "eth_mining"
            [] => ANY;

        /// Returns the number of hashes per second that the node is mining
        /// with.
        pub struct Hashrate as "eth_hashrate"
            [] => QUANTITY;

        /// Returns the current price per gas in wei.
        pub struct GasPrice as "eth_gasPrice"
            [] => QUANTITY;

        /// Returns a list of addresses owned by client.
        pub struct Accounts as "eth_accounts"
            [] => ADDRESSES;

        /// Returns the number of most recent block.
        pub struct BlockNumber as "eth_blockNumber"
            [] => QUANTITY;

        /// Returns the balance of the account of given address.
        pub struct GetBalance as "eth_getBalance"
            [Address, Block] => QUANTITY;

        /// Returns the value from a storage position at a given address.
        pub struct GetStorageAt as "eth_getStorageAt"
            [Address, Quantity, Block] => BYTES;

        /// Returns code at a given address.
        pub struct GetCode as "eth_getCode"
            [Address, Block] => BYTES;

        /// Returns information about a block by hash.
        pub struct GetBlockByHash as "eth_getBlockByHash"
            [Hash, Hydrated] => BLOCK;

        /// Returns information about a block by number.
        pub struct GetBlockByNumber as "eth_getBlockByNumber"
            [Block, Hydrated] => BLOCK;

        /// Returns the number of transactions in a block from a block matching
        /// the given block hash.
        pub struct GetBlockTransactionCountByHash as "eth_getBlockTransactionCountByHash"
            [Hash] => QUANTITY;

        /// Returns the number of transactions in a block matching the given
        /// block number.
        pub struct GetBlockTransactionCountByNumber as "eth_getBlockTransactionCountByNumber"
            [Block] => QUANTITY;

        /// Returns the number of uncles in a block from a block matching the
        /// given block hash.
        pub struct GetUncleCountByBlockHash as "eth_getUncleCountByBlockHash"
            [Hash] => QUANTITY;

        /// Returns the number of uncles in a block from a block matching the
        /// given block number.
        pub struct GetUncleCountByBlockNumber as "eth_getUncleCountByBlockNumber"
            [Block] => QUANTITY;

        /// Returns information about an uncle of a block by hash and uncle
        /// index position.
        pub struct GetUncleByBlockHashAndIndex as "eth_getUncleByBlockHashAndIndex"
            [Hash, Quantity] => BLOCK;

        /// Returns information about an uncle of a block by number and uncle
        /// index position.
        pub struct GetUncleByBlockNumberAndIndex as "eth_getUncleByBlockNumberAndIndex"
            [Block, Quantity] => BLOCK;

        /// Returns the information about a transaction requested by transaction
        /// hash.
        pub struct GetTransactionByHash as "eth_getTransactionByHash"
            [Hash] => TRANSACTION;

        /// Returns the transactions in the transaction pool.
        pub struct PendingTransactions as "eth_pendingTransactions"
            [] => TRANSACTIONS;

        /// Returns information about a transaction by block hash and
        /// transaction index position.
        pub struct GetTransactionByBlockHashAndIndex as "eth_getTransactionByBlockHashAndIndex"
            [Hash, Quantity] => TRANSACTION;

        /// Returns information about a transaction by block number and
        /// transaction index position.
        pub struct GetTransactionByBlockNumberAndIndex as "eth_getTransactionByBlockNumberAndIndex"
            [Block, Quantity] => TRANSACTION;

        /// Returns the receipt of a transaction by transaction hash.
        pub struct GetTransactionReceipt as "eth_getTransactionReceipt"
            [Hash] => RECEIPT;

        /// Returns the nonce of an account in the state.
        ///
        /// NOTE: The name eth_getTransactionCount reflects the historical fact
        /// that an account's nonce and sent transaction count were the same.
        pub struct GetTransactionCount as "eth_getTransactionCount"
            [Address, Block] => QUANTITY;

        /// Signs and submits a transaction.
        pub struct SendTransaction as "eth_sendTransaction"
            [Transaction] => HASH;

        /// Submits a raw transaction.
        pub struct SendRawTransaction as "eth_sendRawTransaction"
            [Bytes] => HASH;

        /// Returns an EIP-191 signature over the provided data.
        pub struct Sign as "eth_sign"
            [Address, Bytes] => BYTES;

        /// Signs a transaction with the specified account.
        pub struct SignTransaction as "eth_signTransaction"
            [Transaction] => SIGNED_TRANSACTION;

        /// Executes a new message call immediately without creating a
        /// transaction on the block chain.
        pub struct Call as "eth_call"
            [Transaction, Block] => BYTES;

        /// Generates and returns an estimate of how much gas is necessary to
        /// allow the transaction to complete.
        pub struct EstimateGas as "eth_estimateGas"
            [Transaction, Block] => QUANTITY;

        /// Returns an array of all logs matching the specified filter.
        pub struct GetLogs as "eth_getLogs"
            [Filter] => LOGS;

        /// Returns the hash of the current block, the seed hash, and the
        /// boundary condition to be met.
        pub struct GetWork as "eth_getWork"
            [] => WORK;

        /// Submits a proof-of-work solution.
        pub struct SubmitWork as "eth_submitWork"
            [Bytes, Hash, Hash] => ANY;

        /// Requests access to the accounts of the wallet.
        pub struct RequestAccounts as "eth_requestAccounts"
            [] => ADDRESSES;

        /// Returns the chain ID of the current network.
        pub struct ChainId as "eth_chainId"
            [] => QUANTITY;

        /// Returns the merkle proof for a given account and optionally some
        /// storage keys.
        pub struct GetProof as "eth_getProof"
            [Address, Hashes, Block] => ACCOUNT_PROOF;

        /// Returns transaction base fee per gas and effective priority fee per
        /// gas for the requested/supported block range.
        pub struct FeeHistory as "eth_feeHistory"
            [Quantity, Block, Percentiles] => FEE_HISTORY;
    }
}

module! {
    /// The `net` namespace.
    pub mod net {
        /// Returns the current network ID. This is usually equivalent to the
        /// chainID, but may differ from it for some legacy networks or special
        /// testnets.
        pub struct Version as "net_version"
            [] => QUANTITY;
    }
}

module! {
    /// The `web3` namespace.
    pub mod web3 {
        /// Returns the current client version.
        pub struct ClientVersion as "web3_clientVersion"
            [] => ANY;
    }
}
