mod mock_client;
pub use mock_client::MockLedgerClient;

mod rpc_client;
pub use rpc_client::RpcLedgerClient;
