//! JSON-RPC 2.0 client core: wire types, transport, correlation, errors.

pub mod client;
pub mod error;
pub mod protocol;
pub mod transport;

pub use client::{NotificationHandler, RpcClient};
pub use error::CallError;
pub use protocol::{Incoming, RequestId, RpcRequest, RpcResponse};
pub use transport::{HttpTransport, Transport, TransportError};
