//! Various ledger client implementations.

pub use self::{
    http::QueryClient,
    mock::{MockEthereum, MockTx},
};

mod http;
mod mock;
