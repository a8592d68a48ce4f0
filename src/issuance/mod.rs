pub mod challenge;
pub mod csr;
pub mod flow;
pub mod http;
pub mod retry;
pub mod workflow;

pub use flow::{FlowError, IssuanceOptions, IssuanceOutcome, IssuanceStep, run_issuance};
pub use http::ZeroSslClient;
pub use retry::PollPolicy;
