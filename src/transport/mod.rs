pub mod client;
pub mod next_data;
pub mod retry;
pub mod session;

pub use client::{HttpClient, ReqwestClient};
pub use next_data::next_data_in;
pub use retry::{Pacer, RetryPolicy, ThreadPacer};
pub use session::{BuildId, Transport};
