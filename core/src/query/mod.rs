pub mod client;
pub mod nrql;
pub mod response;

pub use client::HttpQuerySource;
pub use nrql::{InteractionQuery, NrqlRequest, QueryWindow};
pub use response::NrqlResponse;
