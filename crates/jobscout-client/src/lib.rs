pub mod auth;
pub mod exchange;
mod http;
pub mod registry;

pub use auth::M2mAuthenticator;
pub use exchange::{REQUESTED_FIELDS, ReqwestExchangeClient};
pub use registry::StaticOracleSource;
