pub mod auth;
pub mod social;
pub mod tenant;
pub mod token;

pub use tenant::TenantId;
