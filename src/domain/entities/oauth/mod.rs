pub mod authorization_code;
pub mod client;
pub mod refresh_token;

pub use authorization_code::*;
pub use client::*;
pub use refresh_token::*;
