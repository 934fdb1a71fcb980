pub mod two_factor_session;

pub use two_factor_session::*;
