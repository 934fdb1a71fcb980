//! 사용자 엔티티 모듈
//!
//! ```rust,ignore
//! use crate::domain::entities::users::User;
//!
//! let user = User::new_local(tenant, "user@example.com".into(), hash, scopes, groups, now);
//! assert!(!user.has_two_factor_enabled());
//! ```

pub mod user;

pub use user::*;
