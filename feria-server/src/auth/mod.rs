//! 认证模块
//!
//! JWT 令牌、Argon2 密码哈希、认证中间件

pub mod jwt;
pub mod middleware;
pub mod password;

pub use jwt::{Claims, CurrentAdmin, JwtConfig, JwtError, JwtService};
pub use middleware::require_auth;
