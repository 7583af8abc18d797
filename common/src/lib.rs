pub mod config;
pub mod jwt;
pub mod models;
pub mod utils;

pub use self::config::*;
pub use self::jwt::inspect_token;
pub use self::models::token::TokenStatus;
pub use self::utils::*;
