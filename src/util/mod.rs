pub mod email;
pub mod logger;
pub mod error;
pub mod premium;
pub mod identifier;
pub mod retry;
