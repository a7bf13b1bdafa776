pub mod quote_handler;
pub mod policy_handler;
