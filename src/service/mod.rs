pub mod quote_service;
pub mod policy_service;
