pub mod quote_router;
pub mod policy_router;
