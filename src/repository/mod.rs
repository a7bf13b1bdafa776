pub mod repository_error;
pub mod quote_repo;
pub mod user_repo;
pub mod policy_repo;
pub mod in_memory;
