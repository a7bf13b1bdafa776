pub mod quote;
pub mod event;
pub mod policy_holder;
pub mod user;
pub mod policy;
