//! Quote, policy and transaction numbering
//!
//! Quote numbers look like `QI-19102026-483920`. They are random and only
//! unique once the storage layer accepts them; callers retry on collision.

use chrono::{Local, NaiveDate};
use rand::Rng;

pub const QUOTE_PREFIX: &str = "QI-";
pub const POLICY_REFERENCE_PREFIX: &str = "POC-";
pub const POLICY_NUMBER_PREFIX: &str = "WI-POL-";

/// Source of fresh candidate numbers. Injected so tests can force collisions.
pub trait NumberGenerator: Send + Sync {
    fn quote_number(&self) -> String;
    fn policy_number(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RandomNumberGenerator;

impl NumberGenerator for RandomNumberGenerator {
    fn quote_number(&self) -> String {
        generate_quote_number()
    }

    fn policy_number(&self) -> String {
        mint_policy_number()
    }
}

fn random_six_digits() -> u32 {
    rand::thread_rng().gen_range(100_000..=999_999)
}

pub fn generate_quote_number() -> String {
    quote_number_for(Local::now().date_naive(), random_six_digits())
}

pub fn quote_number_for(date: NaiveDate, suffix: u32) -> String {
    format!("{}{}-{}", QUOTE_PREFIX, date.format("%d%m%Y"), suffix)
}

pub fn mint_policy_number() -> String {
    format!("{}{}", POLICY_NUMBER_PREFIX, random_six_digits())
}

/// Listing reference for a converted quote.
pub fn derive_policy_number(quote_number: &str) -> String {
    format!("{}{}", POLICY_REFERENCE_PREFIX, quote_number)
}

pub fn derive_transaction_id(quote_number: Option<&str>) -> String {
    match quote_number {
        Some(number) if number.starts_with('Q') => format!("T{}", &number[1..]),
        Some(number) => number.to_string(),
        None => "N/A".to_string(),
    }
}

/// Older numbering schemes a stored quote may still carry.
pub fn legacy_quote_number(quote_number: &str) -> Option<String> {
    if let Some(rest) = quote_number.strip_prefix("PI-") {
        Some(format!("QI-{}", rest))
    } else {
        quote_number
            .strip_prefix("WI-")
            .map(|rest| format!("PI-{}", rest))
    }
}
