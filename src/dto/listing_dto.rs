//! Read-only rows for the back-office lists.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::policy::{Payment, PaymentStatus};
use crate::model::quote::QuoteAggregate;
use crate::util::identifier::{derive_policy_number, derive_transaction_id};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyListItem {
    /// Number minted at conversion.
    pub policy_number: String,
    /// `POC-` reference shown in listings.
    pub policy_reference: String,
    pub quote_number: String,
    pub policy_holder: Option<String>,
    pub email: String,
    pub event_date: Option<NaiveDate>,
    pub total_premium: Option<i64>,
    pub issued_at: DateTime<Utc>,
}

impl PolicyListItem {
    /// None when the quote has not been converted.
    pub fn from_aggregate(aggregate: &QuoteAggregate) -> Option<Self> {
        let policy = aggregate.policy.as_ref()?;
        Some(PolicyListItem {
            policy_number: policy.policy_number.clone(),
            policy_reference: derive_policy_number(&aggregate.quote.quote_number),
            quote_number: aggregate.quote.quote_number.clone(),
            policy_holder: aggregate.policy_holder.as_ref().map(|h| h.full_name()),
            email: aggregate.quote.email.clone(),
            event_date: aggregate.event.as_ref().map(|e| e.event_date),
            total_premium: aggregate.quote.total_premium,
            issued_at: policy.created_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionListItem {
    pub transaction_id: String,
    pub quote_number: Option<String>,
    pub policy_number: Option<String>,
    pub amount: i64,
    pub method: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

impl TransactionListItem {
    pub fn new(payment: &Payment, quote_number: Option<&str>, policy_number: Option<&str>) -> Self {
        TransactionListItem {
            transaction_id: derive_transaction_id(quote_number),
            quote_number: quote_number.map(str::to_string),
            policy_number: policy_number.map(str::to_string),
            amount: payment.amount,
            method: payment.method.clone(),
            status: payment.status,
            created_at: payment.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyListResponse {
    pub policies: Vec<PolicyListItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionListResponse {
    pub transactions: Vec<TransactionListItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertRequest {
    pub quote_number: Option<String>,
    #[serde(default)]
    pub force_convert: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub policy_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, validator::Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentRequest {
    #[validate(length(min = 1))]
    pub quote_number: String,
    #[validate(range(min = 1))]
    pub amount: i64,
    #[validate(length(min = 2, max = 50))]
    pub method: String,
    #[serde(default)]
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub payment: Payment,
}
