use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::Utc;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::dto::listing_dto::{PolicyListItem, RecordPaymentRequest, TransactionListItem};
use crate::model::policy::{Payment, Policy};
use crate::model::quote::StepStatus;
use crate::repository::policy_repo::{PolicyRepository, POLICY_NUMBER_FIELD, POLICY_QUOTE_FIELD};
use crate::repository::quote_repo::{QuoteFilter, QuoteRepository};
use crate::repository::repository_error::RepositoryError;
use crate::util::email::{spawn_notification, EmailService, EmailTemplate};
use crate::util::error::{ServiceError, ValidationError};
use crate::util::identifier::NumberGenerator;
use crate::util::retry::{retry_on_collision, RetryError, MAX_NUMBER_ATTEMPTS};

#[async_trait]
pub trait PolicyService: Send + Sync {
    /// Returns the policy number for the quote, issuing one on first call.
    async fn convert_to_policy(&self, quote_number: &str, force_convert: bool) -> Result<String, ServiceError>;
    async fn record_payment(&self, request: RecordPaymentRequest) -> Result<Payment, ServiceError>;
    async fn list_policies(&self) -> Result<Vec<PolicyListItem>, ServiceError>;
    async fn list_transactions(&self) -> Result<Vec<TransactionListItem>, ServiceError>;
}

pub struct PolicyServiceImpl {
    pub quote_repo: Arc<dyn QuoteRepository>,
    pub policy_repo: Arc<dyn PolicyRepository>,
    pub numbers: Arc<dyn NumberGenerator>,
    pub email_service: Arc<dyn EmailService>,
}

impl PolicyServiceImpl {
    pub fn new(
        quote_repo: Arc<dyn QuoteRepository>,
        policy_repo: Arc<dyn PolicyRepository>,
        numbers: Arc<dyn NumberGenerator>,
        email_service: Arc<dyn EmailService>,
    ) -> Self {
        PolicyServiceImpl { quote_repo, policy_repo, numbers, email_service }
    }

    /// Number of the policy another request issued first.
    async fn winner_of_race(&self, quote_id: ObjectId) -> Result<String, ServiceError> {
        match self.policy_repo.find_by_quote(quote_id).await? {
            Some(policy) => {
                info!(policy_number = %policy.policy_number, "Quote was converted concurrently");
                Ok(policy.policy_number)
            }
            None => Err(ServiceError::integrity(format!(
                "Policy for quote {} rejected as duplicate but not found",
                quote_id
            ))),
        }
    }
}

#[async_trait]
impl PolicyService for PolicyServiceImpl {
    #[instrument(skip(self))]
    async fn convert_to_policy(&self, quote_number: &str, force_convert: bool) -> Result<String, ServiceError> {
        let aggregate = self
            .quote_repo
            .find_by_number(quote_number)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Quote {} not found", quote_number)))?;

        if let Some(policy) = &aggregate.policy {
            info!(policy_number = %policy.policy_number, "Quote already converted");
            return Ok(policy.policy_number.clone());
        }
        if aggregate.quote.status != StepStatus::Complete && !force_convert {
            return Err(ServiceError::NotEligible(format!(
                "Quote {} is at {:?}, only COMPLETE quotes can be converted",
                quote_number, aggregate.quote.status
            )));
        }
        let quote_id = aggregate
            .quote
            .id
            .ok_or_else(|| ServiceError::integrity(format!("Quote {} has no id", quote_number)))?;

        let repo = &self.policy_repo;
        let result = retry_on_collision(
            MAX_NUMBER_ATTEMPTS,
            || self.numbers.policy_number(),
            |policy_number| {
                let policy = Policy { id: None, quote_id, policy_number, created_at: Utc::now() };
                async move { repo.create_policy(policy).await }
            },
            |e: &RepositoryError| e.is_duplicate_on(POLICY_NUMBER_FIELD),
        )
        .await;

        let policy_number = match result {
            Ok(policy) => policy.policy_number,
            Err(RetryError::Failed(e)) if e.is_duplicate_on(POLICY_QUOTE_FIELD) => {
                return self.winner_of_race(quote_id).await;
            }
            Err(RetryError::Failed(e)) => return Err(e.into()),
            Err(RetryError::Exhausted { attempts }) => {
                return Err(ServiceError::ExhaustedRetries { field: POLICY_NUMBER_FIELD, attempts });
            }
        };

        info!(policy_number = %policy_number, forced = force_convert, "Policy issued");
        spawn_notification(
            self.email_service.clone(),
            aggregate.quote.email.clone(),
            EmailTemplate::PolicyIssued {
                quote_number: quote_number.to_string(),
                policy_number: policy_number.clone(),
            },
        );
        Ok(policy_number)
    }

    #[instrument(skip(self, request), fields(quote_number = %request.quote_number, amount = request.amount))]
    async fn record_payment(&self, request: RecordPaymentRequest) -> Result<Payment, ServiceError> {
        request
            .validate()
            .map_err(|e| ValidationError::InvalidInput(e.to_string()))?;
        let aggregate = self
            .quote_repo
            .find_by_number(&request.quote_number)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Quote {} not found", request.quote_number)))?;
        let quote_id = aggregate
            .quote
            .id
            .ok_or_else(|| ServiceError::integrity("Quote has no id"))?;

        let policy_id = aggregate.policy.as_ref().and_then(|p| p.id);
        if policy_id.is_none() {
            warn!("Recording payment against an unconverted quote");
        }
        let payment = Payment {
            id: None,
            policy_id,
            quote_id,
            amount: request.amount,
            method: request.method,
            status: request.status,
            created_at: Utc::now(),
        };
        Ok(self.policy_repo.add_payment(payment).await?)
    }

    #[instrument(skip(self))]
    async fn list_policies(&self) -> Result<Vec<PolicyListItem>, ServiceError> {
        let quotes = self.quote_repo.list(QuoteFilter::All).await?;
        let mut policies: Vec<PolicyListItem> = quotes.iter().filter_map(PolicyListItem::from_aggregate).collect();
        policies.sort_by_key(|p| Reverse(p.event_date));
        Ok(policies)
    }

    #[instrument(skip(self))]
    async fn list_transactions(&self) -> Result<Vec<TransactionListItem>, ServiceError> {
        let quotes = self.quote_repo.list(QuoteFilter::All).await?;
        let numbers: HashMap<ObjectId, (String, Option<String>)> = quotes
            .into_iter()
            .filter_map(|a| {
                let policy_number = a.policy.map(|p| p.policy_number);
                a.quote.id.map(|id| (id, (a.quote.quote_number, policy_number)))
            })
            .collect();

        let payments = self.policy_repo.list_payments().await?;
        Ok(payments
            .iter()
            .map(|payment| match numbers.get(&payment.quote_id) {
                Some((quote_number, policy_number)) => {
                    TransactionListItem::new(payment, Some(quote_number.as_str()), policy_number.as_deref())
                }
                None => TransactionListItem::new(payment, None, None),
            })
            .collect())
    }
}
