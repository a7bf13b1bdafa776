use crate::config::mongo_conf::MongoConfig;
use crate::model::policy::{Payment, Policy};
use crate::repository::quote_repo::create_unique_index;
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use futures::stream::TryStreamExt;
use mongodb::options::FindOptions;
use mongodb::{Client, Collection};
use tracing::{error, info};

pub const POLICY_NUMBER_FIELD: &str = "policyNumber";
pub const POLICY_QUOTE_FIELD: &str = "quoteId";

/// Writes issued policies and their payments. Nothing else creates policies.
#[async_trait]
pub trait PolicyRepository: Send + Sync {
    /// Fails with a duplicate key on `policyNumber` for a taken number and on
    /// `quoteId` when the quote was already converted.
    async fn create_policy(&self, policy: Policy) -> RepositoryResult<Policy>;
    async fn find_by_quote(&self, quote_id: ObjectId) -> RepositoryResult<Option<Policy>>;
    async fn add_payment(&self, payment: Payment) -> RepositoryResult<Payment>;
    /// Newest first.
    async fn list_payments(&self) -> RepositoryResult<Vec<Payment>>;
}

pub struct MongoPolicyRepository {
    policies: Collection<Policy>,
    payments: Collection<Payment>,
}

impl MongoPolicyRepository {
    pub fn new(client: &Client, config: &MongoConfig) -> Self {
        let db = client.database(&config.database);
        MongoPolicyRepository {
            policies: db.collection("policies"),
            payments: db.collection("payments"),
        }
    }

    pub async fn ensure_indexes(&self) -> RepositoryResult<()> {
        create_unique_index(&self.policies, POLICY_NUMBER_FIELD).await?;
        create_unique_index(&self.policies, POLICY_QUOTE_FIELD).await
    }
}

#[async_trait]
impl PolicyRepository for MongoPolicyRepository {
    #[tracing::instrument(skip(self, policy), fields(policy_number = %policy.policy_number))]
    async fn create_policy(&self, mut policy: Policy) -> RepositoryResult<Policy> {
        policy.id = Some(ObjectId::new());
        match self.policies.insert_one(&policy, None).await {
            Ok(_) => {
                info!("Policy created successfully");
                Ok(policy)
            }
            Err(e) => {
                error!("Failed to create policy: {}", e);
                Err(RepositoryError::from(e))
            }
        }
    }

    async fn find_by_quote(&self, quote_id: ObjectId) -> RepositoryResult<Option<Policy>> {
        Ok(self.policies.find_one(doc! { POLICY_QUOTE_FIELD: quote_id }, None).await?)
    }

    #[tracing::instrument(skip(self, payment), fields(quote_id = %payment.quote_id, amount = payment.amount))]
    async fn add_payment(&self, mut payment: Payment) -> RepositoryResult<Payment> {
        payment.id = Some(ObjectId::new());
        self.payments.insert_one(&payment, None).await?;
        info!("Payment recorded");
        Ok(payment)
    }

    async fn list_payments(&self) -> RepositoryResult<Vec<Payment>> {
        let options = FindOptions::builder().sort(doc! { "_id": -1 }).build();
        let payments = self.payments.find(None, options).await?.try_collect().await?;
        Ok(payments)
    }
}
