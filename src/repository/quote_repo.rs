use crate::config::mongo_conf::MongoConfig;
use crate::model::event::{Event, Venue};
use crate::model::policy::{Payment, Policy};
use crate::model::policy_holder::PolicyHolder;
use crate::model::quote::{Quote, QuoteAggregate, StepStatus};
use crate::model::user::User;
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use futures::stream::TryStreamExt;
use mongodb::options::{FindOneOptions, FindOptions, IndexOptions, ReplaceOptions};
use mongodb::{Client, ClientSession, Collection, IndexModel};
use serde::Serialize;
use std::cmp::Reverse;
use tracing::{error, info, warn};

/// Field carrying the unique quote number.
pub const QUOTE_NUMBER_FIELD: &str = "quoteNumber";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteFilter {
    All,
    /// Completed quotes, the back-office "policies" view.
    CompletedOnly,
}

#[async_trait]
pub trait QuoteRepository: Send + Sync {
    /// Inserts the quote and any event, venue and policyholder it carries.
    /// Fails with a duplicate key on `quoteNumber` when the number is taken.
    async fn create(&self, aggregate: QuoteAggregate) -> RepositoryResult<QuoteAggregate>;
    async fn find_by_number(&self, quote_number: &str) -> RepositoryResult<Option<QuoteAggregate>>;
    async fn find_by_id(&self, id: ObjectId) -> RepositoryResult<Option<QuoteAggregate>>;
    async fn find_latest_by_email(&self, email: &str) -> RepositoryResult<Option<QuoteAggregate>>;
    /// Rewrites the quote row and upserts its event, venue and policyholder.
    async fn save(&self, aggregate: QuoteAggregate) -> RepositoryResult<QuoteAggregate>;
    async fn list(&self, filter: QuoteFilter) -> RepositoryResult<Vec<QuoteAggregate>>;
    /// Removes the quote and everything owned by it, dependents first.
    async fn delete_cascade(&self, quote_id: ObjectId) -> RepositoryResult<()>;
}

/// Orders a listing: newest first, or by event date for completed quotes.
pub fn sort_for_listing(filter: QuoteFilter, quotes: &mut [QuoteAggregate]) {
    match filter {
        QuoteFilter::All => quotes.sort_by_key(|q| Reverse(q.quote.created_at)),
        QuoteFilter::CompletedOnly => {
            quotes.sort_by_key(|q| Reverse(q.event.as_ref().map(|e| e.event_date)))
        }
    }
}

pub(crate) async fn create_unique_index<T: Send + Sync>(
    collection: &Collection<T>,
    field: &str,
) -> RepositoryResult<()> {
    let model = IndexModel::builder()
        .keys(doc! { field: 1 })
        .options(IndexOptions::builder().unique(true).build())
        .build();
    collection.create_index(model, None).await?;
    info!(collection = %collection.name(), field, "Unique index ensured");
    Ok(())
}

async fn upsert_with_session<T: Serialize + Send + Sync>(
    collection: &Collection<T>,
    id: ObjectId,
    value: &T,
    session: &mut ClientSession,
) -> RepositoryResult<()> {
    let options = ReplaceOptions::builder().upsert(true).build();
    collection
        .replace_one_with_session(doc! { "_id": id }, value, options, session)
        .await?;
    Ok(())
}

async fn abort(session: &mut ClientSession) {
    if let Err(e) = session.abort_transaction().await {
        warn!("Failed to abort transaction: {}", e);
    }
}

pub struct MongoQuoteRepository {
    client: Client,
    quotes: Collection<Quote>,
    events: Collection<Event>,
    venues: Collection<Venue>,
    policy_holders: Collection<PolicyHolder>,
    policies: Collection<Policy>,
    payments: Collection<Payment>,
    users: Collection<User>,
}

impl MongoQuoteRepository {
    pub fn new(client: Client, config: &MongoConfig) -> Self {
        let db = client.database(&config.database);
        MongoQuoteRepository {
            quotes: db.collection("quotes"),
            events: db.collection("events"),
            venues: db.collection("venues"),
            policy_holders: db.collection("policy_holders"),
            policies: db.collection("policies"),
            payments: db.collection("payments"),
            users: db.collection("users"),
            client,
        }
    }

    pub async fn ensure_indexes(&self) -> RepositoryResult<()> {
        create_unique_index(&self.quotes, QUOTE_NUMBER_FIELD).await?;
        create_unique_index(&self.events, "quoteId").await?;
        create_unique_index(&self.venues, "eventId").await?;
        create_unique_index(&self.policy_holders, "quoteId").await?;
        Ok(())
    }

    async fn find_payments(&self, quote_id: ObjectId) -> Result<Vec<Payment>, mongodb::error::Error> {
        let options = FindOptions::builder().sort(doc! { "_id": -1 }).build();
        let cursor = self.payments.find(doc! { "quoteId": quote_id }, options).await?;
        cursor.try_collect().await
    }

    /// Fetches every relation of a stored quote.
    async fn load(&self, quote: Quote) -> RepositoryResult<QuoteAggregate> {
        let quote_id = quote
            .id
            .ok_or_else(|| RepositoryError::database("Stored quote has no _id"))?;
        let (user, event, policy_holder, policy, payments) = tokio::try_join!(
            self.users.find_one(doc! { "_id": quote.user_id }, None),
            self.events.find_one(doc! { "quoteId": quote_id }, None),
            self.policy_holders.find_one(doc! { "quoteId": quote_id }, None),
            self.policies.find_one(doc! { "quoteId": quote_id }, None),
            self.find_payments(quote_id),
        )?;
        let venue = match event.as_ref().and_then(|e| e.id) {
            Some(event_id) => self.venues.find_one(doc! { "eventId": event_id }, None).await?,
            None => None,
        };
        Ok(QuoteAggregate {
            quote,
            user,
            event,
            venue,
            policy_holder,
            policy,
            payments,
        })
    }

    async fn load_all(&self, quotes: Vec<Quote>) -> RepositoryResult<Vec<QuoteAggregate>> {
        let mut aggregates = Vec::with_capacity(quotes.len());
        for quote in quotes {
            aggregates.push(self.load(quote).await?);
        }
        Ok(aggregates)
    }

    async fn insert_parts(
        &self,
        session: &mut ClientSession,
        aggregate: &mut QuoteAggregate,
    ) -> RepositoryResult<()> {
        let quote_id = *aggregate.quote.id.get_or_insert_with(ObjectId::new);
        self.quotes
            .insert_one_with_session(&aggregate.quote, None, session)
            .await?;
        self.write_parts(session, quote_id, aggregate).await
    }

    async fn replace_parts(
        &self,
        session: &mut ClientSession,
        aggregate: &mut QuoteAggregate,
    ) -> RepositoryResult<()> {
        let quote_id = aggregate
            .quote
            .id
            .ok_or_else(|| RepositoryError::validation("Cannot save a quote without an id"))?;
        let result = self
            .quotes
            .replace_one_with_session(doc! { "_id": quote_id }, &aggregate.quote, None, session)
            .await?;
        if result.matched_count == 0 {
            return Err(RepositoryError::not_found(format!(
                "No quote found to update for ID: {}",
                quote_id
            )));
        }
        self.write_parts(session, quote_id, aggregate).await
    }

    /// Upserts event, venue and policyholder, assigning ids to new rows.
    async fn write_parts(
        &self,
        session: &mut ClientSession,
        quote_id: ObjectId,
        aggregate: &mut QuoteAggregate,
    ) -> RepositoryResult<()> {
        if let Some(event) = aggregate.event.as_mut() {
            event.quote_id = quote_id;
            let event_id = *event.id.get_or_insert_with(ObjectId::new);
            upsert_with_session(&self.events, event_id, event, session).await?;

            if let Some(venue) = aggregate.venue.as_mut() {
                venue.event_id = Some(event_id);
                let venue_id = *venue.id.get_or_insert_with(ObjectId::new);
                upsert_with_session(&self.venues, venue_id, venue, session).await?;
            }
        }
        if let Some(holder) = aggregate.policy_holder.as_mut() {
            holder.quote_id = Some(quote_id);
            let holder_id = *holder.id.get_or_insert_with(ObjectId::new);
            upsert_with_session(&self.policy_holders, holder_id, holder, session).await?;
        }
        Ok(())
    }

    async fn delete_parts(&self, session: &mut ClientSession, quote_id: ObjectId) -> RepositoryResult<()> {
        let event = self
            .events
            .find_one_with_session(doc! { "quoteId": quote_id }, None, session)
            .await?;
        let policy = self
            .policies
            .find_one_with_session(doc! { "quoteId": quote_id }, None, session)
            .await?;

        // Payments hang off the policy and the venue off the event, so they go first.
        if let Some(policy_id) = policy.as_ref().and_then(|p| p.id) {
            self.payments
                .delete_many_with_session(doc! { "policyId": policy_id }, None, session)
                .await?;
        }
        self.payments
            .delete_many_with_session(doc! { "quoteId": quote_id }, None, session)
            .await?;
        if let Some(event_id) = event.as_ref().and_then(|e| e.id) {
            self.venues
                .delete_many_with_session(doc! { "eventId": event_id }, None, session)
                .await?;
        }

        self.policies
            .delete_many_with_session(doc! { "quoteId": quote_id }, None, session)
            .await?;
        self.events
            .delete_many_with_session(doc! { "quoteId": quote_id }, None, session)
            .await?;
        self.policy_holders
            .delete_many_with_session(doc! { "quoteId": quote_id }, None, session)
            .await?;

        let result = self
            .quotes
            .delete_one_with_session(doc! { "_id": quote_id }, None, session)
            .await?;
        if result.deleted_count == 0 {
            return Err(RepositoryError::not_found(format!(
                "No quote found to delete for ID: {}",
                quote_id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl QuoteRepository for MongoQuoteRepository {
    #[tracing::instrument(skip(self, aggregate), fields(quote_number = %aggregate.quote.quote_number))]
    async fn create(&self, aggregate: QuoteAggregate) -> RepositoryResult<QuoteAggregate> {
        info!("Creating new quote");
        let mut aggregate = aggregate;
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;
        match self.insert_parts(&mut session, &mut aggregate).await {
            Ok(()) => {
                session.commit_transaction().await?;
                info!("Quote created successfully");
                Ok(aggregate)
            }
            Err(e) => {
                abort(&mut session).await;
                error!("Failed to create quote: {}", e);
                Err(e)
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_number(&self, quote_number: &str) -> RepositoryResult<Option<QuoteAggregate>> {
        match self.quotes.find_one(doc! { QUOTE_NUMBER_FIELD: quote_number }, None).await? {
            Some(quote) => Ok(Some(self.load(quote).await?)),
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    async fn find_by_id(&self, id: ObjectId) -> RepositoryResult<Option<QuoteAggregate>> {
        match self.quotes.find_one(doc! { "_id": id }, None).await? {
            Some(quote) => Ok(Some(self.load(quote).await?)),
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn find_latest_by_email(&self, email: &str) -> RepositoryResult<Option<QuoteAggregate>> {
        let options = FindOneOptions::builder().sort(doc! { "_id": -1 }).build();
        match self.quotes.find_one(doc! { "email": email }, options).await? {
            Some(quote) => Ok(Some(self.load(quote).await?)),
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self, aggregate), fields(quote_number = %aggregate.quote.quote_number))]
    async fn save(&self, aggregate: QuoteAggregate) -> RepositoryResult<QuoteAggregate> {
        info!("Saving quote");
        let mut aggregate = aggregate;
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;
        match self.replace_parts(&mut session, &mut aggregate).await {
            Ok(()) => {
                session.commit_transaction().await?;
                Ok(aggregate)
            }
            Err(e) => {
                abort(&mut session).await;
                error!("Failed to save quote: {}", e);
                Err(e)
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn list(&self, filter: QuoteFilter) -> RepositoryResult<Vec<QuoteAggregate>> {
        let query = match filter {
            QuoteFilter::All => doc! {},
            QuoteFilter::CompletedOnly => {
                doc! { "status": bson::to_bson(&StepStatus::Complete)? }
            }
        };
        let options = FindOptions::builder().sort(doc! { "_id": -1 }).build();
        let quotes: Vec<Quote> = self.quotes.find(query, options).await?.try_collect().await?;
        let mut aggregates = self.load_all(quotes).await?;
        sort_for_listing(filter, &mut aggregates);
        info!("Fetched {} quotes", aggregates.len());
        Ok(aggregates)
    }

    #[tracing::instrument(skip(self), fields(id = %quote_id))]
    async fn delete_cascade(&self, quote_id: ObjectId) -> RepositoryResult<()> {
        info!("Deleting quote with dependents");
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;
        match self.delete_parts(&mut session, quote_id).await {
            Ok(()) => {
                session.commit_transaction().await?;
                info!("Quote deleted successfully");
                Ok(())
            }
            Err(e) => {
                abort(&mut session).await;
                error!("Failed to delete quote: {}", e);
                Err(e)
            }
        }
    }
}
