use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::Utc;

use crate::model::event::{Event, Venue};
use crate::model::policy::{Payment, Policy};
use crate::model::policy_holder::PolicyHolder;
use crate::model::quote::{Quote, QuoteAggregate, StepStatus};
use crate::model::user::{normalize_email, User};
use crate::repository::policy_repo::{PolicyRepository, POLICY_NUMBER_FIELD, POLICY_QUOTE_FIELD};
use crate::repository::quote_repo::{sort_for_listing, QuoteFilter, QuoteRepository, QUOTE_NUMBER_FIELD};
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use crate::repository::user_repo::{UserRepository, EMAIL_FIELD};

#[derive(Debug, Default)]
struct StoreState {
    /// Insertion order doubles as creation order.
    quotes: Vec<Quote>,
    events: HashMap<ObjectId, Event>,
    venues: HashMap<ObjectId, Venue>,
    policy_holders: HashMap<ObjectId, PolicyHolder>,
    policies: HashMap<ObjectId, Policy>,
    payments: Vec<Payment>,
    users: HashMap<ObjectId, User>,
}

impl StoreState {
    fn load(&self, quote: &Quote) -> QuoteAggregate {
        let quote_id = quote.id;
        let event = self
            .events
            .values()
            .find(|e| Some(e.quote_id) == quote_id)
            .cloned();
        let venue = event.as_ref().and_then(|e| {
            self.venues
                .values()
                .find(|v| v.event_id.is_some() && v.event_id == e.id)
                .cloned()
        });
        let mut payments: Vec<Payment> = self
            .payments
            .iter()
            .rev()
            .filter(|p| Some(p.quote_id) == quote_id)
            .cloned()
            .collect();
        payments.sort_by_key(|p| Reverse(p.created_at));
        QuoteAggregate {
            quote: quote.clone(),
            user: self.users.get(&quote.user_id).cloned(),
            event,
            venue,
            policy_holder: self
                .policy_holders
                .values()
                .find(|h| h.quote_id.is_some() && h.quote_id == quote_id)
                .cloned(),
            policy: self
                .policies
                .values()
                .find(|p| Some(p.quote_id) == quote_id)
                .cloned(),
            payments,
        }
    }

    fn write_parts(&mut self, quote_id: ObjectId, aggregate: &mut QuoteAggregate) {
        if let Some(event) = aggregate.event.as_mut() {
            event.quote_id = quote_id;
            let event_id = *event.id.get_or_insert_with(ObjectId::new);
            self.events.insert(event_id, event.clone());

            if let Some(venue) = aggregate.venue.as_mut() {
                venue.event_id = Some(event_id);
                let venue_id = *venue.id.get_or_insert_with(ObjectId::new);
                self.venues.insert(venue_id, venue.clone());
            }
        }
        if let Some(holder) = aggregate.policy_holder.as_mut() {
            holder.quote_id = Some(quote_id);
            let holder_id = *holder.id.get_or_insert_with(ObjectId::new);
            self.policy_holders.insert(holder_id, holder.clone());
        }
    }
}

/// Row totals, used by tests to check cascades and idempotency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowCounts {
    pub quotes: usize,
    pub events: usize,
    pub venues: usize,
    pub policy_holders: usize,
    pub policies: usize,
    pub payments: usize,
    pub users: usize,
}

/// In-memory implementation of every repository trait.
///
/// Intended for tests/dev. Enforces the same unique keys as the MongoDB indexes.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RepositoryResult<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|_| RepositoryError::database("lock poisoned"))
    }

    fn write(&self) -> RepositoryResult<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|_| RepositoryError::database("lock poisoned"))
    }

    pub fn row_counts(&self) -> RowCounts {
        match self.read() {
            Ok(state) => RowCounts {
                quotes: state.quotes.len(),
                events: state.events.len(),
                venues: state.venues.len(),
                policy_holders: state.policy_holders.len(),
                policies: state.policies.len(),
                payments: state.payments.len(),
                users: state.users.len(),
            },
            Err(_) => RowCounts::default(),
        }
    }

    /// Rows of any dependent table that point at the quote, directly or
    /// through its event or policy.
    pub fn rows_referencing(&self, quote_id: ObjectId) -> usize {
        let Ok(state) = self.read() else { return 0 };
        let event_ids: Vec<ObjectId> = state
            .events
            .values()
            .filter(|e| e.quote_id == quote_id)
            .filter_map(|e| e.id)
            .collect();
        let policy_ids: Vec<ObjectId> = state
            .policies
            .values()
            .filter(|p| p.quote_id == quote_id)
            .filter_map(|p| p.id)
            .collect();
        event_ids.len()
            + policy_ids.len()
            + state
                .venues
                .values()
                .filter(|v| v.event_id.is_some_and(|id| event_ids.contains(&id)))
                .count()
            + state
                .policy_holders
                .values()
                .filter(|h| h.quote_id == Some(quote_id))
                .count()
            + state
                .payments
                .iter()
                .filter(|p| {
                    p.quote_id == quote_id || p.policy_id.is_some_and(|id| policy_ids.contains(&id))
                })
                .count()
    }
}

#[async_trait]
impl QuoteRepository for InMemoryStore {
    async fn create(&self, aggregate: QuoteAggregate) -> RepositoryResult<QuoteAggregate> {
        let mut aggregate = aggregate;
        let mut state = self.write()?;
        if state
            .quotes
            .iter()
            .any(|q| q.quote_number == aggregate.quote.quote_number)
        {
            return Err(RepositoryError::duplicate_key(
                QUOTE_NUMBER_FIELD,
                format!("quote number {} already exists", aggregate.quote.quote_number),
            ));
        }
        let quote_id = *aggregate.quote.id.get_or_insert_with(ObjectId::new);
        state.quotes.push(aggregate.quote.clone());
        state.write_parts(quote_id, &mut aggregate);
        Ok(state.load(&aggregate.quote))
    }

    async fn find_by_number(&self, quote_number: &str) -> RepositoryResult<Option<QuoteAggregate>> {
        let state = self.read()?;
        Ok(state
            .quotes
            .iter()
            .find(|q| q.quote_number == quote_number)
            .map(|q| state.load(q)))
    }

    async fn find_by_id(&self, id: ObjectId) -> RepositoryResult<Option<QuoteAggregate>> {
        let state = self.read()?;
        Ok(state
            .quotes
            .iter()
            .find(|q| q.id == Some(id))
            .map(|q| state.load(q)))
    }

    async fn find_latest_by_email(&self, email: &str) -> RepositoryResult<Option<QuoteAggregate>> {
        let state = self.read()?;
        let email = normalize_email(email);
        Ok(state
            .quotes
            .iter()
            .filter(|q| normalize_email(&q.email) == email)
            .max_by_key(|q| q.created_at)
            .map(|q| state.load(q)))
    }

    async fn save(&self, aggregate: QuoteAggregate) -> RepositoryResult<QuoteAggregate> {
        let mut aggregate = aggregate;
        let quote_id = aggregate
            .quote
            .id
            .ok_or_else(|| RepositoryError::validation("Cannot save a quote without an id"))?;
        let mut state = self.write()?;
        let slot = state
            .quotes
            .iter_mut()
            .find(|q| q.id == Some(quote_id))
            .ok_or_else(|| RepositoryError::not_found(format!("No quote found to update for ID: {}", quote_id)))?;
        *slot = aggregate.quote.clone();
        state.write_parts(quote_id, &mut aggregate);
        Ok(state.load(&aggregate.quote))
    }

    async fn list(&self, filter: QuoteFilter) -> RepositoryResult<Vec<QuoteAggregate>> {
        let state = self.read()?;
        let mut aggregates: Vec<QuoteAggregate> = state
            .quotes
            .iter()
            .rev()
            .filter(|q| filter == QuoteFilter::All || q.status == StepStatus::Complete)
            .map(|q| state.load(q))
            .collect();
        sort_for_listing(filter, &mut aggregates);
        Ok(aggregates)
    }

    async fn delete_cascade(&self, quote_id: ObjectId) -> RepositoryResult<()> {
        let mut state = self.write()?;
        if !state.quotes.iter().any(|q| q.id == Some(quote_id)) {
            return Err(RepositoryError::not_found(format!("No quote found to delete for ID: {}", quote_id)));
        }
        let event_id = state
            .events
            .values()
            .find(|e| e.quote_id == quote_id)
            .and_then(|e| e.id);
        let policy_id = state
            .policies
            .values()
            .find(|p| p.quote_id == quote_id)
            .and_then(|p| p.id);

        state
            .payments
            .retain(|p| p.quote_id != quote_id && (policy_id.is_none() || p.policy_id != policy_id));
        state
            .venues
            .retain(|_, v| event_id.is_none() || v.event_id != event_id);

        state.policies.retain(|_, p| p.quote_id != quote_id);
        state.events.retain(|_, e| e.quote_id != quote_id);
        state.policy_holders.retain(|_, h| h.quote_id != Some(quote_id));

        state.quotes.retain(|q| q.id != Some(quote_id));
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn insert(&self, mut user: User) -> RepositoryResult<User> {
        let mut state = self.write()?;
        user.email = normalize_email(&user.email);
        if state.users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::duplicate_key(EMAIL_FIELD, format!("user {} already exists", user.email)));
        }
        let id = ObjectId::new();
        let now = Utc::now();
        user.id = Some(id);
        user.created_at = Some(now);
        user.updated_at = Some(now);
        state.users.insert(id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: ObjectId, mut user: User) -> RepositoryResult<User> {
        let mut state = self.write()?;
        let slot = state
            .users
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::not_found(format!("No user found to update for ID: {}", id)))?;
        user.id = Some(id);
        user.updated_at = Some(Utc::now());
        *slot = user.clone();
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let email = normalize_email(email);
        Ok(self.read()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<User>> {
        Ok(self.read()?.users.get(id).cloned())
    }
}

#[async_trait]
impl PolicyRepository for InMemoryStore {
    async fn create_policy(&self, mut policy: Policy) -> RepositoryResult<Policy> {
        let mut state = self.write()?;
        if state.policies.values().any(|p| p.quote_id == policy.quote_id) {
            return Err(RepositoryError::duplicate_key(POLICY_QUOTE_FIELD, "quote already converted"));
        }
        if state
            .policies
            .values()
            .any(|p| p.policy_number == policy.policy_number)
        {
            return Err(RepositoryError::duplicate_key(
                POLICY_NUMBER_FIELD,
                format!("policy number {} already exists", policy.policy_number),
            ));
        }
        let id = ObjectId::new();
        policy.id = Some(id);
        state.policies.insert(id, policy.clone());
        Ok(policy)
    }

    async fn find_by_quote(&self, quote_id: ObjectId) -> RepositoryResult<Option<Policy>> {
        Ok(self
            .read()?
            .policies
            .values()
            .find(|p| p.quote_id == quote_id)
            .cloned())
    }

    async fn add_payment(&self, mut payment: Payment) -> RepositoryResult<Payment> {
        let mut state = self.write()?;
        payment.id = Some(ObjectId::new());
        state.payments.push(payment.clone());
        Ok(payment)
    }

    async fn list_payments(&self) -> RepositoryResult<Vec<Payment>> {
        let state = self.read()?;
        let mut payments: Vec<Payment> = state.payments.iter().rev().cloned().collect();
        payments.sort_by_key(|p| Reverse(p.created_at));
        Ok(payments)
    }
}
