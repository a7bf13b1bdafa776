use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::Utc;
use tracing::{error, info, instrument, warn};
use validator::Validate;

use crate::dto::quote_dto::{CreateQuoteRequest, EventInput, QuoteInput, VenueInput};
use crate::model::event::{Event, Venue};
use crate::model::policy_holder::PolicyHolder;
use crate::model::quote::{LiabilityOption, Quote, QuoteAggregate, QuoteSource, StepStatus};
use crate::model::user::{normalize_email, User, UserProfile};
use crate::repository::quote_repo::{QuoteFilter, QuoteRepository, QUOTE_NUMBER_FIELD};
use crate::repository::repository_error::RepositoryError;
use crate::repository::user_repo::UserRepository;
use crate::util::email::{spawn_notification, EmailService, EmailTemplate};
use crate::util::error::{ServiceError, ValidationError};
use crate::util::identifier::{legacy_quote_number, NumberGenerator};
use crate::util::premium::{PremiumBreakdown, PremiumInputs};
use crate::util::retry::{retry_on_collision, RetryError, MAX_NUMBER_ATTEMPTS};

/// How a caller identifies the quote to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteLookup {
	QuoteNumber(String),
	Id(ObjectId),
	/// Most recently created quote for the address.
	Email(String),
}

#[async_trait]
pub trait QuoteService: Send + Sync {
	async fn submit_new_quote(&self, request: CreateQuoteRequest) -> Result<QuoteAggregate, ServiceError>;
	async fn update_quote(
		&self,
		quote_number: &str,
		input: QuoteInput,
		step: Option<StepStatus>,
	) -> Result<QuoteAggregate, ServiceError>;
	async fn get_quote(&self, lookup: QuoteLookup) -> Result<QuoteAggregate, ServiceError>;
	async fn list_quotes(&self, filter: QuoteFilter) -> Result<Vec<QuoteAggregate>, ServiceError>;
	async fn delete_quote(&self, quote_number: &str) -> Result<(), ServiceError>;
}

pub struct QuoteServiceImpl {
	pub quote_repo: Arc<dyn QuoteRepository>,
	pub user_repo: Arc<dyn UserRepository>,
	pub numbers: Arc<dyn NumberGenerator>,
	pub email_service: Arc<dyn EmailService>,
	pub admin_path_prefix: String,
}

impl QuoteServiceImpl {
	pub fn new(
		quote_repo: Arc<dyn QuoteRepository>,
		user_repo: Arc<dyn UserRepository>,
		numbers: Arc<dyn NumberGenerator>,
		email_service: Arc<dyn EmailService>,
		admin_path_prefix: impl Into<String>,
	) -> Self {
		QuoteServiceImpl {
			quote_repo,
			user_repo,
			numbers,
			email_service,
			admin_path_prefix: admin_path_prefix.into(),
		}
	}

	/// An admin referrer always means admin, then the explicit source, then customer.
	pub fn effective_source(&self, source: Option<QuoteSource>, referrer: Option<&str>) -> QuoteSource {
		match (source, referrer) {
			(_, Some(referrer)) if referrer.contains(self.admin_path_prefix.as_str()) => QuoteSource::Admin,
			(Some(source), _) => source,
			_ => QuoteSource::Customer,
		}
	}

	/// Updates the user's name and phone when the submission carries them.
	async fn sync_profile(&self, user: &mut User, profile: &UserProfile) -> Result<(), ServiceError> {
		if profile.is_empty() || !user.apply_profile(profile) {
			return Ok(());
		}
		let id = user
			.id
			.ok_or_else(|| ServiceError::integrity("Linked user has no id"))?;
		*user = self.user_repo.update(id, user.clone()).await?;
		Ok(())
	}

	async fn find_existing(&self, quote_number: &str) -> Result<QuoteAggregate, ServiceError> {
		self.quote_repo
			.find_by_number(quote_number)
			.await?
			.ok_or_else(|| ServiceError::not_found(format!("Quote {} not found", quote_number)))
	}

	fn notify(&self, to: &str, template: EmailTemplate) {
		spawn_notification(self.email_service.clone(), to.to_string(), template);
	}
}

fn validate_input(input: &QuoteInput) -> Result<(), ValidationError> {
	input
		.validate()
		.map_err(|e| ValidationError::InvalidInput(e.to_string()))
}

fn check_liquor(liquor_liability: bool, liability: LiabilityOption) -> Result<(), ValidationError> {
	if liquor_liability && liability == LiabilityOption::NoCoverage {
		return Err(ValidationError::LiquorRequiresLiability);
	}
	Ok(())
}

fn check_legal_notices(holder: Option<&PolicyHolder>) -> Result<(), ValidationError> {
	match holder {
		Some(holder) if holder.legal_notices => Ok(()),
		_ => Err(ValidationError::LegalNoticesRequired),
	}
}

fn recompute_premiums(aggregate: &mut QuoteAggregate) {
	let breakdown = PremiumBreakdown::compute(PremiumInputs {
		coverage_level: aggregate.quote.coverage_level,
		liability: Some(aggregate.quote.liability_coverage),
		liquor_liability: aggregate.quote.liquor_liability,
		max_guests: aggregate.max_guests(),
	});
	aggregate.quote.apply_premiums(breakdown);
}

fn greeting_name(user: &User) -> String {
	user.first_name.clone()
}

/// Builds the aggregate for a first submission. Sections without their core
/// fields are left out.
fn new_aggregate(quote_id: ObjectId, user: &User, input: &QuoteInput, status: StepStatus, source: QuoteSource) -> QuoteAggregate {
	let now = Utc::now();
	let mut quote = Quote {
		id: Some(quote_id),
		quote_number: String::new(),
		user_id: user.id.unwrap_or(quote_id),
		email: user.email.clone(),
		resident_state: input.resident_state.clone(),
		coverage_level: input.coverage_level,
		liability_coverage: input.liability_coverage.unwrap_or_default(),
		liquor_liability: input.liquor_liability.unwrap_or(false),
		covid_disclosure: input.covid_disclosure.unwrap_or(false),
		special_activities: input.special_activities.unwrap_or(false),
		base_premium: None,
		liability_premium: None,
		liquor_liability_premium: None,
		total_premium: None,
		status,
		source,
		is_customer_generated: true,
		created_at: now,
		updated_at: now,
	};
	quote.set_source(source);

	let mut aggregate = QuoteAggregate::new(quote);
	aggregate.user = Some(user.clone());
	if let Some(event_input) = input.event.as_ref().filter(|e| e.has_core_fields()) {
		aggregate.event = Some(Event::merged(None, event_input, quote_id));
		let venue_input = input.venue.clone().unwrap_or_default();
		aggregate.venue = Some(Venue::merged(None, &venue_input, None));
	}
	if let Some(holder_input) = input.policy_holder.as_ref().filter(|h| h.has_core_fields()) {
		aggregate.policy_holder = Some(PolicyHolder::merged(None, holder_input, Some(quote_id)));
	}
	recompute_premiums(&mut aggregate);
	aggregate
}

#[async_trait]
impl QuoteService for QuoteServiceImpl {
	#[instrument(skip(self, request), fields(draft = request.draft))]
	async fn submit_new_quote(&self, request: CreateQuoteRequest) -> Result<QuoteAggregate, ServiceError> {
		let CreateQuoteRequest { quote: input, source, referrer, draft } = request;

		let email = input
			.email
			.as_deref()
			.map(normalize_email)
			.filter(|e| !e.is_empty())
			.ok_or(ValidationError::MissingEmail)?;
		validate_input(&input)?;
		if !draft {
			let missing = input.missing_required_fields();
			if !missing.is_empty() {
				return Err(ValidationError::MissingRequiredFields(missing).into());
			}
		}

		let source = self.effective_source(source, referrer.as_deref());
		let status = input.status.unwrap_or(StepStatus::Step1);
		if source == QuoteSource::Admin && status != StepStatus::Complete {
			return Err(ValidationError::AdminRequiresComplete.into());
		}
		check_liquor(
			input.liquor_liability.unwrap_or(false),
			input.liability_coverage.unwrap_or_default(),
		)?;
		if source == QuoteSource::Customer && status == StepStatus::Complete {
			let holder = input.policy_holder.as_ref().filter(|h| h.has_core_fields());
			if holder.and_then(|h| h.legal_notices) != Some(true) {
				return Err(ValidationError::LegalNoticesRequired.into());
			}
		}

		let profile = input.profile();
		let mut user = self.user_repo.resolve_by_email(&email, &profile).await?;
		if user.id.is_none() {
			return Err(ServiceError::integrity(format!("User for {} has no id", email)));
		}

		let aggregate = new_aggregate(ObjectId::new(), &user, &input, status, source);
		let repo = &self.quote_repo;
		let mut created = retry_on_collision(
			MAX_NUMBER_ATTEMPTS,
			|| self.numbers.quote_number(),
			|candidate| {
				let mut attempt = aggregate.clone();
				attempt.quote.quote_number = candidate;
				async move { repo.create(attempt).await }
			},
			|e: &RepositoryError| e.is_duplicate_on(QUOTE_NUMBER_FIELD),
		)
		.await
		.map_err(|e| match e {
			RetryError::Exhausted { attempts } => {
				error!(attempts, "Ran out of quote numbers");
				ServiceError::ExhaustedRetries { field: QUOTE_NUMBER_FIELD, attempts }
			}
			RetryError::Failed(e) => ServiceError::from(e),
		})?;
		// Profile changes land only after the quote is stored.
		self.sync_profile(&mut user, &profile).await?;
		created.user = Some(user.clone());

		info!(quote_number = %created.quote_number(), source = ?source, "Quote submitted");
		let template = if status == StepStatus::Complete {
			EmailTemplate::QuoteCompleted {
				quote_number: created.quote_number().to_string(),
				total_premium: created.quote.total_premium.unwrap_or(0),
			}
		} else {
			EmailTemplate::QuoteReceived {
				quote_number: created.quote_number().to_string(),
				customer_name: greeting_name(&user),
			}
		};
		self.notify(&email, template);
		Ok(created)
	}

	#[instrument(skip(self, input))]
	async fn update_quote(
		&self,
		quote_number: &str,
		input: QuoteInput,
		step: Option<StepStatus>,
	) -> Result<QuoteAggregate, ServiceError> {
		validate_input(&input)?;
		let mut aggregate = self.find_existing(quote_number).await?;
		let quote_id = aggregate
			.quote
			.id
			.ok_or_else(|| ServiceError::integrity(format!("Quote {} has no id", quote_number)))?;

		let mut user = match self.user_repo.find_by_id(&aggregate.quote.user_id).await? {
			Some(user) => user,
			None => {
				error!(user_id = %aggregate.quote.user_id, "Quote is linked to a missing user");
				return Err(ServiceError::integrity(format!(
					"Quote {} is linked to a user that does not exist",
					quote_number
				)));
			}
		};

		if let Some(email) = input.email.as_deref().map(normalize_email).filter(|e| !e.is_empty()) {
			if email != aggregate.quote.email && email != user.email {
				match self.user_repo.find_by_email(&email).await? {
					Some(other) => {
						info!(email = %email, "Re-linking quote to existing user");
						aggregate.quote.user_id = other.id.unwrap_or(aggregate.quote.user_id);
						user = other;
					}
					// The quote's email now differs from its user's. Email lookups go by the quote.
					None => warn!(email = %email, "No user owns the new email, keeping current link"),
				}
			}
			aggregate.quote.email = email;
		}
		self.sync_profile(&mut user, &input.profile()).await?;

		let quote = &mut aggregate.quote;
		if let Some(state) = &input.resident_state {
			quote.resident_state = Some(state.clone());
		}
		if let Some(level) = input.coverage_level {
			quote.coverage_level = Some(level);
		}
		if let Some(liability) = input.liability_coverage {
			quote.liability_coverage = liability;
		}
		if let Some(liquor) = input.liquor_liability {
			quote.liquor_liability = liquor;
		}
		if let Some(covid) = input.covid_disclosure {
			quote.covid_disclosure = covid;
		}
		if let Some(special) = input.special_activities {
			quote.special_activities = special;
		}
		if input.liquor_liability.is_some() || input.liability_coverage.is_some() {
			check_liquor(quote.liquor_liability, quote.liability_coverage)?;
		}
		let previous_status = quote.status;
		quote.status = step.or(input.status).unwrap_or(previous_status);
		quote.updated_at = Utc::now();

		if input.event.is_some() || input.venue.is_some() {
			let event_input = input.event.clone().unwrap_or_else(EventInput::default);
			let event = Event::merged(aggregate.event.as_ref(), &event_input, quote_id);
			let venue_input = input.venue.clone().unwrap_or_else(VenueInput::default);
			let venue = Venue::merged(aggregate.venue.as_ref(), &venue_input, event.id);
			aggregate.event = Some(event);
			aggregate.venue = Some(venue);
		}
		if let Some(holder_input) = &input.policy_holder {
			aggregate.policy_holder = Some(PolicyHolder::merged(
				aggregate.policy_holder.as_ref(),
				holder_input,
				Some(quote_id),
			));
		}

		let completing = aggregate.quote.status == StepStatus::Complete && previous_status != StepStatus::Complete;
		if completing && aggregate.quote.source == QuoteSource::Customer {
			check_legal_notices(aggregate.policy_holder.as_ref())?;
		}
		if input.touches_rating() {
			recompute_premiums(&mut aggregate);
		}

		let mut saved = self.quote_repo.save(aggregate).await?;
		saved.user = Some(user);
		info!(status = ?saved.quote.status, "Quote updated");

		if completing {
			self.notify(
				&saved.quote.email,
				EmailTemplate::QuoteCompleted {
					quote_number: saved.quote_number().to_string(),
					total_premium: saved.quote.total_premium.unwrap_or(0),
				},
			);
		}
		Ok(saved)
	}

	#[instrument(skip(self))]
	async fn get_quote(&self, lookup: QuoteLookup) -> Result<QuoteAggregate, ServiceError> {
		let found = match &lookup {
			QuoteLookup::QuoteNumber(number) => match self.quote_repo.find_by_number(number).await? {
				Some(aggregate) => Some(aggregate),
				None => match legacy_quote_number(number) {
					Some(legacy) => {
						info!(legacy = %legacy, "Trying legacy quote number");
						self.quote_repo.find_by_number(&legacy).await?
					}
					None => None,
				},
			},
			QuoteLookup::Id(id) => self.quote_repo.find_by_id(*id).await?,
			QuoteLookup::Email(email) => self.quote_repo.find_latest_by_email(&normalize_email(email)).await?,
		};
		found.ok_or_else(|| ServiceError::not_found(format!("No quote matches {:?}", lookup)))
	}

	#[instrument(skip(self))]
	async fn list_quotes(&self, filter: QuoteFilter) -> Result<Vec<QuoteAggregate>, ServiceError> {
		Ok(self.quote_repo.list(filter).await?)
	}

	#[instrument(skip(self))]
	async fn delete_quote(&self, quote_number: &str) -> Result<(), ServiceError> {
		let aggregate = self.find_existing(quote_number).await?;
		let quote_id = aggregate
			.quote
			.id
			.ok_or_else(|| ServiceError::integrity(format!("Quote {} has no id", quote_number)))?;
		self.quote_repo.delete_cascade(quote_id).await?;
		info!("Quote and dependents deleted");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::repository::in_memory::InMemoryStore;
	use crate::util::email::NoopEmailService;
	use crate::util::identifier::RandomNumberGenerator;

	fn service() -> QuoteServiceImpl {
		let store = Arc::new(InMemoryStore::new());
		QuoteServiceImpl::new(
			store.clone(),
			store,
			Arc::new(RandomNumberGenerator),
			Arc::new(NoopEmailService),
			"/admin",
		)
	}

	#[test]
	fn test_effective_source_precedence() {
		let service = service();
		assert_eq!(service.effective_source(None, None), QuoteSource::Customer);
		assert_eq!(service.effective_source(None, Some("https://x.test/admin/quotes/new")), QuoteSource::Admin);
		assert_eq!(service.effective_source(None, Some("https://x.test/quote/step1")), QuoteSource::Customer);
		assert_eq!(
			service.effective_source(Some(QuoteSource::Customer), Some("/admin/create")),
			QuoteSource::Admin
		);
		assert_eq!(service.effective_source(Some(QuoteSource::Admin), Some("/quote/step1")), QuoteSource::Admin);
	}

	#[test]
	fn test_liquor_needs_liability() {
		assert_eq!(check_liquor(true, LiabilityOption::NoCoverage), Err(ValidationError::LiquorRequiresLiability));
		assert!(check_liquor(true, LiabilityOption::Option1).is_ok());
		assert!(check_liquor(false, LiabilityOption::NoCoverage).is_ok());
	}
}
