//! Round trips against a live MongoDB replica set (transactions need one).
//! Run with `MONGO_URI` and `MONGO_DATABASE` set and `--ignored`.

use bson::oid::ObjectId;
use chrono::{NaiveDate, Utc};
use eventsure_backend::config::mongo_conf::MongoConfig;
use eventsure_backend::model::event::{Event, Venue};
use eventsure_backend::model::policy::{Payment, PaymentStatus, Policy};
use eventsure_backend::model::quote::{LiabilityOption, Quote, QuoteAggregate, QuoteSource, StepStatus};
use eventsure_backend::model::user::{User, UserProfile};
use eventsure_backend::repository::policy_repo::{MongoPolicyRepository, PolicyRepository};
use eventsure_backend::repository::quote_repo::{MongoQuoteRepository, QuoteFilter, QuoteRepository};
use eventsure_backend::repository::repository_error::{RepositoryError, RepositoryResult};
use eventsure_backend::repository::user_repo::{MongoUserRepository, UserRepository};
use eventsure_backend::util::identifier::{generate_quote_number, mint_policy_number};

struct Repos {
    quotes: MongoQuoteRepository,
    users: MongoUserRepository,
    policies: MongoPolicyRepository,
}

async fn setup_repositories() -> RepositoryResult<Repos> {
    let _ = dotenv::dotenv();
    let config = MongoConfig::from_env()
        .map_err(|e| RepositoryError::database(format!("Failed to load MongoConfig: {}", e)))?;
    let client = config
        .connect()
        .await
        .map_err(|e| RepositoryError::connection(format!("Failed to connect: {}", e)))?;
    let repos = Repos {
        quotes: MongoQuoteRepository::new(client.clone(), &config),
        users: MongoUserRepository::new(&client, &config),
        policies: MongoPolicyRepository::new(&client, &config),
    };
    repos.quotes.ensure_indexes().await?;
    repos.users.ensure_indexes().await?;
    repos.policies.ensure_indexes().await?;
    Ok(repos)
}

fn aggregate_for(user: &User) -> QuoteAggregate {
    let now = Utc::now();
    let quote_id = ObjectId::new();
    let mut aggregate = QuoteAggregate::new(Quote {
        id: Some(quote_id),
        quote_number: generate_quote_number(),
        user_id: user.id.unwrap(),
        email: user.email.clone(),
        resident_state: Some("CA".to_string()),
        coverage_level: Some(5),
        liability_coverage: LiabilityOption::Option2,
        liquor_liability: true,
        covid_disclosure: true,
        special_activities: false,
        base_premium: Some(355),
        liability_premium: Some(180),
        liquor_liability_premium: Some(85),
        total_premium: Some(620),
        status: StepStatus::Step1,
        source: QuoteSource::Customer,
        is_customer_generated: true,
        created_at: now,
        updated_at: now,
    });
    aggregate.event = Some(Event {
        id: None,
        quote_id,
        event_type: "wedding".to_string(),
        event_date: NaiveDate::from_ymd_opt(2026, 6, 20).unwrap(),
        max_guests: 120,
        ..Event::merged(None, &Default::default(), quote_id)
    });
    aggregate.venue = Some(Venue {
        name: "Rose Hall".to_string(),
        ..Venue::merged(None, &Default::default(), None)
    });
    aggregate
}

#[tokio::test]
#[ignore]
async fn test_quote_repository_workflow() {
    let repos = setup_repositories().await.expect("Failed to setup repositories");
    let email = format!("repo-{}@example.com", ObjectId::new().to_hex());
    let user = repos
        .users
        .resolve_by_email(&email, &UserProfile::default())
        .await
        .expect("Failed to resolve user");
    assert!(user.id.is_some());

    // Insert
    let created = repos.quotes.create(aggregate_for(&user)).await.expect("Failed to insert quote");
    let quote_id = created.quote.id.unwrap();
    let number = created.quote_number().to_string();
    assert!(created.event.as_ref().and_then(|e| e.id).is_some());

    // Duplicate quote number surfaces as a typed collision
    let mut clash = aggregate_for(&user);
    clash.quote.quote_number = number.clone();
    let err = repos.quotes.create(clash).await.unwrap_err();
    assert!(err.is_duplicate_on("quoteNumber"));

    // Read back through every lookup
    let fetched = repos.quotes.find_by_number(&number).await.unwrap().expect("quote by number");
    assert_eq!(fetched.quote.total_premium, Some(620));
    assert_eq!(fetched.venue.as_ref().map(|v| v.name.as_str()), Some("Rose Hall"));
    assert!(repos.quotes.find_by_id(quote_id).await.unwrap().is_some());
    let latest = repos.quotes.find_latest_by_email(&email).await.unwrap().expect("quote by email");
    assert_eq!(latest.quote_number(), number);

    // Save a step
    let mut step = fetched;
    step.quote.status = StepStatus::Complete;
    if let Some(event) = step.event.as_mut() {
        event.max_guests = 300;
    }
    repos.quotes.save(step).await.expect("Failed to save quote");
    let saved = repos.quotes.find_by_number(&number).await.unwrap().unwrap();
    assert_eq!(saved.quote.status, StepStatus::Complete);
    assert_eq!(saved.max_guests(), Some(300));
    let completed = repos.quotes.list(QuoteFilter::CompletedOnly).await.unwrap();
    assert!(completed.iter().any(|q| q.quote_number() == number));

    // Policy and payment
    let policy = repos
        .policies
        .create_policy(Policy {
            id: None,
            quote_id,
            policy_number: mint_policy_number(),
            created_at: Utc::now(),
        })
        .await
        .expect("Failed to create policy");
    let err = repos
        .policies
        .create_policy(Policy { id: None, ..policy.clone() })
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::DuplicateKey { .. }));
    repos
        .policies
        .add_payment(Payment {
            id: None,
            policy_id: policy.id,
            quote_id,
            amount: 620,
            method: "card".to_string(),
            status: PaymentStatus::Completed,
            created_at: Utc::now(),
        })
        .await
        .expect("Failed to add payment");
    let loaded = repos.quotes.find_by_id(quote_id).await.unwrap().unwrap();
    assert_eq!(loaded.policy.as_ref().map(|p| &p.policy_number), Some(&policy.policy_number));
    assert_eq!(loaded.payments.len(), 1);

    // Delete everything hanging off the quote
    repos.quotes.delete_cascade(quote_id).await.expect("Failed to delete quote");
    assert!(repos.quotes.find_by_number(&number).await.unwrap().is_none());
    assert!(repos.policies.find_by_quote(quote_id).await.unwrap().is_none());
    assert!(repos.users.find_by_id(&user.id.unwrap()).await.unwrap().is_some());
}
