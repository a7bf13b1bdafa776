#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use eventsure_backend::dto::quote_dto::{
    CreateQuoteRequest, EventInput, PolicyHolderInput, QuoteInput, VenueInput,
};
use eventsure_backend::model::quote::{LiabilityOption, StepStatus};
use eventsure_backend::repository::in_memory::InMemoryStore;
use eventsure_backend::service::policy_service::PolicyServiceImpl;
use eventsure_backend::service::quote_service::QuoteServiceImpl;
use eventsure_backend::util::email::NoopEmailService;
use eventsure_backend::util::identifier::{
    generate_quote_number, mint_policy_number, NumberGenerator,
};

/// Hands out scripted numbers first, then random ones.
#[derive(Default)]
pub struct ScriptedNumbers {
    quotes: Mutex<VecDeque<String>>,
    policies: Mutex<VecDeque<String>>,
}

impl ScriptedNumbers {
    pub fn with_quotes(numbers: &[&str]) -> Self {
        let scripted = ScriptedNumbers::default();
        scripted.push_quotes(numbers);
        scripted
    }

    pub fn push_quotes(&self, numbers: &[&str]) {
        let mut quotes = self.quotes.lock().unwrap();
        quotes.extend(numbers.iter().map(|n| n.to_string()));
    }

    pub fn push_policies(&self, numbers: &[&str]) {
        let mut policies = self.policies.lock().unwrap();
        policies.extend(numbers.iter().map(|n| n.to_string()));
    }
}

impl NumberGenerator for ScriptedNumbers {
    fn quote_number(&self) -> String {
        self.quotes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(generate_quote_number)
    }

    fn policy_number(&self) -> String {
        self.policies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(mint_policy_number)
    }
}

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub numbers: Arc<ScriptedNumbers>,
    pub quotes: Arc<QuoteServiceImpl>,
    pub policies: Arc<PolicyServiceImpl>,
}

pub fn harness() -> Harness {
    harness_with(ScriptedNumbers::default())
}

pub fn harness_with(numbers: ScriptedNumbers) -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let numbers = Arc::new(numbers);
    let email = Arc::new(NoopEmailService);
    let quotes = Arc::new(QuoteServiceImpl::new(
        store.clone(),
        store.clone(),
        numbers.clone(),
        email.clone(),
        "/admin",
    ));
    let policies = Arc::new(PolicyServiceImpl::new(store.clone(), store.clone(), numbers.clone(), email));
    Harness { store, numbers, quotes, policies }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Every field a first submission needs: level 5, option2, liquor, 120 guests.
pub fn full_input(email: &str) -> QuoteInput {
    QuoteInput {
        email: Some(email.to_string()),
        resident_state: Some("CA".to_string()),
        coverage_level: Some(5),
        liability_coverage: Some(LiabilityOption::Option2),
        liquor_liability: Some(true),
        covid_disclosure: Some(true),
        special_activities: Some(false),
        status: Some(StepStatus::Step1),
        event: Some(EventInput {
            event_type: Some("wedding".to_string()),
            event_date: Some(date(2026, 6, 20)),
            max_guests: Some(120),
            honoree1_first_name: Some("Ana".to_string()),
            honoree1_last_name: Some("Lopez".to_string()),
            ..Default::default()
        }),
        venue: Some(VenueInput {
            name: Some("Rose Hall".to_string()),
            city: Some("Napa".to_string()),
            state: Some("CA".to_string()),
            ..Default::default()
        }),
        policy_holder: None,
    }
}

pub fn holder(legal_notices: bool) -> PolicyHolderInput {
    PolicyHolderInput {
        first_name: Some("Jamie".to_string()),
        last_name: Some("Rivera".to_string()),
        phone: Some("555-0100".to_string()),
        relationship: Some("Honoree".to_string()),
        legal_notices: Some(legal_notices),
        ..Default::default()
    }
}

pub fn create_request(input: QuoteInput) -> CreateQuoteRequest {
    CreateQuoteRequest { quote: input, ..Default::default() }
}
