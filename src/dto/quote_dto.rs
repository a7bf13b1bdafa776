use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::model::quote::{LiabilityOption, QuoteAggregate, QuoteSource, StepStatus};
use crate::model::user::UserProfile;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInput {
    pub event_type: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub max_guests: Option<u32>,
    pub honoree1_first_name: Option<String>,
    pub honoree1_last_name: Option<String>,
    pub honoree2_first_name: Option<String>,
    pub honoree2_last_name: Option<String>,
}

impl EventInput {
    /// Type, date and guest count are all present.
    pub fn has_core_fields(&self) -> bool {
        self.event_type.is_some() && self.event_date.is_some() && self.max_guests.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueInput {
    pub name: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub ceremony_location_type: Option<String>,
    pub indoor_outdoor: Option<String>,
    pub venue_as_insured: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyHolderInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub relationship: Option<String>,
    pub hear_about_us: Option<String>,
    pub address: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub legal_notices: Option<bool>,
    pub completing_form_name: Option<String>,
}

impl PolicyHolderInput {
    pub fn has_core_fields(&self) -> bool {
        self.first_name.is_some() && self.last_name.is_some()
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone: self.phone.clone(),
        }
    }
}

/// Fields a step submission may carry. Every section is optional; absent
/// fields leave stored values untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuoteInput {
    #[validate(email)]
    pub email: Option<String>,
    pub resident_state: Option<String>,
    #[validate(range(min = 1, max = 10))]
    pub coverage_level: Option<u8>,
    pub liability_coverage: Option<LiabilityOption>,
    pub liquor_liability: Option<bool>,
    pub covid_disclosure: Option<bool>,
    pub special_activities: Option<bool>,
    pub status: Option<StepStatus>,
    pub event: Option<EventInput>,
    pub venue: Option<VenueInput>,
    pub policy_holder: Option<PolicyHolderInput>,
}

impl QuoteInput {
    pub fn max_guests(&self) -> Option<u32> {
        self.event.as_ref().and_then(|event| event.max_guests)
    }

    /// Any field the premium depends on is present.
    pub fn touches_rating(&self) -> bool {
        self.coverage_level.is_some()
            || self.liability_coverage.is_some()
            || self.liquor_liability.is_some()
            || self.max_guests().is_some()
    }

    /// Names of the fields a non-draft first submission must carry.
    pub fn missing_required_fields(&self) -> Vec<&'static str> {
        let event = self.event.as_ref();
        let mut missing = Vec::new();
        if self.resident_state.as_deref().map_or(true, str::is_empty) {
            missing.push("residentState");
        }
        if event.and_then(|e| e.event_type.as_deref()).map_or(true, str::is_empty) {
            missing.push("eventType");
        }
        if event.and_then(|e| e.max_guests).is_none() {
            missing.push("maxGuests");
        }
        if event.and_then(|e| e.event_date).is_none() {
            missing.push("eventDate");
        }
        if self.coverage_level.is_none() {
            missing.push("coverageLevel");
        }
        if self.covid_disclosure.is_none() {
            missing.push("covidDisclosure");
        }
        missing
    }

    pub fn profile(&self) -> UserProfile {
        self.policy_holder
            .as_ref()
            .map(PolicyHolderInput::profile)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuoteRequest {
    #[serde(flatten)]
    pub quote: QuoteInput,
    pub source: Option<QuoteSource>,
    /// Path the submission came from; admin paths imply an admin quote.
    pub referrer: Option<String>,
    /// Save-and-resume submission that only needs an email.
    #[serde(default)]
    pub draft: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuoteRequest {
    pub quote_number: Option<String>,
    pub step: Option<StepStatus>,
    #[serde(flatten)]
    pub quote: QuoteInput,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteQuery {
    pub quote_number: Option<String>,
    pub id: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteQuoteQuery {
    pub quote_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuoteResponse {
    pub quote_number: String,
    pub quote: QuoteAggregate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteResponse {
    pub quote: QuoteAggregate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteListResponse {
    pub quotes: Vec<QuoteAggregate>,
    pub policies: Vec<QuoteAggregate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_required_fields_lists_all_gaps() {
        let input = QuoteInput {
            email: Some("a@b.com".to_string()),
            coverage_level: Some(3),
            ..Default::default()
        };
        assert_eq!(
            input.missing_required_fields(),
            vec!["residentState", "eventType", "maxGuests", "eventDate", "covidDisclosure"]
        );
    }

    #[test]
    fn test_touches_rating_sees_nested_guest_count() {
        let input = QuoteInput {
            event: Some(EventInput { max_guests: Some(80), ..Default::default() }),
            ..Default::default()
        };
        assert!(input.touches_rating());
        assert!(!QuoteInput::default().touches_rating());
    }

    #[test]
    fn test_update_request_reads_flat_json() {
        let body = serde_json::json!({
            "quoteNumber": "QI-01012026-123456",
            "step": "STEP2",
            "liabilityCoverage": "option2",
            "event": { "maxGuests": 300 }
        });
        let request: UpdateQuoteRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.quote_number.as_deref(), Some("QI-01012026-123456"));
        assert_eq!(request.step, Some(StepStatus::Step2));
        assert_eq!(request.quote.liability_coverage, Some(LiabilityOption::Option2));
        assert_eq!(request.quote.max_guests(), Some(300));
    }
}
