use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::model::event::{Event, Venue};
use crate::model::policy::{Payment, Policy};
use crate::model::policy_holder::PolicyHolder;
use crate::model::user::User;
use crate::util::premium::PremiumBreakdown;

/// Position of a quote in the intake flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StepStatus {
    Step1,
    Step2,
    Step3,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QuoteSource {
    #[default]
    Customer,
    Admin,
}

/// Liability coverage option picked on the form. Codes the form does not
/// know deserialize as `none`, so they price at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LiabilityOption {
    #[default]
    #[serde(rename = "none")]
    NoCoverage,
    Option1,
    Option2,
    Option3,
}

impl LiabilityOption {
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "option1" => LiabilityOption::Option1,
            "option2" => LiabilityOption::Option2,
            "option3" => LiabilityOption::Option3,
            _ => LiabilityOption::NoCoverage,
        }
    }

    /// Dollar limit of the coverage, 0 when none was chosen.
    pub fn coverage_limit(self) -> i64 {
        match self {
            LiabilityOption::NoCoverage => 0,
            LiabilityOption::Option1 => 1_000_000,
            LiabilityOption::Option2 => 2_000_000,
            LiabilityOption::Option3 => 3_000_000,
        }
    }
}

impl<'de> Deserialize<'de> for LiabilityOption {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Ok(LiabilityOption::from_code(&code))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub quote_number: String,
    pub user_id: ObjectId,
    pub email: String,
    pub resident_state: Option<String>,
    pub coverage_level: Option<u8>,
    pub liability_coverage: LiabilityOption,
    pub liquor_liability: bool,
    pub covid_disclosure: bool,
    pub special_activities: bool,
    pub base_premium: Option<i64>,
    pub liability_premium: Option<i64>,
    pub liquor_liability_premium: Option<i64>,
    pub total_premium: Option<i64>,
    pub status: StepStatus,
    pub source: QuoteSource,
    pub is_customer_generated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quote {
    /// Writes every premium component and the total together.
    pub fn apply_premiums(&mut self, breakdown: PremiumBreakdown) {
        self.base_premium = Some(breakdown.base_premium);
        self.liability_premium = Some(breakdown.liability_premium);
        self.liquor_liability_premium = Some(breakdown.liquor_liability_premium);
        self.total_premium = Some(breakdown.total_premium);
    }

    pub fn set_source(&mut self, source: QuoteSource) {
        self.source = source;
        self.is_customer_generated = source == QuoteSource::Customer;
    }
}

/// A quote together with everything hanging off it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteAggregate {
    #[serde(flatten)]
    pub quote: Quote,
    pub user: Option<User>,
    pub event: Option<Event>,
    pub venue: Option<Venue>,
    pub policy_holder: Option<PolicyHolder>,
    pub policy: Option<Policy>,
    #[serde(default)]
    pub payments: Vec<Payment>,
}

impl QuoteAggregate {
    pub fn new(quote: Quote) -> Self {
        QuoteAggregate {
            quote,
            user: None,
            event: None,
            venue: None,
            policy_holder: None,
            policy: None,
            payments: Vec::new(),
        }
    }

    pub fn quote_number(&self) -> &str {
        &self.quote.quote_number
    }

    pub fn max_guests(&self) -> Option<u32> {
        self.event.as_ref().map(|event| event.max_guests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_liability_codes() {
        let known: LiabilityOption = serde_json::from_str("\"option3\"").unwrap();
        assert_eq!(known, LiabilityOption::Option3);
        let unknown: LiabilityOption = serde_json::from_str("\"option4\"").unwrap();
        assert_eq!(unknown, LiabilityOption::NoCoverage);
        assert_eq!(serde_json::to_string(&LiabilityOption::NoCoverage).unwrap(), "\"none\"");
    }
}
