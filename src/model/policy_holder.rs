use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::dto::quote_dto::PolicyHolderInput;

/// The named insured on a quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyHolder {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub quote_id: Option<ObjectId>,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub relationship: String,
    pub hear_about_us: Option<String>,
    pub address: String,
    pub country: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub legal_notices: bool,
    pub completing_form_name: Option<String>,
}

impl PolicyHolder {
    pub fn merged(
        existing: Option<&PolicyHolder>,
        incoming: &PolicyHolderInput,
        quote_id: Option<ObjectId>,
    ) -> PolicyHolder {
        let text = |new: &Option<String>, old: Option<&String>| {
            new.clone().or_else(|| old.cloned()).unwrap_or_default()
        };
        PolicyHolder {
            id: existing.and_then(|h| h.id),
            quote_id: quote_id.or_else(|| existing.and_then(|h| h.quote_id)),
            first_name: text(&incoming.first_name, existing.map(|h| &h.first_name)),
            last_name: text(&incoming.last_name, existing.map(|h| &h.last_name)),
            phone: text(&incoming.phone, existing.map(|h| &h.phone)),
            relationship: text(&incoming.relationship, existing.map(|h| &h.relationship)),
            hear_about_us: incoming
                .hear_about_us
                .clone()
                .or_else(|| existing.and_then(|h| h.hear_about_us.clone())),
            address: text(&incoming.address, existing.map(|h| &h.address)),
            country: text(&incoming.country, existing.map(|h| &h.country)),
            city: text(&incoming.city, existing.map(|h| &h.city)),
            state: text(&incoming.state, existing.map(|h| &h.state)),
            zip: text(&incoming.zip, existing.map(|h| &h.zip)),
            legal_notices: incoming
                .legal_notices
                .or_else(|| existing.map(|h| h.legal_notices))
                .unwrap_or(false),
            completing_form_name: incoming
                .completing_form_name
                .clone()
                .or_else(|| existing.and_then(|h| h.completing_form_name.clone())),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}
