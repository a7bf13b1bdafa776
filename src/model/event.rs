use bson::oid::ObjectId;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::dto::quote_dto::{EventInput, VenueInput};

pub const DEFAULT_EVENT_TYPE: &str = "wedding";
pub const DEFAULT_COUNTRY: &str = "United States";
pub const CRUISE_SHIP: &str = "cruise_ship";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub quote_id: ObjectId,
    pub event_type: String,
    pub event_date: NaiveDate,
    pub max_guests: u32,
    pub honoree1_first_name: Option<String>,
    pub honoree1_last_name: Option<String>,
    pub honoree2_first_name: Option<String>,
    pub honoree2_last_name: Option<String>,
}

impl Event {
    /// Builds the row to persist from an incoming partial and whatever is
    /// already stored, falling back to placeholders for the rest.
    pub fn merged(existing: Option<&Event>, incoming: &EventInput, quote_id: ObjectId) -> Event {
        let pick = |new: &Option<String>, old: Option<&Option<String>>| {
            new.clone().or_else(|| old.cloned().flatten())
        };
        Event {
            id: existing.and_then(|e| e.id),
            quote_id,
            event_type: incoming
                .event_type
                .clone()
                .or_else(|| existing.map(|e| e.event_type.clone()))
                .unwrap_or_else(|| DEFAULT_EVENT_TYPE.to_string()),
            event_date: incoming
                .event_date
                .or_else(|| existing.map(|e| e.event_date))
                .unwrap_or_else(|| Utc::now().date_naive()),
            max_guests: incoming
                .max_guests
                .or_else(|| existing.map(|e| e.max_guests))
                .unwrap_or(0),
            honoree1_first_name: pick(&incoming.honoree1_first_name, existing.map(|e| &e.honoree1_first_name)),
            honoree1_last_name: pick(&incoming.honoree1_last_name, existing.map(|e| &e.honoree1_last_name)),
            honoree2_first_name: pick(&incoming.honoree2_first_name, existing.map(|e| &e.honoree2_first_name)),
            honoree2_last_name: pick(&incoming.honoree2_last_name, existing.map(|e| &e.honoree2_last_name)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Venue {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub event_id: Option<ObjectId>,
    pub name: String,
    pub address1: String,
    pub address2: Option<String>,
    pub country: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub ceremony_location_type: String,
    pub indoor_outdoor: String,
    pub venue_as_insured: bool,
}

/// Labels a client should show for the repurposed address fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VenueLabels {
    pub address1: &'static str,
    pub city: &'static str,
}

impl Venue {
    pub fn merged(existing: Option<&Venue>, incoming: &VenueInput, event_id: Option<ObjectId>) -> Venue {
        let text = |new: &Option<String>, old: Option<&String>, default: &str| {
            new.clone()
                .or_else(|| old.cloned())
                .unwrap_or_else(|| default.to_string())
        };
        Venue {
            id: existing.and_then(|v| v.id),
            event_id: event_id.or_else(|| existing.and_then(|v| v.event_id)),
            name: text(&incoming.name, existing.map(|v| &v.name), ""),
            address1: text(&incoming.address1, existing.map(|v| &v.address1), ""),
            address2: incoming
                .address2
                .clone()
                .or_else(|| existing.and_then(|v| v.address2.clone())),
            country: text(&incoming.country, existing.map(|v| &v.country), DEFAULT_COUNTRY),
            city: text(&incoming.city, existing.map(|v| &v.city), ""),
            state: text(&incoming.state, existing.map(|v| &v.state), ""),
            zip: text(&incoming.zip, existing.map(|v| &v.zip), ""),
            ceremony_location_type: text(
                &incoming.ceremony_location_type,
                existing.map(|v| &v.ceremony_location_type),
                "",
            ),
            indoor_outdoor: text(&incoming.indoor_outdoor, existing.map(|v| &v.indoor_outdoor), ""),
            venue_as_insured: incoming
                .venue_as_insured
                .or_else(|| existing.map(|v| v.venue_as_insured))
                .unwrap_or(false),
        }
    }

    pub fn is_cruise_ship(&self) -> bool {
        self.ceremony_location_type == CRUISE_SHIP
    }

    /// Cruise ceremonies reuse `address1`/`city` for cruise line and port.
    pub fn display_labels(&self) -> VenueLabels {
        if self.is_cruise_ship() {
            VenueLabels { address1: "Cruise Line", city: "Departure Port" }
        } else {
            VenueLabels { address1: "Address", city: "City" }
        }
    }
}
