use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A customer identity, deduplicated by email and shared across quotes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Name and phone copied onto a user from the policyholder section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

impl UserProfile {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.phone.is_none()
    }
}

impl User {
    pub fn new(email: &str, profile: &UserProfile) -> Self {
        User {
            id: None,
            email: normalize_email(email),
            first_name: profile.first_name.clone().unwrap_or_default(),
            last_name: profile.last_name.clone().unwrap_or_default(),
            phone: profile.phone.clone(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Returns true when anything changed.
    pub fn apply_profile(&mut self, profile: &UserProfile) -> bool {
        let mut changed = false;
        if let Some(first_name) = &profile.first_name {
            if &self.first_name != first_name {
                self.first_name = first_name.clone();
                changed = true;
            }
        }
        if let Some(last_name) = &profile.last_name {
            if &self.last_name != last_name {
                self.last_name = last_name.clone();
                changed = true;
            }
        }
        if profile.phone.is_some() && self.phone != profile.phone {
            self.phone = profile.phone.clone();
            changed = true;
        }
        changed
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_profile_reports_changes() {
        let mut user = User::new(" Jo@Example.com ", &UserProfile::default());
        assert_eq!(user.email, "jo@example.com");
        assert!(!user.apply_profile(&UserProfile::default()));
        let profile = UserProfile {
            first_name: Some("Jo".to_string()),
            phone: Some("555-0100".to_string()),
            ..Default::default()
        };
        assert!(user.apply_profile(&profile));
        assert!(!user.apply_profile(&profile));
        assert_eq!(user.first_name, "Jo");
        assert_eq!(user.last_name, "");
    }
}
