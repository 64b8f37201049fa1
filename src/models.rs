use std::fmt::Debug;

use chrono::{DateTime, Utc};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Role> {
        match value {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

#[derive(PartialEq, Clone)]
pub struct Account {
    pub id: u64,
    pub name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    pub password_hash: Vec<u8>,
    pub password_salt: String,
    pub role: Role,
}

impl Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("username", &self.username)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// The identity carried by a verified session token.
#[derive(Debug, PartialEq, Clone)]
pub struct Session {
    pub account_id: u64,
    pub username: String,
    pub role: Role,
    pub valid_until: DateTime<Utc>,
}

#[derive(PartialEq, Clone)]
pub struct Image {
    pub data: Vec<u8>,
    pub mimetype: String,
}

impl Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field(
                "data",
                &format!("{:?}[..20]", &self.data[..20.min(self.data.len())]),
            )
            .field("mimetype", &self.mimetype)
            .finish()
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Cafe {
    pub id: u64,
    pub name: String,
    pub address: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    /// File name inside the upload directory.
    pub image: Option<String>,
}

/// A cafe together with its aggregated opinions.
#[derive(Debug, PartialEq, Clone)]
pub struct RatedCafe {
    pub cafe: Cafe,
    /// Average over all opinions, `0.0` if there are none.
    pub average_rating: f64,
    pub opinion_count: u64,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Opinion {
    pub id: u64,
    pub account_id: u64,
    pub username: String,
    pub cafe_id: u64,
    pub rating: i32,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Stamp {
    pub account_id: u64,
    pub cafe_id: u64,
    pub visited_at: DateTime<Utc>,
}

/// One page of the passport: a cafe of the catalog and whether the account stamped it.
#[derive(Debug, PartialEq, Clone)]
pub struct PassportEntry {
    pub cafe: Cafe,
    pub visited_at: Option<DateTime<Utc>>,
}

impl PassportEntry {
    pub fn visited(&self) -> bool {
        self.visited_at.is_some()
    }
}

/// A stamp joined with the stamped cafe, as shown on the profile.
#[derive(Debug, PartialEq, Clone)]
pub struct StampedCafe {
    pub cafe: Cafe,
    pub visited_at: DateTime<Utc>,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FollowState {
    Following,
    NotFollowing,
}
