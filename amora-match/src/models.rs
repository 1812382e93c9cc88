use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{blocks, likes};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn opposite(&self) -> Gender {
        match self {
            Gender::Male => Gender::Female,
            Gender::Female => Gender::Male,
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Gender::Male => write!(f, "male"),
            Gender::Female => write!(f, "female"),
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            _ => Err(format!("unknown gender: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SexualPreference {
    Heterosexual,
    Homosexual,
    Bisexual,
}

impl std::fmt::Display for SexualPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SexualPreference::Heterosexual => write!(f, "heterosexual"),
            SexualPreference::Homosexual => write!(f, "homosexual"),
            SexualPreference::Bisexual => write!(f, "bisexual"),
        }
    }
}

impl std::str::FromStr for SexualPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "heterosexual" => Ok(SexualPreference::Heterosexual),
            "homosexual" => Ok(SexualPreference::Homosexual),
            "bisexual" => Ok(SexualPreference::Bisexual),
            _ => Err(format!("unknown sexual preference: {s}")),
        }
    }
}

// --- Like ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = likes)]
pub struct Like {
    pub id: Uuid,
    pub liker_id: Uuid,
    pub liked_id: Uuid,
    pub unliked: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = likes)]
pub struct NewLike {
    pub liker_id: Uuid,
    pub liked_id: Uuid,
}

// --- Block ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = blocks)]
pub struct Block {
    pub id: Uuid,
    pub blocker_id: Uuid,
    pub blocked_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = blocks)]
pub struct NewBlock {
    pub blocker_id: Uuid,
    pub blocked_id: Uuid,
}

// --- Read models ---

/// Minimal identity-store view consumed at socket admission time.
#[derive(Debug, Queryable, Serialize, Clone)]
pub struct SessionUser {
    pub id: Uuid,
    pub username: String,
    pub is_online: bool,
}

/// Raw candidate row from the users/profiles/locations join; gender and
/// preference stay text until the orientation filter parses them.
#[derive(Debug, Queryable, Clone)]
pub struct CandidateRow {
    pub user_id: Uuid,
    pub username: String,
    pub gender: String,
    pub sexual_preference: String,
    pub birthday: Option<NaiveDate>,
    pub interests: Option<String>,
    pub fame_rating: i32,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Viewer-side profile state the candidate query needs.
#[derive(Debug, Queryable, Clone)]
pub struct ViewerProfile {
    pub gender: String,
    pub sexual_preference: String,
    pub interests: Option<String>,
}

/// Enriched, sortable candidate returned to the browse endpoint.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CandidateProfile {
    pub id: Uuid,
    pub username: String,
    pub distance_km: Option<i64>,
    pub age: Option<i32>,
    pub common_tags: usize,
    pub fame_rating: i32,
    pub already_liked: bool,
}
