//! Library member models

use std::convert::Infallible;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::DeserializeFromStr;
use utoipa::ToSchema;

use super::lenient_timestamp;
use super::loan::UserRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, DeserializeFromStr, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberStatus {
    Active,
    Suspended,
    Banned,
    Unknown,
}

impl FromStr for MemberStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_uppercase().as_str() {
            "ACTIVE" => MemberStatus::Active,
            "SUSPENDED" => MemberStatus::Suspended,
            "BANNED" => MemberStatus::Banned,
            _ => MemberStatus::Unknown,
        })
    }
}

impl MemberStatus {
    pub fn label(&self) -> &'static str {
        match self {
            MemberStatus::Active => "Active",
            MemberStatus::Suspended => "Suspended",
            MemberStatus::Banned => "Banned",
            MemberStatus::Unknown => "Unknown",
        }
    }

    /// Value accepted by `PATCH /members/:id/status`
    pub fn wire_name(&self) -> Option<&'static str> {
        match self {
            MemberStatus::Active => Some("ACTIVE"),
            MemberStatus::Suspended => Some("SUSPENDED"),
            MemberStatus::Banned => Some("BANNED"),
            MemberStatus::Unknown => None,
        }
    }
}

/// Member as sent by `/members` endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPayload {
    pub id: i64,
    #[serde(default, alias = "memberCode", alias = "code")]
    pub membership_code: Option<String>,
    #[serde(default)]
    pub status: Option<MemberStatus>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user: Option<UserRef>,
    #[serde(default, alias = "joinedAt", alias = "joinDate", deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Canonical member record
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Member {
    pub id: i64,
    pub code: Option<String>,
    pub status: MemberStatus,
    pub status_label: String,
    pub name: String,
    pub email: Option<String>,
    pub username: Option<String>,
    pub joined_at: Option<DateTime<Utc>>,
    pub joined_label: String,
}

impl From<MemberPayload> for Member {
    fn from(p: MemberPayload) -> Self {
        let user = p.user;
        let pick = |own: Option<String>, linked: Option<String>| {
            own.into_iter()
                .chain(linked)
                .map(|v| v.trim().to_string())
                .find(|v| !v.is_empty())
        };
        let username = pick(None, user.as_ref().and_then(|u| u.username.clone()));
        let name = pick(p.name, user.as_ref().and_then(|u| u.name.clone()))
            .or_else(|| username.clone())
            .unwrap_or_else(|| format!("Member #{}", p.id));
        let status = p.status.unwrap_or(MemberStatus::Unknown);

        Self {
            id: p.id,
            code: p.membership_code,
            status,
            status_label: status.label().to_string(),
            name,
            email: pick(p.email, user.and_then(|u| u.email)),
            username,
            joined_at: p.created_at,
            joined_label: crate::status::format_date(p.created_at),
        }
    }
}
