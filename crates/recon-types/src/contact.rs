use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Store-assigned identifier of a contact row.
///
/// Ids are handed out from a monotonic sequence, so a smaller id was
/// allocated earlier. Ids are never reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactId(u64);

impl ContactId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw numeric id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContactId({})", self.0)
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ContactId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl FromStr for ContactId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| TypeError::InvalidContactId(s.to_string()))
    }
}

/// Whether a contact is the representative of its identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkPrecedence {
    Primary,
    Secondary,
}

impl fmt::Display for LinkPrecedence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Secondary => write!(f, "secondary"),
        }
    }
}

impl FromStr for LinkPrecedence {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" => Ok(Self::Primary),
            "secondary" => Ok(Self::Secondary),
            _ => Err(TypeError::InvalidPrecedence(s.to_string())),
        }
    }
}

/// Position of a contact in its identity.
///
/// A secondary always carries the id of the primary it belongs to, so a
/// `linkedId` without secondary precedence (or the reverse) cannot be
/// expressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "linkPrecedence", rename_all = "lowercase")]
pub enum Link {
    Primary,
    Secondary {
        #[serde(rename = "linkedId")]
        linked_id: ContactId,
    },
}

impl Link {
    pub fn secondary_of(primary: ContactId) -> Self {
        Self::Secondary { linked_id: primary }
    }

    pub fn precedence(&self) -> LinkPrecedence {
        match self {
            Self::Primary => LinkPrecedence::Primary,
            Self::Secondary { .. } => LinkPrecedence::Secondary,
        }
    }

    /// The primary this link points at, if secondary.
    pub fn linked_id(&self) -> Option<ContactId> {
        match self {
            Self::Primary => None,
            Self::Secondary { linked_id } => Some(*linked_id),
        }
    }
}

/// A stored contact: one observed (email, phone) pair.
///
/// The pair and `created_at` are fixed at creation. Only `link` (and
/// `updated_at` with it) changes afterwards, when the contact's identity is
/// merged into an older one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: ContactId,
    pub email: Option<String>,
    #[serde(rename = "phoneNumber")]
    pub phone: Option<String>,
    #[serde(flatten)]
    pub link: Link,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    pub fn precedence(&self) -> LinkPrecedence {
        self.link.precedence()
    }

    pub fn linked_id(&self) -> Option<ContactId> {
        self.link.linked_id()
    }

    pub fn is_primary(&self) -> bool {
        matches!(self.link, Link::Primary)
    }

    /// Ordering key used to elect the primary of an identity: earliest
    /// creation wins, smaller id breaks ties.
    pub fn seniority(&self) -> (DateTime<Utc>, ContactId) {
        (self.created_at, self.id)
    }

    /// The contact that represents this one's identity: itself when
    /// primary, otherwise the contact it links to.
    pub fn root_id(&self) -> ContactId {
        self.linked_id().unwrap_or(self.id)
    }
}

/// A contact that has not been persisted yet. The store assigns the id and
/// timestamps on insert.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewContact {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub link: Link,
}

impl NewContact {
    pub fn primary(email: Option<String>, phone: Option<String>) -> Self {
        Self {
            email,
            phone,
            link: Link::Primary,
        }
    }

    pub fn secondary(email: Option<String>, phone: Option<String>, primary: ContactId) -> Self {
        Self {
            email,
            phone,
            link: Link::secondary_of(primary),
        }
    }
}
