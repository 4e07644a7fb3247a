//! Catalog reference data: books, centers, users and their identifiers.
//!
//! Books and centers are read-only inputs to both ledgers. Users own the
//! append-only distribution log (see [`crate::ledger`]) and the running totals
//! derived from it (see [`crate::aggregate`]).

use crate::aggregate::Totals;
use crate::error::{LedgerError, Result};
use crate::ledger::DistributionLog;
use crate::money::{Money, Points};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Creates a `", stringify!($name), "` from a UUID")]
            #[must_use]
            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Returns the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = LedgerError;

            fn from_str(s: &str) -> Result<Self> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|_| LedgerError::invalid(format!("malformed {} id: {s:?}", $label)))
            }
        }
    };
}

entity_id!(
    /// Unique identifier for a field worker.
    UserId,
    "user"
);
entity_id!(
    /// Unique identifier for a catalog book.
    BookId,
    "book"
);
entity_id!(
    /// Unique identifier for a regional center.
    CenterId,
    "center"
);
entity_id!(
    /// Unique identifier for a stock entry.
    StockId,
    "stock"
);

/// Book size/series category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookType {
    /// Mega Big
    #[serde(rename = "MB")]
    MegaBig,
    /// Big
    #[serde(rename = "B")]
    Big,
    /// Medium
    #[serde(rename = "M")]
    Medium,
    /// Small
    #[serde(rename = "S")]
    Small,
    /// Srimad Bhagavatam set
    #[serde(rename = "SB")]
    SrimadBhagavatam,
    /// Chaitanya Charitamrita set
    #[serde(rename = "CC")]
    ChaitanyaCharitamrita,
}

impl BookType {
    /// All book types in catalog order.
    pub const ALL: [Self; 6] = [
        Self::MegaBig,
        Self::Big,
        Self::Medium,
        Self::Small,
        Self::SrimadBhagavatam,
        Self::ChaitanyaCharitamrita,
    ];

    /// Short code used in storage and reports.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MegaBig => "MB",
            Self::Big => "B",
            Self::Medium => "M",
            Self::Small => "S",
            Self::SrimadBhagavatam => "SB",
            Self::ChaitanyaCharitamrita => "CC",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::MegaBig => "Mega Big",
            Self::Big => "Big",
            Self::Medium => "Medium",
            Self::Small => "Small",
            Self::SrimadBhagavatam => "Srimad Bhagavatam",
            Self::ChaitanyaCharitamrita => "Chaitanya Charitamrita",
        }
    }
}

impl fmt::Display for BookType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for BookType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.code() == s.trim())
            .ok_or_else(|| LedgerError::invalid(format!("unknown book type: {s:?}")))
    }
}

/// Language a book is printed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    /// Hindi
    Hindi,
    /// English
    English,
    /// Telugu
    Telugu,
    /// Kannada
    Kannada,
    /// Tamil
    Tamil,
    /// Bengali
    Bengali,
    /// Oriya
    Oriya,
    /// Marathi
    Marathi,
}

impl Language {
    /// All supported languages.
    pub const ALL: [Self; 8] = [
        Self::Hindi,
        Self::English,
        Self::Telugu,
        Self::Kannada,
        Self::Tamil,
        Self::Bengali,
        Self::Oriya,
        Self::Marathi,
    ];

    /// Name used in storage and reports.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Hindi => "Hindi",
            Self::English => "English",
            Self::Telugu => "Telugu",
            Self::Kannada => "Kannada",
            Self::Tamil => "Tamil",
            Self::Bengali => "Bengali",
            Self::Oriya => "Oriya",
            Self::Marathi => "Marathi",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Language {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|l| l.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| LedgerError::invalid(format!("unknown language: {s:?}")))
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::invalid(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

/// A catalog book.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Book identifier
    pub id: BookId,
    /// Title
    pub name: String,
    /// Size/series category
    #[serde(rename = "type")]
    pub book_type: BookType,
    /// Print language
    pub language: Language,
    /// Reward points credited per hand-out
    pub point: Points,
    /// List price
    pub price: Money,
}

impl Book {
    /// Creates a book after validating its fields.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidArgument`] for an empty name or a negative
    /// point value or price.
    pub fn new(
        name: &str,
        book_type: BookType,
        language: Language,
        point: Points,
        price: Money,
    ) -> Result<Self> {
        let name = required("book name", name)?;
        if point.is_negative() {
            return Err(LedgerError::invalid("book point value cannot be negative"));
        }
        if price.is_negative() {
            return Err(LedgerError::invalid("book price cannot be negative"));
        }
        Ok(Self {
            id: BookId::new(),
            name,
            book_type,
            language,
            point,
            price,
        })
    }
}

/// A regional center and its running totals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Center {
    /// Center identifier
    pub id: CenterId,
    /// Unique display name
    pub name: String,
    /// Points, donation and loss accumulated by all users of this center
    #[serde(flatten)]
    pub totals: Totals,
}

impl Center {
    /// Creates a center with zero totals.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidArgument`] for an empty name.
    pub fn new(name: &str) -> Result<Self> {
        Ok(Self {
            id: CenterId::new(),
            name: required("center name", name)?,
            totals: Totals::default(),
        })
    }
}

/// A field worker, their running totals and their distribution history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User identifier
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Phone number
    pub number: String,
    /// Owning center, fixed at creation
    pub center: CenterId,
    /// Running totals over `distributions`
    #[serde(flatten)]
    pub totals: Totals,
    /// Append-only hand-out history
    pub distributions: DistributionLog,
    /// When the user was registered
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Creates a user with zero totals and an empty history.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidArgument`] for an empty name or number.
    pub fn new(
        name: &str,
        number: &str,
        center: CenterId,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        Ok(Self {
            id: UserId::new(),
            name: required("user name", name)?,
            number: required("phone number", number)?,
            center,
            totals: Totals::default(),
            distributions: DistributionLog::new(),
            created_at,
        })
    }
}
