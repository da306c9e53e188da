//! Represents a market event — a time-boxed event owned by a user.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A market record as stored in the `markets` table.
///
/// `img_url` is never persisted: it is synthesized at read time from
/// `img_name` as a time-limited signed URL, and is `None` everywhere else.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Market {
    /// Unique identifier for this market.
    pub uuid: Uuid,

    /// Owning user.
    pub user_uuid: Uuid,

    /// Display name (non-empty).
    pub name: String,

    /// First day of the event.
    pub startdate: NaiveDate,

    /// Last day of the event.
    pub enddate: NaiveDate,

    /// Object-store key of the market image, if one was uploaded.
    pub img_name: Option<String>,

    /// Read-time projection only; populated by list/fetch paths.
    #[sqlx(skip)]
    pub img_url: Option<String>,
}

/// Fields accepted when creating a market.
#[derive(Debug, Clone)]
pub struct NewMarket {
    pub name: String,
    pub startdate: NaiveDate,
    pub enddate: NaiveDate,
}
