//! Represents a booth — a location/identity record inside one market.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A booth record as stored in the `booths` table.
///
/// `number` is text rather than numeric: booth numbers like "12-A" are
/// legitimate. Latitude/longitude are absent when no location was recorded.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Booth {
    /// Unique identifier for this booth.
    pub uuid: Uuid,

    /// The market this booth belongs to.
    pub market_uuid: Uuid,

    /// Display name.
    pub name: String,

    /// Booth number as shown on signage (alphanumeric with dashes).
    pub number: String,

    /// Recorded location, if any.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Fields accepted when creating a booth.
#[derive(Debug, Clone)]
pub struct NewBooth {
    pub market_uuid: Uuid,
    pub name: String,
    pub number: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}
