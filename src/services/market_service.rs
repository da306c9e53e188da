//! MarketService — CRUD core for markets and booths over a pooled SQLite
//! connection, with image payloads delegated to the object store.
//!
//! Every mutating operation checks existence *and* ownership before touching
//! anything; a mismatch is reported as not-found so the API never confirms
//! that a foreign record exists. Image uploads always complete before the
//! row referencing them is written.

use crate::{
    models::{
        booth::{Booth, NewBooth},
        market::{Market, NewMarket},
    },
    services::{
        object_store::{ObjectStore, ObjectStoreError},
        update::{BOOTH_FIELDS, FieldValue, MARKET_FIELDS, UpdateError, UpdateSet},
    },
};
use bytes::Bytes;
use serde_json::Value;
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

const MARKET_COLUMNS: &str = "uuid, user_uuid, name, startdate, enddate, img_name";
const BOOTH_COLUMNS: &str = "uuid, market_uuid, name, number, latitude, longitude";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("market `{0}` not found")]
    MarketNotFound(Uuid),
    #[error("booth `{0}` not found")]
    BoothNotFound(Uuid),
    #[error("no fields to update")]
    EmptyUpdate,
    #[error("field `{0}` cannot be updated")]
    DisallowedField(String),
    #[error("invalid value for field `{0}`")]
    InvalidValue(&'static str),
    #[error(transparent)]
    Store(#[from] ObjectStoreError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl From<UpdateError> for CatalogError {
    fn from(err: UpdateError) -> Self {
        match err {
            UpdateError::UnknownField(name) => CatalogError::DisallowedField(name),
            UpdateError::InvalidValue(name) => CatalogError::InvalidValue(name),
        }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// An image attached to a create or update request, buffered whole (form
/// fields can follow the file part, so the body cannot be streamed through).
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Clone)]
pub struct MarketService {
    db: Arc<SqlitePool>,
    objects: ObjectStore,
    url_ttl_secs: u64,
}

impl MarketService {
    pub fn new(db: Arc<SqlitePool>, objects: ObjectStore, url_ttl_secs: u64) -> Self {
        Self {
            db,
            objects,
            url_ttl_secs,
        }
    }

    pub fn db(&self) -> &SqlitePool {
        &self.db
    }

    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    /// Object-store key for an uploaded market image, derived from the
    /// owner and the original filename.
    fn image_key(user_uuid: Uuid, filename: &str) -> String {
        format!("user-uploads/{}/{}", user_uuid, filename)
    }

    /// List a user's markets ascending by start date, each row carrying a
    /// freshly signed image URL when it has an image.
    ///
    /// URL synthesis failure degrades that row's `img_url` to null instead
    /// of failing the batch.
    pub async fn list_markets(&self, user_uuid: Uuid) -> CatalogResult<Vec<Market>> {
        let mut markets = sqlx::query_as::<_, Market>(&format!(
            "SELECT {MARKET_COLUMNS} FROM markets WHERE user_uuid = ? ORDER BY startdate ASC",
        ))
        .bind(user_uuid)
        .fetch_all(&*self.db)
        .await?;

        for market in &mut markets {
            market.img_url = match &market.img_name {
                Some(key) => match self.objects.signed_get_url(key, self.url_ttl_secs) {
                    Ok(url) => Some(url),
                    Err(err) => {
                        warn!(market = %market.uuid, "could not sign image url: {}", err);
                        None
                    }
                },
                None => None,
            };
        }

        Ok(markets)
    }

    /// Create a market, uploading the image (if any) before the insert so a
    /// row never references a key that was not stored.
    pub async fn create_market(
        &self,
        user_uuid: Uuid,
        new: NewMarket,
        image: Option<UploadedImage>,
    ) -> CatalogResult<Market> {
        let img_name = match image {
            Some(image) => {
                let key = Self::image_key(user_uuid, &image.filename);
                self.objects
                    .put(&key, image.bytes, image.content_type.as_deref())
                    .await?;
                Some(key)
            }
            None => None,
        };

        let market = sqlx::query_as::<_, Market>(&format!(
            "INSERT INTO markets (uuid, user_uuid, name, startdate, enddate, img_name)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING {MARKET_COLUMNS}",
        ))
        .bind(Uuid::new_v4())
        .bind(user_uuid)
        .bind(&new.name)
        .bind(new.startdate)
        .bind(new.enddate)
        .bind(&img_name)
        .fetch_one(&*self.db)
        .await?;

        Ok(market)
    }

    /// Partially update a market owned by `user_uuid`.
    ///
    /// Order of checks: empty request, existence/ownership, field
    /// validation, image upload, then a single UPDATE with RETURNING.
    pub async fn update_market(
        &self,
        market_uuid: Uuid,
        user_uuid: Uuid,
        fields: &[(String, Value)],
        image: Option<UploadedImage>,
    ) -> CatalogResult<Market> {
        if fields.is_empty() && image.is_none() {
            return Err(CatalogError::EmptyUpdate);
        }

        self.fetch_market_owned(market_uuid, user_uuid).await?;

        let mut set = UpdateSet::from_pairs(
            fields.iter().map(|(name, value)| (name.as_str(), value)),
            MARKET_FIELDS,
        )?;

        if let Some(image) = image {
            let key = Self::image_key(user_uuid, &image.filename);
            self.objects
                .put(&key, image.bytes, image.content_type.as_deref())
                .await?;
            set.push("img_name", FieldValue::Text(key));
        }

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE markets SET ");
        set.apply(&mut builder);
        builder.push(" WHERE uuid = ");
        builder.push_bind(market_uuid);
        builder.push(" AND user_uuid = ");
        builder.push_bind(user_uuid);
        builder.push(format!(" RETURNING {MARKET_COLUMNS}"));

        builder
            .build_query_as::<Market>()
            .fetch_one(&*self.db)
            .await
            .map_err(|err| match err {
                sqlx::Error::RowNotFound => CatalogError::MarketNotFound(market_uuid),
                other => CatalogError::Sqlx(other),
            })
    }

    /// List the booths of one of the user's markets, in natural order by
    /// number ("2" before "10", suffixed numbers like "12-A" after their
    /// numeric prefix).
    pub async fn list_booths(&self, market_uuid: Uuid, user_uuid: Uuid) -> CatalogResult<Vec<Booth>> {
        self.fetch_market_owned(market_uuid, user_uuid).await?;

        let booths = sqlx::query_as::<_, Booth>(&format!(
            "SELECT {BOOTH_COLUMNS} FROM booths WHERE market_uuid = ?
             ORDER BY CAST(number AS INTEGER) ASC, number ASC",
        ))
        .bind(market_uuid)
        .fetch_all(&*self.db)
        .await?;

        Ok(booths)
    }

    /// Create a booth inside one of the user's markets.
    pub async fn create_booth(&self, user_uuid: Uuid, new: NewBooth) -> CatalogResult<Booth> {
        self.fetch_market_owned(new.market_uuid, user_uuid).await?;

        let booth = sqlx::query_as::<_, Booth>(&format!(
            "INSERT INTO booths (uuid, market_uuid, name, number, latitude, longitude)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING {BOOTH_COLUMNS}",
        ))
        .bind(Uuid::new_v4())
        .bind(new.market_uuid)
        .bind(&new.name)
        .bind(&new.number)
        .bind(new.latitude)
        .bind(new.longitude)
        .fetch_one(&*self.db)
        .await?;

        Ok(booth)
    }

    /// Partially update a booth, checking the ownership chain through its
    /// market first.
    pub async fn update_booth(
        &self,
        booth_uuid: Uuid,
        user_uuid: Uuid,
        fields: &[(String, Value)],
    ) -> CatalogResult<Booth> {
        if fields.is_empty() {
            return Err(CatalogError::EmptyUpdate);
        }

        self.fetch_booth_owned(booth_uuid, user_uuid).await?;

        let set = UpdateSet::from_pairs(
            fields.iter().map(|(name, value)| (name.as_str(), value)),
            BOOTH_FIELDS,
        )?;

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE booths SET ");
        set.apply(&mut builder);
        builder.push(" WHERE uuid = ");
        builder.push_bind(booth_uuid);
        builder.push(format!(" RETURNING {BOOTH_COLUMNS}"));

        builder
            .build_query_as::<Booth>()
            .fetch_one(&*self.db)
            .await
            .map_err(|err| match err {
                sqlx::Error::RowNotFound => CatalogError::BoothNotFound(booth_uuid),
                other => CatalogError::Sqlx(other),
            })
    }

    /// Fetch a market by id and owner. Absence and ownership mismatch are
    /// the same failure.
    async fn fetch_market_owned(&self, market_uuid: Uuid, user_uuid: Uuid) -> CatalogResult<Market> {
        sqlx::query_as::<_, Market>(&format!(
            "SELECT {MARKET_COLUMNS} FROM markets WHERE uuid = ? AND user_uuid = ?",
        ))
        .bind(market_uuid)
        .bind(user_uuid)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => CatalogError::MarketNotFound(market_uuid),
            other => CatalogError::Sqlx(other),
        })
    }

    /// Fetch a booth by id, requiring the market it belongs to be owned by
    /// `user_uuid`.
    async fn fetch_booth_owned(&self, booth_uuid: Uuid, user_uuid: Uuid) -> CatalogResult<Booth> {
        sqlx::query_as::<_, Booth>(
            "SELECT b.uuid, b.market_uuid, b.name, b.number, b.latitude, b.longitude
             FROM booths b
             JOIN markets m ON m.uuid = b.market_uuid
             WHERE b.uuid = ? AND m.user_uuid = ?",
        )
        .bind(booth_uuid)
        .bind(user_uuid)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => CatalogError::BoothNotFound(booth_uuid),
            other => CatalogError::Sqlx(other),
        })
    }
}
