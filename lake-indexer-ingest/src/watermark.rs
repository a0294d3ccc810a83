//! Watermark resolution.
//!
//! The watermark of a family is the newest `time` already in its index. It is
//! never stored anywhere else. With the midnight floor, a run never reaches
//! further back than the start of the current local day.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::{debug, info};

use lake_indexer_repository::opensearch::index_config::TIME_FIELD;
use lake_indexer_repository::SearchIndexClient;
use lake_indexer_shared::Watermark;

use crate::errors::IngestError;

/// Configuration for watermark resolution.
#[derive(Debug, Clone)]
pub struct WatermarkConfig {
    /// Zone whose midnight is the floor.
    pub time_zone: Tz,
    /// Never return a watermark older than local midnight.
    pub midnight_floor: bool,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            time_zone: chrono_tz::US::Eastern,
            midnight_floor: true,
        }
    }
}

/// Epoch milliseconds of the most recent local midnight at `now`.
///
/// Where midnight is skipped by a daylight saving change the first instant of
/// the day is used.
pub fn local_midnight(time_zone: Tz, now: DateTime<Utc>) -> Option<Watermark> {
    let midnight = now
        .with_timezone(&time_zone)
        .date_naive()
        .and_hms_opt(0, 0, 0)?;
    time_zone
        .from_local_datetime(&midnight)
        .earliest()
        .or_else(|| {
            time_zone
                .from_local_datetime(&(midnight + Duration::hours(1)))
                .earliest()
        })
        .map(|dt| dt.timestamp_millis())
}

/// Resolves the lower bound of the next extraction window.
pub struct WatermarkResolver {
    client: Arc<SearchIndexClient>,
    config: WatermarkConfig,
}

impl WatermarkResolver {
    pub fn new(client: Arc<SearchIndexClient>, config: WatermarkConfig) -> Self {
        Self { client, config }
    }

    /// Resolve the watermark of `index` now.
    pub async fn resolve(&self, index: &str) -> Result<Option<Watermark>, IngestError> {
        self.resolve_at(index, Utc::now()).await
    }

    /// Resolve the watermark of `index` as of `now`.
    ///
    /// `None` means the whole source is in scope: the index is missing or
    /// empty and no floor applies.
    pub async fn resolve_at(
        &self,
        index: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Watermark>, IngestError> {
        let newest = if self.client.index_exists(index).await? {
            self.client
                .max_value(index, TIME_FIELD)
                .await?
                .map(|value| value as Watermark)
        } else {
            debug!(index = %index, "Index does not exist yet");
            None
        };

        if !self.config.midnight_floor {
            info!(index = %index, watermark = ?newest, "Watermark resolved");
            return Ok(newest);
        }

        let midnight = local_midnight(self.config.time_zone, now).ok_or_else(|| {
            IngestError::config(format!("no midnight in time zone {}", self.config.time_zone))
        })?;
        let watermark = newest.map_or(midnight, |newest| newest.max(midnight));

        info!(
            index = %index,
            newest = ?newest,
            midnight = midnight,
            watermark = watermark,
            "Watermark resolved"
        );
        Ok(Some(watermark))
    }
}
