//! Sources of estimated company valuations for portfolio roll-ups.
//!
//! None of these are market data. Every source is deterministic for a given
//! input, and its [`label`](ValuationSource::label) travels with the
//! portfolio it produced.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{LedgerError, Result};
use crate::models::Project;

/// Supplies the current valuation of a project's company, in minor units.
pub trait ValuationSource: Send + Sync {
    /// Short human-readable name of the estimation basis.
    fn label(&self) -> &str;

    /// `None` means no estimate is available; holdings are then carried at cost.
    fn valuation(&self, project: &Project, now: DateTime<Utc>) -> Result<Option<i64>>;
}

/// The valuation stated in the project's own terms.
#[derive(Debug, Default, Clone, Copy)]
pub struct TermsValuation;

impl ValuationSource for TermsValuation {
    fn label(&self) -> &str {
        "terms-valuation"
    }

    fn valuation(&self, project: &Project, _now: DateTime<Utc>) -> Result<Option<i64>> {
        Ok(project.valuation)
    }
}

/// The terms valuation compounded at a fixed annual rate for each whole
/// year since the project was created.
#[derive(Debug, Clone)]
pub struct FixedGrowth {
    annual_rate_bps: u32,
    label: String,
}

impl FixedGrowth {
    pub fn new(annual_rate_bps: u32) -> Self {
        Self {
            annual_rate_bps,
            label: format!("fixed-growth-{}bps", annual_rate_bps),
        }
    }

    pub fn annual_rate_bps(&self) -> u32 {
        self.annual_rate_bps
    }
}

impl ValuationSource for FixedGrowth {
    fn label(&self) -> &str {
        &self.label
    }

    fn valuation(&self, project: &Project, now: DateTime<Utc>) -> Result<Option<i64>> {
        let Some(base) = project.valuation else {
            return Ok(None);
        };
        let years = ((now - project.created_at).num_days() / 365).max(0);
        let rate = self.annual_rate_bps as f64 / 10_000.0;
        let factor = (1.0 + rate).powi(years.min(i32::MAX as i64) as i32);
        to_minor_units(base as f64 * factor, "grown valuation").map(Some)
    }
}

/// Round an estimate to minor units, failing when it leaves the `i64` range.
pub(crate) fn to_minor_units(value: f64, what: &str) -> Result<i64> {
    // 2^63 is the first f64 above i64::MAX
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    let rounded = value.round();
    if rounded.is_finite() && rounded >= -LIMIT && rounded < LIMIT {
        Ok(rounded as i64)
    } else {
        Err(LedgerError::Overflow(format!("{} {} exceeds the i64 range", what, value)))
    }
}

#[derive(Debug, Deserialize)]
struct FeedValuation {
    valuation: i64,
}

/// Fetches valuations from an external HTTP service.
///
/// Requests `GET {base_url}/valuations/{project_id}` and expects
/// `{"valuation": <minor units>}`. A 404 means the feed has no figure for
/// the project.
pub struct HttpValuationFeed {
    base_url: String,
    client: Client,
}

impl HttpValuationFeed {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl ValuationSource for HttpValuationFeed {
    fn label(&self) -> &str {
        "valuation-feed"
    }

    fn valuation(&self, project: &Project, _now: DateTime<Utc>) -> Result<Option<i64>> {
        let url = format!("{}/valuations/{}", self.base_url, project.id);
        debug!(%url, "fetching valuation");

        let resp = self.client.get(&url).send()?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let data: FeedValuation = resp.error_for_status()?.json()?;
        if data.valuation <= 0 {
            warn!(project_id = %project.id, valuation = data.valuation, "ignoring non-positive feed valuation");
            return Ok(None);
        }
        Ok(Some(data.valuation))
    }
}
