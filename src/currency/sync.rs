//! Exchange-rate synchronisation over an ordered list of sources
//!
//! Sources are tried in order and the first success wins. There is no retry
//! once the list is exhausted: a full outage is an error, and stale quotes are
//! only ever reached through the explicit `cached_rates` fallback.

use super::RateTable;
use crate::error::{AnalyticsError, Result};
use crate::records::loader::load_exchange_rates_from_reader;
use crate::records::ExchangeRate;
use chrono::NaiveDate;
use log::{info, warn};
use std::fs::File;
use std::path::PathBuf;

/// A place exchange-rate quotes can be fetched from
pub trait RateSource {
    fn name(&self) -> &str;

    /// Fetch the quotes published for `date`
    fn fetch(&self, date: NaiveDate) -> Result<Vec<ExchangeRate>>;
}

/// Quotes read from a CSV file (Currency,Date,Rate,Nominal)
pub struct CsvRateSource {
    name: String,
    path: PathBuf,
}

impl CsvRateSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: path.display().to_string(),
            path,
        }
    }
}

impl RateSource for CsvRateSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self, date: NaiveDate) -> Result<Vec<ExchangeRate>> {
        let file = File::open(&self.path)
            .map_err(|e| AnalyticsError::unavailable(format!("{}: {}", self.name, e)))?;
        let rates: Vec<ExchangeRate> = load_exchange_rates_from_reader(file)?
            .into_iter()
            .filter(|r| r.date == date)
            .collect();

        if rates.is_empty() {
            return Err(AnalyticsError::unavailable(format!(
                "{}: no quotes published for {}",
                self.name, date
            )));
        }
        Ok(rates)
    }
}

/// Outcome of a successful sync
#[derive(Debug, Clone)]
pub struct RateSyncOutcome {
    /// Name of the source that answered
    pub source: String,
    pub rates: Vec<ExchangeRate>,
    /// Errors from sources tried before the successful one
    pub skipped: Vec<String>,
}

/// Try each source in order, returning the first successful fetch
pub fn sync_rates(sources: &[Box<dyn RateSource + Send + Sync>], date: NaiveDate) -> Result<RateSyncOutcome> {
    let mut failures = Vec::new();

    for source in sources {
        match source.fetch(date) {
            Ok(rates) => {
                info!("Fetched {} rates for {} from {}", rates.len(), date, source.name());
                return Ok(RateSyncOutcome {
                    source: source.name().to_string(),
                    rates,
                    skipped: failures,
                });
            }
            Err(e) => {
                warn!("Rate source {} failed: {}", source.name(), e);
                failures.push(format!("{}: {}", source.name(), e));
            }
        }
    }

    Err(AnalyticsError::unavailable(format!(
        "all {} rate sources failed for {} [{}]",
        sources.len(),
        date,
        failures.join("; ")
    )))
}

/// Stored quotes served in place of a sync
#[derive(Debug)]
pub struct CachedRates {
    pub rates: Vec<ExchangeRate>,
    /// `RateUnavailable` for each requested currency with nothing cached
    pub unavailable: Vec<AnalyticsError>,
}

/// Most recent cached quote per currency, whatever its date.
///
/// Every currency in the table is served when `currencies` is empty.
pub fn cached_rates(table: &RateTable, currencies: &[String], date: NaiveDate) -> CachedRates {
    let wanted = if currencies.is_empty() {
        table.currencies()
    } else {
        currencies.iter().map(|c| c.trim().to_uppercase()).collect()
    };

    let mut cached = CachedRates { rates: Vec::new(), unavailable: Vec::new() };
    for currency in wanted {
        match table.latest_cached(&currency) {
            Some(quote) => {
                if quote.date != date {
                    warn!("Serving cached {} quote from {} for {}", currency, quote.date, date);
                }
                cached.rates.push(quote.clone());
            }
            None => cached.unavailable.push(AnalyticsError::RateUnavailable { currency, date }),
        }
    }
    cached
}
