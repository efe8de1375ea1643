//! Analytics service: fetch once, compute many
//!
//! Holds the data store, configuration and the current overrides, and exposes
//! the four core operations. Every call reads fresh snapshots from the store
//! and builds a new result; nothing is cached between calls.

use crate::analytics::{build_summary, AnalyticsSummary};
use crate::bordereaux::{self, AgreementUtilization, ParsedBordereaux, SheetGrid};
use crate::config::AnalyticsConfig;
use crate::currency::{CurrencyNormalizer, RateTable};
use crate::error::Result;
use crate::records::{ClaimRecord, MonetaryRecord, RecordFilter};
use crate::regulatory::{compose_regulatory_forms, RegulatoryForms, ReportingPeriod};
use crate::settings::Overrides;
use crate::store::DataStore;
use chrono::NaiveDate;
use log::info;
use rayon::prelude::*;

pub struct AnalyticsService<S: DataStore + Sync> {
    store: S,
    config: AnalyticsConfig,
    overrides: Overrides,
}

impl<S: DataStore + Sync> AnalyticsService<S> {
    pub fn new(store: S, config: AnalyticsConfig, overrides: Overrides) -> Self {
        Self { store, config, overrides }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }

    /// Replace the overrides used by subsequent calls
    pub fn set_overrides(&mut self, overrides: Overrides) {
        self.overrides = overrides;
    }

    /// Premium, claims and rates fetched concurrently
    fn fetch(&self, filter: &RecordFilter) -> Result<(Vec<MonetaryRecord>, Vec<ClaimRecord>, CurrencyNormalizer)> {
        let ((records, claims), rates) = rayon::join(
            || {
                rayon::join(
                    || self.store.list_monetary_records(filter),
                    || self.store.list_claims(filter),
                )
            },
            || self.store.list_exchange_rates(),
        );
        let fx = CurrencyNormalizer::new(&self.config.base_currency, RateTable::new(rates?));
        Ok((records?, claims?, fx))
    }

    fn summarize(&self, as_of: Option<NaiveDate>, filter: &RecordFilter, overrides: &Overrides) -> Result<AnalyticsSummary> {
        let (records, claims, fx) = self.fetch(filter)?;
        info!(
            "Computing summary over {} monetary records and {} claims",
            records.len(),
            claims.len()
        );
        Ok(build_summary(
            as_of,
            &records,
            &claims,
            overrides,
            &fx,
            self.config.top_counterparties,
        ))
    }

    /// Summary of everything booked on or before `as_of` (all records when None)
    pub fn compute_analytics_summary(&self, as_of: Option<NaiveDate>) -> Result<AnalyticsSummary> {
        self.summarize(as_of, &RecordFilter::up_to(as_of), &self.overrides)
    }

    pub fn compute_agreement_utilization(&self, agreement_id: &str, today: NaiveDate) -> Result<AgreementUtilization> {
        let (agreement, entries) = rayon::join(
            || self.store.get_agreement(agreement_id),
            || self.store.list_bordereaux(agreement_id),
        );
        Ok(bordereaux::compute_utilization(&agreement?, &entries?, today))
    }

    /// Score every agreement in the store, in store order
    pub fn compute_all_utilization(&self, today: NaiveDate) -> Result<Vec<AgreementUtilization>> {
        let agreements = self.store.list_agreements()?;
        let histories = agreements
            .par_iter()
            .map(|a| self.store.list_bordereaux(&a.agreement_id))
            .collect::<Result<Vec<_>>>()?;
        let entries: Vec<_> = histories.into_iter().flatten().collect();
        Ok(bordereaux::score_agreements(&agreements, &entries, today))
    }

    /// Zero detected columns is a valid result; callers check `needs_manual_entry`
    pub fn parse_bordereaux_file(&self, grid: &SheetGrid, file_name: &str) -> Result<ParsedBordereaux> {
        bordereaux::parse_bordereaux_file(grid, file_name)
    }

    /// Summary restricted to records booked inside the period
    pub fn compute_period_summary(&self, period: ReportingPeriod) -> Result<AnalyticsSummary> {
        self.summarize(Some(period.to), &period.filter(), &self.overrides)
    }

    /// Forms for a period, using the overrides passed in rather than the stored ones
    pub fn compose_regulatory_forms(&self, period: ReportingPeriod, overrides: &Overrides) -> Result<RegulatoryForms> {
        overrides.validate()?;
        let summary = self.summarize(Some(period.to), &period.filter(), overrides)?;
        let secondary = self.config.secondary();
        Ok(compose_regulatory_forms(period, &summary, overrides, secondary.as_ref()))
    }
}
