//! Load booked records from a directory of CSV extracts
//!
//! Amount columns go through the same lenient number coercion as uploaded
//! bordereaux, so thousands separators and currency symbols are accepted.

use super::{
    AgreementStatus, BindingAgreement, BordereauxEntry, BordereauxStatus, BordereauxType,
    Channel, ClaimRecord, ExchangeRate, MonetaryRecord, Structure,
};
use crate::bordereaux::parse_number;
use crate::config::AnalyticsConfig;
use crate::currency::RateTable;
use crate::error::{AnalyticsError, Result};
use chrono::NaiveDate;
use csv::{Reader, Writer};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

pub const MONETARY_RECORDS_FILE: &str = "monetary_records.csv";
pub const CLAIMS_FILE: &str = "claims.csv";
pub const BORDEREAUX_FILE: &str = "bordereaux.csv";
pub const AGREEMENTS_FILE: &str = "agreements.csv";
pub const EXCHANGE_RATES_FILE: &str = "exchange_rates.csv";

fn amount(field: &Option<String>) -> f64 {
    field.as_deref().and_then(parse_number).unwrap_or(0.0)
}

/// Our share as a fraction; missing means the full line.
///
/// Percentages must carry a `%` sign: a bare 1.5 could be either.
fn share(field: &Option<String>, owner: &str) -> Result<f64> {
    let Some(raw) = field.as_deref() else {
        return Ok(1.0);
    };
    let Some(value) = parse_number(raw) else {
        return Ok(1.0);
    };
    let value = if raw.contains('%') { value / 100.0 } else { value };
    if !(0.0..=1.0).contains(&value) {
        return Err(AnalyticsError::invalid(format!(
            "{}: our share {} outside 0..1 (write percentages as e.g. 40%)",
            owner,
            raw.trim()
        )));
    }
    Ok(value)
}

fn non_empty(field: Option<String>) -> Option<String> {
    field.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn open(dir: &Path, name: &str) -> Result<File> {
    File::open(dir.join(name)).map_err(|e| {
        AnalyticsError::unavailable(format!("{}: {}", dir.join(name).display(), e))
    })
}

/// Raw row of monetary_records.csv
#[derive(Debug, serde::Deserialize)]
struct MonetaryRow {
    #[serde(rename = "RecordId")]
    record_id: String,
    #[serde(rename = "RecordType")]
    record_type: String,
    #[serde(rename = "Territory", default)]
    territory: Option<String>,
    #[serde(rename = "Currency")]
    currency: String,
    #[serde(rename = "BookedOn")]
    booked_on: NaiveDate,
    #[serde(rename = "ClassOfBusiness", default)]
    class_of_business: Option<String>,
    #[serde(rename = "Counterparty", default)]
    counterparty: Option<String>,
    #[serde(rename = "Structure", default)]
    structure: Option<String>,
    #[serde(rename = "GrossPremium", default)]
    gross_premium: Option<String>,
    #[serde(rename = "UnearnedPremiumDelta", default)]
    unearned_premium_delta: Option<String>,
    #[serde(rename = "CededPremium", default)]
    ceded_premium: Option<String>,
    #[serde(rename = "Commission", default)]
    commission: Option<String>,
    #[serde(rename = "OurShare", default)]
    our_share: Option<String>,
}

impl MonetaryRow {
    fn to_record(self, config: &AnalyticsConfig) -> Result<MonetaryRecord> {
        let channel = Channel::classify(
            &self.record_type,
            self.territory.as_deref(),
            &self.currency,
            config,
        )?;

        let our_share = share(&self.our_share, &format!("Record {}", self.record_id))?;

        Ok(MonetaryRecord {
            gross_premium: amount(&self.gross_premium),
            unearned_premium_delta: amount(&self.unearned_premium_delta),
            ceded_premium: amount(&self.ceded_premium),
            commission: amount(&self.commission),
            record_id: self.record_id,
            channel,
            currency: self.currency.trim().to_uppercase(),
            booked_on: self.booked_on,
            class_of_business: non_empty(self.class_of_business)
                .unwrap_or_else(|| "Unclassified".to_string()),
            counterparty: non_empty(self.counterparty),
            structure: Structure::from_text(self.structure.as_deref()),
            our_share,
        })
    }
}

/// Load monetary records from any reader
pub fn load_monetary_records_from_reader<R: Read>(
    reader: R,
    config: &AnalyticsConfig,
) -> Result<Vec<MonetaryRecord>> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut records = Vec::new();

    for result in csv_reader.deserialize() {
        let row: MonetaryRow = result?;
        records.push(row.to_record(config)?);
    }

    Ok(records)
}

pub fn load_monetary_records(dir: &Path, config: &AnalyticsConfig) -> Result<Vec<MonetaryRecord>> {
    load_monetary_records_from_reader(open(dir, MONETARY_RECORDS_FILE)?, config)
}

#[derive(Debug, serde::Deserialize)]
struct ClaimRow {
    #[serde(rename = "ClaimId")]
    claim_id: String,
    #[serde(rename = "ClassOfBusiness", default)]
    class_of_business: Option<String>,
    #[serde(rename = "Currency")]
    currency: String,
    #[serde(rename = "BookedOn")]
    booked_on: NaiveDate,
    #[serde(rename = "Paid", default)]
    paid: Option<String>,
    #[serde(rename = "Reserve", default)]
    reserve: Option<String>,
}

pub fn load_claims_from_reader<R: Read>(reader: R) -> Result<Vec<ClaimRecord>> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut claims = Vec::new();

    for result in csv_reader.deserialize() {
        let row: ClaimRow = result?;
        claims.push(ClaimRecord {
            paid: amount(&row.paid),
            reserve: amount(&row.reserve),
            claim_id: row.claim_id,
            class_of_business: non_empty(row.class_of_business)
                .unwrap_or_else(|| "Unclassified".to_string()),
            currency: row.currency.trim().to_uppercase(),
            booked_on: row.booked_on,
        });
    }

    Ok(claims)
}

pub fn load_claims(dir: &Path) -> Result<Vec<ClaimRecord>> {
    load_claims_from_reader(open(dir, CLAIMS_FILE)?)
}

#[derive(Debug, serde::Deserialize)]
struct BordereauxRow {
    #[serde(rename = "EntryId")]
    entry_id: String,
    #[serde(rename = "AgreementId")]
    agreement_id: String,
    #[serde(rename = "Type")]
    kind: BordereauxType,
    #[serde(rename = "PeriodFrom")]
    period_from: NaiveDate,
    #[serde(rename = "PeriodTo")]
    period_to: NaiveDate,
    #[serde(rename = "Status")]
    status: BordereauxStatus,
    #[serde(rename = "TotalGwp", default)]
    total_gwp: Option<String>,
    #[serde(rename = "TotalPolicies", default)]
    total_policies: Option<String>,
    #[serde(rename = "TotalClaimsPaid", default)]
    total_claims_paid: Option<String>,
    #[serde(rename = "TotalClaimsReserved", default)]
    total_claims_reserved: Option<String>,
}

pub fn load_bordereaux_from_reader<R: Read>(reader: R) -> Result<Vec<BordereauxEntry>> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut entries = Vec::new();

    for result in csv_reader.deserialize() {
        let row: BordereauxRow = result?;
        entries.push(BordereauxEntry {
            total_gwp: amount(&row.total_gwp),
            total_policies: amount(&row.total_policies).max(0.0).round() as u64,
            total_claims_paid: amount(&row.total_claims_paid),
            total_claims_reserved: amount(&row.total_claims_reserved),
            entry_id: row.entry_id,
            agreement_id: row.agreement_id,
            kind: row.kind,
            period_from: row.period_from,
            period_to: row.period_to,
            status: row.status,
        });
    }

    Ok(entries)
}

pub fn load_bordereaux(dir: &Path) -> Result<Vec<BordereauxEntry>> {
    load_bordereaux_from_reader(open(dir, BORDEREAUX_FILE)?)
}

#[derive(Debug, serde::Deserialize)]
struct AgreementRow {
    #[serde(rename = "AgreementId")]
    agreement_id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Epi", default)]
    epi: Option<String>,
    #[serde(rename = "OurShare", default)]
    our_share: Option<String>,
    #[serde(rename = "Currency")]
    currency: String,
    #[serde(rename = "Status")]
    status: AgreementStatus,
    #[serde(rename = "InceptionDate")]
    inception_date: NaiveDate,
}

pub fn load_agreements_from_reader<R: Read>(reader: R) -> Result<Vec<BindingAgreement>> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut agreements = Vec::new();

    for result in csv_reader.deserialize() {
        let row: AgreementRow = result?;
        let our_share = share(&row.our_share, &format!("Agreement {}", row.agreement_id))?;
        agreements.push(BindingAgreement {
            epi: amount(&row.epi),
            our_share,
            agreement_id: row.agreement_id,
            name: row.name,
            currency: row.currency.trim().to_uppercase(),
            status: row.status,
            inception_date: row.inception_date,
        });
    }

    Ok(agreements)
}

pub fn load_agreements(dir: &Path) -> Result<Vec<BindingAgreement>> {
    load_agreements_from_reader(open(dir, AGREEMENTS_FILE)?)
}

#[derive(Debug, serde::Deserialize)]
struct RateRow {
    #[serde(rename = "Currency")]
    currency: String,
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Rate")]
    rate: f64,
    #[serde(rename = "Nominal", default)]
    nominal: Option<f64>,
}

pub fn load_exchange_rates_from_reader<R: Read>(reader: R) -> Result<Vec<ExchangeRate>> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut rates = Vec::new();

    for result in csv_reader.deserialize() {
        let row: RateRow = result?;
        if !(row.rate.is_finite() && row.rate > 0.0) {
            return Err(AnalyticsError::invalid(format!(
                "Non-positive rate for {} on {}",
                row.currency, row.date
            )));
        }
        rates.push(ExchangeRate {
            currency: row.currency.trim().to_uppercase(),
            date: row.date,
            rate: row.rate,
            nominal: row.nominal.filter(|n| *n > 0.0).unwrap_or(1.0),
        });
    }

    Ok(rates)
}

pub fn load_exchange_rates(dir: &Path) -> Result<Vec<ExchangeRate>> {
    load_exchange_rates_from_reader(open(dir, EXCHANGE_RATES_FILE)?)
}

/// Write quotes in the layout `load_exchange_rates_from_reader` reads
pub fn write_exchange_rates<W: Write>(writer: W, rates: &[ExchangeRate]) -> Result<()> {
    let mut csv_writer = Writer::from_writer(writer);
    csv_writer.write_record(["Currency", "Date", "Rate", "Nominal"])?;
    for rate in rates {
        csv_writer.write_record([
            rate.currency.clone(),
            rate.date.to_string(),
            rate.rate.to_string(),
            rate.nominal.to_string(),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Replace the data directory's rate file with `rates`.
///
/// Written to a sibling file and renamed, so a failed write keeps the old file.
pub fn save_exchange_rates(dir: &Path, rates: &[ExchangeRate]) -> Result<()> {
    let staging = dir.join(format!("{}.tmp", EXCHANGE_RATES_FILE));
    write_exchange_rates(File::create(&staging)?, rates)?;
    fs::rename(&staging, dir.join(EXCHANGE_RATES_FILE))?;
    Ok(())
}

/// Merge synced quotes into the stored history and return the quote count.
///
/// Only a missing file starts an empty history. Any load error is returned
/// and the existing file is not rewritten.
pub fn merge_exchange_rates(dir: &Path, rates: &[ExchangeRate]) -> Result<usize> {
    let existing = if dir.join(EXCHANGE_RATES_FILE).exists() {
        load_exchange_rates(dir)?
    } else {
        Vec::new()
    };

    let mut table = RateTable::new(existing);
    table.extend(rates.iter().cloned());

    let mut merged: Vec<_> = table.all().cloned().collect();
    merged.sort_by(|a, b| a.currency.cmp(&b.currency).then(a.date.cmp(&b.date)));
    save_exchange_rates(dir, &merged)?;
    Ok(merged.len())
}
