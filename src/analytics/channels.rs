//! Channel aggregation of premium and commission
//!
//! Records are normalized per channel into base-currency magnitudes and then
//! folded sequentially, so identical inputs always give bit-identical totals.
//! The outward channel's written premium is the authoritative ceded figure.

use crate::currency::CurrencyNormalizer;
use crate::records::{Channel, MonetaryRecord};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Label used when a record names no counterparty
pub const UNSPECIFIED_COUNTERPARTY: &str = "Unspecified";

/// A monetary record expressed in the base currency
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub channel: Channel,
    pub class_of_business: String,
    pub counterparty: Option<String>,
    pub gross_premium: f64,
    pub unearned_premium_delta: f64,
    pub ceded_premium: f64,
    pub commission: f64,
    /// Original currency, when no rate could be found for it
    pub unconverted_currency: Option<String>,
}

struct Converter<'a> {
    record: &'a MonetaryRecord,
    fx: &'a CurrencyNormalizer,
    unconverted: bool,
}

impl<'a> Converter<'a> {
    fn new(record: &'a MonetaryRecord, fx: &'a CurrencyNormalizer) -> Self {
        Self { record, fx, unconverted: false }
    }

    /// Base-currency magnitude of an amount booked on the record
    fn amount(&mut self, value: f64) -> f64 {
        let converted = self.fx.to_base(value, &self.record.currency, self.record.booked_on);
        self.unconverted |= converted.is_unconverted();
        converted.amount.abs()
    }

    fn finish(self, mut normalized: NormalizedRecord) -> NormalizedRecord {
        if self.unconverted {
            normalized.unconverted_currency = Some(self.record.currency.clone());
        }
        normalized
    }
}

impl Channel {
    /// Normalize a record booked on this channel
    pub fn normalize(&self, record: &MonetaryRecord, fx: &CurrencyNormalizer) -> NormalizedRecord {
        match self {
            Channel::Direct => normalize_direct(record, fx),
            Channel::InwardDomestic => normalize_inward(Channel::InwardDomestic, record, fx),
            Channel::InwardForeign => normalize_inward_foreign(record, fx),
            Channel::Outward => normalize_outward(record, fx),
        }
    }
}

/// Direct business has no cedant; any counterparty column is ignored
fn normalize_direct(record: &MonetaryRecord, fx: &CurrencyNormalizer) -> NormalizedRecord {
    let mut conv = Converter::new(record, fx);
    let normalized = NormalizedRecord {
        channel: Channel::Direct,
        class_of_business: record.class_of_business.clone(),
        counterparty: None,
        gross_premium: conv.amount(record.gross_premium),
        unearned_premium_delta: conv.amount(record.unearned_premium_delta),
        ceded_premium: conv.amount(record.ceded_premium),
        commission: conv.amount(record.commission),
        unconverted_currency: None,
    };
    conv.finish(normalized)
}

/// Inward business keeps its cedant for the ranking
fn normalize_inward(channel: Channel, record: &MonetaryRecord, fx: &CurrencyNormalizer) -> NormalizedRecord {
    let mut conv = Converter::new(record, fx);
    let normalized = NormalizedRecord {
        channel,
        class_of_business: record.class_of_business.clone(),
        counterparty: Some(counterparty_name(record)),
        gross_premium: conv.amount(record.gross_premium),
        unearned_premium_delta: conv.amount(record.unearned_premium_delta),
        ceded_premium: conv.amount(record.ceded_premium),
        commission: conv.amount(record.commission),
        unconverted_currency: None,
    };
    conv.finish(normalized)
}

fn normalize_inward_foreign(record: &MonetaryRecord, fx: &CurrencyNormalizer) -> NormalizedRecord {
    if !fx.is_base(&record.currency) {
        debug!(
            "Converting foreign inward record {} from {} as of {}",
            record.record_id, record.currency, record.booked_on
        );
    }
    normalize_inward(Channel::InwardForeign, record, fx)
}

/// An outward record's premium is itself the cession
fn normalize_outward(record: &MonetaryRecord, fx: &CurrencyNormalizer) -> NormalizedRecord {
    let mut conv = Converter::new(record, fx);
    let gross_premium = conv.amount(record.gross_premium);
    let normalized = NormalizedRecord {
        channel: Channel::Outward,
        class_of_business: record.class_of_business.clone(),
        counterparty: Some(counterparty_name(record)),
        gross_premium,
        unearned_premium_delta: conv.amount(record.unearned_premium_delta),
        ceded_premium: gross_premium,
        commission: conv.amount(record.commission),
        unconverted_currency: None,
    };
    conv.finish(normalized)
}

fn counterparty_name(record: &MonetaryRecord) -> String {
    record
        .counterparty
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNSPECIFIED_COUNTERPARTY)
        .to_string()
}

/// Premium subtotals for one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSubtotal {
    pub channel: Channel,
    pub record_count: usize,
    pub gross_written_premium: f64,
    pub unearned_premium_reserve: f64,
    pub gross_premium_earned: f64,
    /// Ceded premium noted on the records themselves (reconciliation only)
    pub recorded_ceded_premium: f64,
    pub commission: f64,
}

impl ChannelSubtotal {
    fn empty(channel: Channel) -> Self {
        Self {
            channel,
            record_count: 0,
            gross_written_premium: 0.0,
            unearned_premium_reserve: 0.0,
            gross_premium_earned: 0.0,
            recorded_ceded_premium: 0.0,
            commission: 0.0,
        }
    }

    fn add(&mut self, record: &NormalizedRecord) {
        self.record_count += 1;
        self.gross_written_premium += record.gross_premium;
        self.unearned_premium_reserve += record.unearned_premium_delta;
        self.recorded_ceded_premium += record.ceded_premium;
        self.commission += record.commission;
    }

    fn close(&mut self) {
        self.gross_premium_earned = self.gross_written_premium - self.unearned_premium_reserve;
    }
}

/// Premium totals across channels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PremiumTotals {
    /// Direct plus inward written premium
    pub gross_written_premium: f64,
    pub unearned_premium_reserve: f64,
    pub gross_premium_earned: f64,
    /// Outward written premium
    pub ceded_premium: f64,
    /// Outward earned premium
    pub ceded_premium_earned: f64,
    pub net_written_premium: f64,
    pub net_premium_earned: f64,
    /// Commission paid on direct and inward business
    pub commission: f64,
    pub commission_ratio: f64,
    /// Commission received on outward cessions (reported, not netted)
    pub reinsurance_commission: f64,
}

/// Premium by class of business on the gross channels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassPremium {
    pub gross_written_premium: f64,
    pub unearned_premium_reserve: f64,
    pub gross_premium_earned: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterpartyPremium {
    pub name: String,
    pub premium: f64,
}

/// Output of the channel aggregator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelTotals {
    /// One subtotal per channel, in `Channel::ALL` order
    pub channels: Vec<ChannelSubtotal>,
    pub total: PremiumTotals,
    pub premium_by_class: BTreeMap<String, ClassPremium>,
    pub top_cedants: Vec<CounterpartyPremium>,
    pub top_reinsurers: Vec<CounterpartyPremium>,
    pub unconverted_records: usize,
    pub unconverted_currencies: BTreeSet<String>,
}

impl ChannelTotals {
    pub fn channel(&self, channel: Channel) -> &ChannelSubtotal {
        // channels is always built from Channel::ALL
        &self.channels[Channel::ALL.iter().position(|c| *c == channel).unwrap_or(0)]
    }
}

/// Premium descending, ties by name ascending, truncated to `top_n`
pub fn rank_counterparties(premiums: BTreeMap<String, f64>, top_n: usize) -> Vec<CounterpartyPremium> {
    let mut ranked: Vec<CounterpartyPremium> = premiums
        .into_iter()
        .map(|(name, premium)| CounterpartyPremium { name, premium })
        .collect();
    ranked.sort_by(|a, b| b.premium.total_cmp(&a.premium).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(top_n);
    ranked
}

/// Percentage guarded against a zero or negative denominator
pub fn percent(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        let pct = numerator / denominator * 100.0;
        if pct.is_finite() { pct } else { 0.0 }
    } else {
        0.0
    }
}

/// Fold records into per-channel and overall totals
pub fn aggregate_channels(
    records: &[MonetaryRecord],
    fx: &CurrencyNormalizer,
    top_n: usize,
) -> ChannelTotals {
    let mut subtotals: Vec<ChannelSubtotal> = Channel::ALL.iter().map(|c| ChannelSubtotal::empty(*c)).collect();
    let mut by_class: BTreeMap<String, ClassPremium> = BTreeMap::new();
    let mut cedants: BTreeMap<String, f64> = BTreeMap::new();
    let mut reinsurers: BTreeMap<String, f64> = BTreeMap::new();
    let mut unconverted_records = 0;
    let mut unconverted_currencies = BTreeSet::new();

    for record in records {
        let normalized = record.channel.normalize(record, fx);

        if let Some(currency) = &normalized.unconverted_currency {
            unconverted_records += 1;
            unconverted_currencies.insert(currency.clone());
        }

        let idx = Channel::ALL.iter().position(|c| *c == normalized.channel).unwrap_or(0);
        subtotals[idx].add(&normalized);

        if normalized.channel.is_gross() {
            let class = by_class.entry(normalized.class_of_business.clone()).or_default();
            class.gross_written_premium += normalized.gross_premium;
            class.unearned_premium_reserve += normalized.unearned_premium_delta;
        }

        if let Some(name) = normalized.counterparty {
            let book = match normalized.channel {
                Channel::Outward => &mut reinsurers,
                _ => &mut cedants,
            };
            *book.entry(name).or_insert(0.0) += normalized.gross_premium;
        }
    }

    for subtotal in &mut subtotals {
        subtotal.close();
    }
    for class in by_class.values_mut() {
        class.gross_premium_earned = class.gross_written_premium - class.unearned_premium_reserve;
    }

    let gross = subtotals.iter().filter(|s| s.channel.is_gross());
    let gross_written_premium: f64 = gross.clone().map(|s| s.gross_written_premium).sum();
    let unearned_premium_reserve: f64 = gross.clone().map(|s| s.unearned_premium_reserve).sum();
    let commission: f64 = gross.map(|s| s.commission).sum();
    let gross_premium_earned = gross_written_premium - unearned_premium_reserve;

    let outward = &subtotals[Channel::ALL.len() - 1];
    let total = PremiumTotals {
        gross_written_premium,
        unearned_premium_reserve,
        gross_premium_earned,
        ceded_premium: outward.gross_written_premium,
        ceded_premium_earned: outward.gross_premium_earned,
        net_written_premium: gross_written_premium - outward.gross_written_premium,
        net_premium_earned: gross_premium_earned - outward.gross_premium_earned,
        commission,
        commission_ratio: percent(commission, gross_written_premium),
        reinsurance_commission: outward.commission,
    };

    debug!(
        "Aggregated {} records: GWP {:.2}, ceded {:.2}, NWP {:.2}",
        records.len(),
        total.gross_written_premium,
        total.ceded_premium,
        total.net_written_premium
    );

    ChannelTotals {
        channels: subtotals,
        total,
        premium_by_class: by_class,
        top_cedants: rank_counterparties(cedants, top_n),
        top_reinsurers: rank_counterparties(reinsurers, top_n),
        unconverted_records,
        unconverted_currencies,
    }
}
