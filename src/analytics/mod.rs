//! Premium, claims and ratio analytics
//!
//! `build_summary` is the single entry point used by the service layer. The
//! submodules are public so the regulatory forms and exports can reuse the
//! intermediate aggregates.

pub mod channels;
pub mod claims;
pub mod ratios;
pub mod summary;

pub use channels::{
    aggregate_channels, percent, rank_counterparties, ChannelSubtotal, ChannelTotals, ClassPremium,
    CounterpartyPremium, NormalizedRecord, PremiumTotals, UNSPECIFIED_COUNTERPARTY,
};
pub use claims::{aggregate_claims, ClaimsTotals, ClassClaims};
pub use ratios::{compute_technical_account, KeyRatios, TechnicalAccount};
pub use summary::{build_summary, AnalyticsSummary};
