//! Booked record structures and CSV loading

mod data;
pub mod loader;

pub use data::{
    AgreementStatus, BindingAgreement, BordereauxEntry, BordereauxStatus, BordereauxType,
    Channel, ClaimRecord, ExchangeRate, MonetaryRecord, RecordFilter, Structure,
};
