//! Core abstractions: canonical model and the provider contract

pub mod log;
pub mod model;
pub mod provider;

// Re-export main types for cleaner imports
pub use model::{Bar, CompanyInfo, Interval, Period, Quote, Series};
pub use provider::{Provider, degrade_info, degrade_quote, degrade_series};
