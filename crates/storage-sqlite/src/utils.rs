//! Column encoding helpers for SQLite storage.
//!
//! Money is stored as decimal text so that aggregates round-trip exactly.

use rust_decimal::Decimal;
use std::str::FromStr;
use tallybook_core::constants::DECIMAL_PRECISION;
use tallybook_core::errors::{Result, ValidationError};

/// Parses a stored amount. Scientific notation written by older tools is
/// accepted; anything else is an error, never a silent zero.
pub fn parse_decimal(value: &str, field_name: &str) -> Result<Decimal> {
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .map_err(|e| {
            log::error!("Failed to parse {} '{}': {}", field_name, value, e);
            ValidationError::DecimalParse(format!("{field_name}: {value}")).into()
        })
}

/// Text form written to amount columns.
pub fn format_decimal(value: Decimal) -> String {
    value.round_dp(DECIMAL_PRECISION).normalize().to_string()
}
