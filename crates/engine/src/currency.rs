//! Currency codes and conversion.
//!
//! Monetary values are stored as an `i64` number of **minor units** (cents)
//! to avoid floating-point drift. Conversion between currencies goes through
//! a [`RateTable`]; the decimal rate is applied with half-up rounding at the
//! point of use, so repeated apply/invert cycles never accumulate error.

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::LedgerError;

/// ISO currency code accepted by the ledger.
///
/// The set is closed: these are the currencies the rate table and the data
/// model know about. Every account, budget, and transaction carries one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Pln,
    Rub,
}

impl Currency {
    /// Canonical currency code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Pln => "PLN",
            Currency::Rub => "RUB",
        }
    }

    /// Number of fraction digits used when formatting/parsing amounts.
    #[must_use]
    pub const fn minor_units(self) -> u8 {
        match self {
            Currency::Usd | Currency::Eur | Currency::Pln | Currency::Rub => 2,
        }
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<&str> for Currency {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "PLN" => Ok(Currency::Pln),
            "RUB" => Ok(Currency::Rub),
            other => Err(LedgerError::Validation(format!(
                "unsupported currency: {other}"
            ))),
        }
    }
}

/// Conversion rates keyed by `(from, to)` currency pairs.
///
/// Lookups for a pair that is not in the table fall back to a 1:1
/// passthrough instead of failing: the ledger stays usable with an
/// incomplete rate table, and the caller sees the unconverted amount. This
/// is a deliberate policy, not an error path.
#[derive(Clone, Debug, Default)]
pub struct RateTable {
    rates: HashMap<(Currency, Currency), Decimal>,
}

impl RateTable {
    /// An empty table: every conversion is a passthrough.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in fallback rates for the supported currencies.
    #[must_use]
    pub fn builtin() -> Self {
        use Currency::{Eur, Pln, Rub, Usd};

        let mut table = Self::default();
        let pairs: [(Currency, Currency, Decimal); 12] = [
            (Usd, Eur, Decimal::new(94, 2)),
            (Usd, Pln, Decimal::new(45, 1)),
            (Usd, Rub, Decimal::new(90, 0)),
            (Eur, Usd, Decimal::new(106, 2)),
            (Eur, Pln, Decimal::new(48, 1)),
            (Eur, Rub, Decimal::new(95, 0)),
            (Pln, Usd, Decimal::new(22, 2)),
            (Pln, Eur, Decimal::new(21, 2)),
            (Pln, Rub, Decimal::new(20, 0)),
            (Rub, Usd, Decimal::new(11, 3)),
            (Rub, Eur, Decimal::new(105, 4)),
            (Rub, Pln, Decimal::new(5, 2)),
        ];
        for (from, to, rate) in pairs {
            table.insert(from, to, rate);
        }
        table
    }

    /// Set the rate for a directed pair.
    pub fn insert(&mut self, from: Currency, to: Currency, rate: Decimal) {
        self.rates.insert((from, to), rate);
    }

    /// Convert `amount_minor` from one currency to another.
    ///
    /// Identical currencies and unknown pairs return the amount unchanged.
    /// The result is rounded half-up to whole minor units.
    #[must_use]
    pub fn convert_minor(&self, amount_minor: i64, from: Currency, to: Currency) -> i64 {
        if from == to {
            return amount_minor;
        }
        let Some(rate) = self.rates.get(&(from, to)) else {
            return amount_minor;
        };
        let converted = (Decimal::from(amount_minor) * rate)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        // Saturates on overflow, toward the sign of the product.
        converted.to_i64().unwrap_or(if converted.is_sign_negative() {
            i64::MIN
        } else {
            i64::MAX
        })
    }
}
