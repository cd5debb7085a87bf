use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{LedgerError, Result};

/// currency tag: three letter code plus number of minor digits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "CurrencyRepr", into = "CurrencyRepr")]
pub struct Currency {
    code: [u8; 3],
    exponent: u8,
}

#[derive(Serialize, Deserialize)]
struct CurrencyRepr {
    code: String,
    exponent: u8,
}

impl Currency {
    /// zambian kwacha, the app's home currency
    pub const ZMW: Currency = Currency { code: *b"ZMW", exponent: 2 };
    pub const USD: Currency = Currency { code: *b"USD", exponent: 2 };

    /// largest supported exponent
    pub const MAX_EXPONENT: u8 = 8;

    pub fn new(code: &str, exponent: u8) -> Result<Self> {
        let bytes = code.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(|b| b.is_ascii_uppercase()) {
            return Err(LedgerError::InvalidCurrency {
                code: code.to_string(),
            });
        }
        if exponent > Self::MAX_EXPONENT {
            return Err(LedgerError::InvalidCurrency {
                code: format!("{} (exponent {})", code, exponent),
            });
        }
        Ok(Currency {
            code: [bytes[0], bytes[1], bytes[2]],
            exponent,
        })
    }

    pub fn code(&self) -> &str {
        // constructor only admits ascii
        std::str::from_utf8(&self.code).unwrap_or("???")
    }

    pub fn exponent(&self) -> u32 {
        self.exponent as u32
    }

    /// display symbol; falls back to the code
    pub fn symbol(&self) -> &str {
        match &self.code {
            b"ZMW" => "K",
            b"USD" => "$",
            b"EUR" => "€",
            b"GBP" => "£",
            _ => self.code(),
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::ZMW
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<CurrencyRepr> for Currency {
    type Error = LedgerError;

    fn try_from(repr: CurrencyRepr) -> Result<Self> {
        Currency::new(&repr.code, repr.exponent)
    }
}

impl From<Currency> for CurrencyRepr {
    fn from(c: Currency) -> Self {
        CurrencyRepr {
            code: c.code().to_string(),
            exponent: c.exponent,
        }
    }
}

/// exact money amount stored as integer minor units (cents, ngwee)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    minor: i64,
    currency: Currency,
}

impl Money {
    /// create from minor units (cents etc)
    pub fn from_minor(minor: i64, currency: Currency) -> Self {
        Money { minor, currency }
    }

    /// create from whole units (kwacha, dollars)
    pub fn from_major(major: i64, currency: Currency) -> Result<Self> {
        10_i64
            .checked_pow(currency.exponent())
            .and_then(|scale| major.checked_mul(scale))
            .map(|minor| Money { minor, currency })
            .ok_or_else(|| LedgerError::CalculationError {
                message: format!("{} {} does not fit in minor units", major, currency),
            })
    }

    /// parse a decimal string such as "1050.00"; rejects more digits than the currency allows
    pub fn parse(s: &str, currency: Currency) -> Result<Self> {
        let value = Decimal::from_str(s.trim()).map_err(|_| LedgerError::InvalidAmount {
            amount: s.to_string(),
        })?;
        Self::from_decimal(value, currency)
    }

    /// create from a decimal major amount, exact only
    pub fn from_decimal(value: Decimal, currency: Currency) -> Result<Self> {
        let minor = value
            .checked_mul(Decimal::from(10_i64.pow(currency.exponent())))
            .ok_or_else(|| LedgerError::InvalidAmount {
                amount: value.to_string(),
            })?;
        if minor.fract() != Decimal::ZERO {
            return Err(LedgerError::InvalidAmount {
                amount: value.to_string(),
            });
        }
        let minor = minor.to_i64().ok_or_else(|| LedgerError::InvalidAmount {
            amount: value.to_string(),
        })?;
        Ok(Money { minor, currency })
    }

    pub fn zero(currency: Currency) -> Self {
        Money { minor: 0, currency }
    }

    pub fn minor_units(&self) -> i64 {
        self.minor
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// value in major units as a decimal
    pub fn as_decimal(&self) -> Decimal {
        Decimal::new(self.minor, self.currency.exponent())
    }

    pub fn is_zero(&self) -> bool {
        self.minor == 0
    }

    pub fn is_positive(&self) -> bool {
        self.minor > 0
    }

    fn same_currency(&self, other: &Money) -> Result<()> {
        if self.currency != other.currency {
            return Err(LedgerError::CurrencyMismatch {
                expected: self.currency,
                found: other.currency,
            });
        }
        Ok(())
    }

    pub fn checked_add(self, other: Money) -> Result<Money> {
        self.same_currency(&other)?;
        let minor = self.minor.checked_add(other.minor).ok_or_else(|| overflow("addition"))?;
        Ok(Money { minor, ..self })
    }

    pub fn checked_sub(self, other: Money) -> Result<Money> {
        self.same_currency(&other)?;
        let minor = self.minor.checked_sub(other.minor).ok_or_else(|| overflow("subtraction"))?;
        Ok(Money { minor, ..self })
    }

    /// sum amounts, starting from zero in the given currency
    pub fn sum<I>(currency: Currency, amounts: I) -> Result<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::zero(currency), |acc, m| acc.checked_add(m))
    }

    /// interest at the given rate, rounded half-up to the minor unit
    pub fn interest_at(&self, rate: Rate) -> Result<Money> {
        let raw = Decimal::from(self.minor) * rate.as_decimal();
        let rounded = raw.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        let minor = rounded.to_i64().ok_or_else(|| overflow("interest"))?;
        Ok(Money { minor, ..*self })
    }

    /// ratio self / whole clamped to [0, 1]; zero whole counts as complete
    pub fn ratio_of(&self, whole: Money) -> Result<Decimal> {
        self.same_currency(&whole)?;
        if whole.minor <= 0 {
            return Ok(Decimal::ONE);
        }
        let ratio = Decimal::from(self.minor) / Decimal::from(whole.minor);
        Ok(ratio.max(Decimal::ZERO).min(Decimal::ONE))
    }
}

fn overflow(op: &str) -> LedgerError {
    LedgerError::CalculationError {
        message: format!("money {} overflowed", op),
    }
}

impl PartialOrd for Money {
    /// amounts in different currencies are not comparable
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        if self.currency != other.currency {
            return None;
        }
        Some(self.minor.cmp(&other.minor))
    }
}

impl fmt::Display for Money {
    /// K1,050.00 style
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let exp = self.currency.exponent();
        let scale = 10_u64.pow(exp);
        let abs = self.minor.unsigned_abs();
        let whole = (abs / scale).to_string();
        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, ch) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        let sign = if self.minor < 0 { "-" } else { "" };
        if exp == 0 {
            write!(f, "{}{}{}", sign, self.currency.symbol(), grouped)
        } else {
            write!(
                f,
                "{}{}{}.{:0width$}",
                sign,
                self.currency.symbol(),
                grouped,
                abs % scale,
                width = exp as usize
            )
        }
    }
}

/// interest rate held in basis points
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Rate(u32);

impl Rate {
    pub const ZERO: Rate = Rate(0);

    /// create from basis points (e.g., 500 for 5%)
    pub fn from_bps(bps: u32) -> Self {
        Rate(bps)
    }

    /// create from whole percentage (e.g., 5 for 5%)
    pub fn from_percentage(p: u32) -> Self {
        Rate(p.saturating_mul(100))
    }

    pub fn bps(&self) -> u32 {
        self.0
    }

    /// fraction, e.g. 0.05 for 500 bps
    pub fn as_decimal(&self) -> Decimal {
        Decimal::from(self.0) / Decimal::from(10_000)
    }

    pub fn as_percentage(&self) -> Decimal {
        Decimal::new(self.0 as i64, 2)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.as_percentage().normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn k(minor: i64) -> Money {
        Money::from_minor(minor, Currency::ZMW)
    }

    #[test]
    fn test_parse_and_display() {
        let m = Money::parse("1050.00", Currency::ZMW).unwrap();
        assert_eq!(m.minor_units(), 105_000);
        assert_eq!(m.to_string(), "K1,050.00");

        assert_eq!(k(123_456_789).to_string(), "K1,234,567.89");
        assert_eq!(k(5).to_string(), "K0.05");
        assert_eq!(Money::from_minor(2500, Currency::USD).to_string(), "$25.00");
    }

    #[test]
    fn test_parse_rejects_sub_minor_precision() {
        assert!(matches!(
            Money::parse("10.005", Currency::ZMW),
            Err(LedgerError::InvalidAmount { .. })
        ));
        assert!(Money::parse("abc", Currency::ZMW).is_err());
    }

    #[test]
    fn test_from_major() {
        assert_eq!(Money::from_major(1000, Currency::ZMW).unwrap(), k(100_000));
        assert!(Money::from_major(i64::MAX, Currency::ZMW).is_err());
    }

    #[test]
    fn test_interest_rounds_half_up() {
        // 1000.00 at 5% is exactly 50.00
        assert_eq!(k(100_000).interest_at(Rate::from_bps(500)).unwrap(), k(5_000));
        // 0.10 at 5% = 0.5 minor units -> 1
        assert_eq!(k(10).interest_at(Rate::from_bps(500)).unwrap(), k(1));
        // 0.09 at 5% = 0.45 minor units -> 0
        assert_eq!(k(9).interest_at(Rate::from_bps(500)).unwrap(), k(0));
    }

    #[test]
    fn test_currency_mismatch() {
        let usd = Money::from_minor(100, Currency::USD);
        assert!(matches!(
            k(100).checked_add(usd),
            Err(LedgerError::CurrencyMismatch { .. })
        ));
        assert_eq!(k(100).partial_cmp(&usd), None);
    }

    #[test]
    fn test_ratio_is_clamped() {
        assert_eq!(k(60_000).ratio_of(k(105_000)).unwrap().round_dp(4), dec!(0.5714));
        assert_eq!(k(200).ratio_of(k(100)).unwrap(), Decimal::ONE);
        assert_eq!(k(0).ratio_of(k(100)).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_currency_validation_and_serde() {
        assert!(Currency::new("zmw", 2).is_err());
        assert!(Currency::new("ZMWK", 2).is_err());
        assert!(Currency::new("BTC", 9).is_err());

        let json = serde_json::to_string(&Currency::ZMW).unwrap();
        assert_eq!(json, r#"{"code":"ZMW","exponent":2}"#);
        let back: Currency = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Currency::ZMW);
        assert!(serde_json::from_str::<Currency>(r#"{"code":"zz","exponent":2}"#).is_err());
    }

    #[test]
    fn test_rate_display() {
        assert_eq!(Rate::from_bps(500).to_string(), "5%");
        assert_eq!(Rate::from_bps(1250).to_string(), "12.5%");
        assert_eq!(Rate::from_percentage(5), Rate::from_bps(500));
    }
}
