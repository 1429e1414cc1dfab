use std::{fmt, str::FromStr};

use shared::error::ContributionError;

/// Exponents beyond this are rejected rather than scaled.
const MAX_EXPONENT: i64 = 77;

/// A validated, strictly positive decimal amount held exactly as
/// `digits / 10^scale`, with trailing fractional zeros removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Amount {
    digits: u128,
    scale: u32,
}

/// Validates raw input from an amount field.
pub fn validate(raw: &str) -> Result<Amount, ContributionError> {
    raw.parse()
}

fn invalid(message: impl Into<String>) -> ContributionError {
    ContributionError::InvalidAmount(message.into())
}

impl Amount {
    pub fn digits(&self) -> u128 {
        self.digits
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Exact conversion into an asset's smallest unit.
    pub fn to_base_units(&self, decimals: u8) -> Result<u128, ContributionError> {
        let decimals = u32::from(decimals);
        if self.scale > decimals {
            return Err(invalid(format!(
                "{self} has more than {decimals} decimal places"
            )));
        }
        10u128
            .checked_pow(decimals - self.scale)
            .and_then(|factor| self.digits.checked_mul(factor))
            .ok_or_else(|| invalid(format!("{self} is too large")))
    }
}

impl FromStr for Amount {
    type Err = ContributionError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(invalid("amount is empty"));
        }

        let (mantissa, exponent) = match text.find(['e', 'E']) {
            Some(at) => {
                let exponent: i64 = text[at + 1..]
                    .parse()
                    .map_err(|_| invalid(format!("{raw:?} is not a number")))?;
                if exponent.abs() > MAX_EXPONENT {
                    return Err(invalid(format!("{raw:?} is out of range")));
                }
                (&text[..at], exponent)
            }
            None => (text, 0),
        };

        let (negative, unsigned) = match mantissa.as_bytes().first() {
            Some(b'-') => (true, &mantissa[1..]),
            Some(b'+') => (false, &mantissa[1..]),
            _ => (false, mantissa),
        };
        let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty())
            || !all_digits(whole)
            || !all_digits(fraction)
        {
            return Err(invalid(format!("{raw:?} is not a number")));
        }

        // Trailing zeros that only widen the scale are dropped before parsing.
        let mut scale = fraction.len() as i64 - exponent;
        let joined = format!("{whole}{fraction}");
        let mut significant = joined.trim_start_matches('0');
        while scale > 0 && significant.ends_with('0') {
            significant = &significant[..significant.len() - 1];
            scale -= 1;
        }
        let mut digits: u128 = if significant.is_empty() {
            0
        } else {
            significant
                .parse()
                .map_err(|_| invalid(format!("{raw:?} has too many digits")))?
        };
        if digits == 0 || negative {
            return Err(invalid(format!("{raw:?} must be greater than zero")));
        }

        if scale < 0 {
            digits = 10u128
                .checked_pow((-scale) as u32)
                .and_then(|factor| digits.checked_mul(factor))
                .ok_or_else(|| invalid(format!("{raw:?} is too large")))?;
            scale = 0;
        }
        let scale = u32::try_from(scale).map_err(|_| invalid(format!("{raw:?} is out of range")))?;

        Ok(Self { digits, scale })
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.digits.to_string();
        let scale = self.scale as usize;
        if scale == 0 {
            return f.write_str(&digits);
        }
        let padded = if digits.len() <= scale {
            format!("{}{digits}", "0".repeat(scale + 1 - digits.len()))
        } else {
            digits
        };
        let (whole, fraction) = padded.split_at(padded.len() - scale);
        write!(f, "{whole}.{fraction}")
    }
}

#[cfg(test)]
#[path = "tests/amount_tests.rs"]
mod tests;
