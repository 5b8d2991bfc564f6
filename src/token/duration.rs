use std::fmt;
use std::str::FromStr;

use super::TokenError;

/// Token lifetime written as `<positive integer><unit>`, unit one of `s m h d`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TtlSpec {
    seconds: i64,
}

impl TtlSpec {
    /// Seven days
    pub const DEFAULT: TtlSpec = TtlSpec {
        seconds: 7 * 86_400,
    };

    /// Parse `<n><s|m|h|d>`, e.g. `30m` or `7d`
    pub fn parse(text: &str) -> Result<Self, TokenError> {
        let invalid = || TokenError::InvalidDuration(text.to_string());

        let trimmed = text.trim();
        let unit = trimmed.chars().last().ok_or_else(invalid)?;
        let multiplier: i64 = match unit {
            's' => 1,
            'm' => 60,
            'h' => 3_600,
            'd' => 86_400,
            _ => return Err(invalid()),
        };

        let digits = &trimmed[..trimmed.len() - unit.len_utf8()];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let value: i64 = digits.parse().map_err(|_| invalid())?;
        if value == 0 {
            return Err(invalid());
        }
        let seconds = value.checked_mul(multiplier).ok_or_else(invalid)?;
        Ok(Self { seconds })
    }

    /// Whole seconds; zero is rejected
    pub fn from_secs(seconds: u32) -> Option<Self> {
        (seconds > 0).then_some(Self {
            seconds: i64::from(seconds),
        })
    }

    /// Length in seconds
    pub fn as_secs(&self) -> i64 {
        self.seconds
    }
}

impl Default for TtlSpec {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl FromStr for TtlSpec {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TtlSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (value, unit) = [(86_400, 'd'), (3_600, 'h'), (60, 'm')]
            .into_iter()
            .find(|(size, _)| self.seconds % size == 0)
            .map(|(size, unit)| (self.seconds / size, unit))
            .unwrap_or((self.seconds, 's'));
        write!(f, "{value}{unit}")
    }
}
