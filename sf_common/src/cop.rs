use std::{
    fmt::{self, Display},
    iter::Sum,
    ops::{Add, AddAssign, Mul, Sub},
    str::FromStr,
};

use serde::{
    de::{self, Visitor},
    Deserialize,
    Deserializer,
    Serialize,
    Serializer,
};
use thiserror::Error;

use crate::helpers::group_thousands;

pub const COP_CURRENCY_CODE: &str = "COP";

//--------------------------------------        Cop          ---------------------------------------------------------
/// An amount of Colombian pesos. The peso has no minor unit in everyday use, so amounts are whole pesos and
/// fractional inputs are rounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Cop(i64);

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in pesos: {0}")]
pub struct CopConversionError(String);

impl Cop {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Rounds a fractional peso amount to the nearest whole peso.
    pub fn from_f64(value: f64) -> Result<Self, CopConversionError> {
        if !value.is_finite() || value.abs() > i64::MAX as f64 {
            return Err(CopConversionError(format!("{value} is not a finite peso amount")));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(value.round() as i64))
    }
}

impl From<i64> for Cop {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl FromStr for Cop {
    type Err = CopConversionError;

    /// Accepts plain decimal strings such as `"150000"` or `"150000.00"`, the shape gateways report amounts in.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(CopConversionError("empty amount".to_string()));
        }
        if let Ok(v) = trimmed.parse::<i64>() {
            return Ok(Self(v));
        }
        let v = trimmed.parse::<f64>().map_err(|e| CopConversionError(format!("{trimmed}: {e}")))?;
        Self::from_f64(v)
    }
}

impl Add for Cop {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Cop {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Cop {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<i64> for Cop {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Sum for Cop {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl Display for Cop {
    /// es-CO style: `COP 1.250.000`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let digits = self.0.unsigned_abs().to_string();
        write!(f, "{COP_CURRENCY_CODE} {sign}{}", group_thousands(&digits, '.'))
    }
}

impl Serialize for Cop {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.0)
    }
}

struct CopVisitor;

impl<'de> Visitor<'de> for CopVisitor {
    type Value = Cop;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a peso amount as a number or numeric string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Cop, E> {
        Ok(Cop(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Cop, E> {
        i64::try_from(v).map(Cop).map_err(|e| E::custom(format!("{v} is too large. {e}")))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Cop, E> {
        Cop::from_f64(v).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Cop, E> {
        v.parse::<Cop>().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Cop {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(CopVisitor)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_uses_colombian_grouping() {
        assert_eq!(Cop::from(0).to_string(), "COP 0");
        assert_eq!(Cop::from(85_000).to_string(), "COP 85.000");
        assert_eq!(Cop::from(1_250_000).to_string(), "COP 1.250.000");
        assert_eq!(Cop::from(-4_500).to_string(), "COP -4.500");
    }

    #[test]
    fn parse_gateway_amounts() {
        assert_eq!("150000".parse::<Cop>().unwrap(), Cop::from(150_000));
        assert_eq!("150000.00".parse::<Cop>().unwrap(), Cop::from(150_000));
        assert_eq!(" 99.6 ".parse::<Cop>().unwrap(), Cop::from(100));
        assert!("".parse::<Cop>().is_err());
        assert!("abc".parse::<Cop>().is_err());
    }

    #[test]
    fn deserialize_numbers_and_strings() {
        let v: Vec<Cop> = serde_json::from_str(r#"[12000, 12000.4, "12000"]"#).unwrap();
        assert!(v.iter().all(|c| *c == Cop::from(12_000)));
        assert_eq!(serde_json::to_string(&Cop::from(7)).unwrap(), "7");
    }

    #[test]
    fn arithmetic() {
        let total: Cop = [Cop::from(1_000) * 3, Cop::from(500)].into_iter().sum();
        assert_eq!(total, Cop::from(3_500));
        assert_eq!(total - Cop::from(500), Cop::from(3_000));
    }
}
