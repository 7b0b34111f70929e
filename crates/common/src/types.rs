//! Trading domain enums shared by UI and API tests

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Helpers for picking enum values in data-driven tests.
pub trait EnumValues: Sized + Copy + PartialEq + 'static {
    /// Every variant in declaration order
    const ALL: &'static [Self];

    /// All variants except the excluded ones
    fn list_values(except: &[Self]) -> Vec<Self> {
        Self::ALL
            .iter()
            .copied()
            .filter(|v| !except.contains(v))
            .collect()
    }

    /// `amount` distinct variants, chosen at random
    fn sample_values(amount: usize, except: &[Self]) -> Result<Vec<Self>> {
        let pool = Self::list_values(except);
        if amount > pool.len() {
            return Err(Error::SampleTooLarge {
                requested: amount,
                available: pool.len(),
            });
        }
        let mut rng = rand::thread_rng();
        Ok(pool.choose_multiple(&mut rng, amount).copied().collect())
    }

    /// `amount` variants chosen with replacement
    fn random_values(amount: usize, except: &[Self]) -> Vec<Self> {
        let pool = Self::list_values(except);
        let mut rng = rand::thread_rng();
        (0..amount)
            .filter_map(|_| pool.choose(&mut rng).copied())
            .collect()
    }

    /// A single random variant, if any remain after exclusion
    fn random_value(except: &[Self]) -> Option<Self> {
        Self::random_values(1, except).pop()
    }
}

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($value => Ok($name::$variant),)+
                    other => Err(Error::InvalidEnumValue {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl EnumValues for $name {
            const ALL: &'static [Self] = &[$($name::$variant),+];
        }
    };
}

string_enum! {
    /// Trade direction
    TradeType {
        Buy => "BUY",
        Sell => "SELL",
    }
}

string_enum! {
    /// Order types offered by the trading platform
    OrderType {
        Market => "market",
        Limit => "limit",
        Stop => "stop",
        StopLimit => "stop limit",
    }
}

string_enum! {
    /// How stop-loss/take-profit levels are entered
    SlTpType {
        Price => "price",
        Points => "points",
    }
}

impl OrderType {
    /// Stop-limit orders exist only on MT5 servers
    pub fn is_mt5_only(&self) -> bool {
        matches!(self, OrderType::StopLimit)
    }
}

impl TradeType {
    pub fn opposite(&self) -> Self {
        match self {
            TradeType::Buy => TradeType::Sell,
            TradeType::Sell => TradeType::Buy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_wire_value() {
        assert_eq!(TradeType::Buy.to_string(), "BUY");
        assert_eq!(OrderType::StopLimit.to_string(), "stop limit");
        assert_eq!(SlTpType::Points.to_string(), "points");
    }

    #[test]
    fn test_from_str_round_trip() {
        assert_eq!("limit".parse::<OrderType>().unwrap(), OrderType::Limit);
        assert!("LIMIT".parse::<OrderType>().is_err());
    }

    #[test]
    fn test_serde_uses_wire_value() {
        let json = serde_json::to_string(&OrderType::StopLimit).unwrap();
        assert_eq!(json, "\"stop limit\"");
        let back: TradeType = serde_json::from_str("\"SELL\"").unwrap();
        assert_eq!(back, TradeType::Sell);
    }

    #[test]
    fn test_list_values_excludes() {
        assert_eq!(
            OrderType::list_values(&[OrderType::StopLimit]),
            vec![OrderType::Market, OrderType::Limit, OrderType::Stop]
        );
    }

    #[test]
    fn test_sample_values_are_distinct() {
        let picked = OrderType::sample_values(4, &[]).unwrap();
        assert_eq!(picked.len(), 4);
        for v in OrderType::ALL {
            assert!(picked.contains(v));
        }
        assert!(TradeType::sample_values(3, &[]).is_err());
    }

    #[test]
    fn test_random_values_respect_exclusion() {
        let picked = TradeType::random_values(10, &[TradeType::Buy]);
        assert_eq!(picked.len(), 10);
        assert!(picked.iter().all(|t| *t == TradeType::Sell));
        assert_eq!(TradeType::random_value(&[TradeType::Buy, TradeType::Sell]), None);
    }
}
