//! SAP-style validity dates.
//!
//! The wire format is `dd.mm.yyyy` everywhere (requests, responses), while
//! the database stores a proper `DATE`. `WireDate` bridges the two so that
//! handlers get parse errors at the boundary instead of opaque strings in
//! storage.

use chrono::NaiveDate;
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::Date;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const WIRE_FORMAT: &str = "%d.%m.%Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, AsExpression, FromSqlRow)]
#[diesel(sql_type = Date)]
pub struct WireDate(pub NaiveDate);

impl fmt::Display for WireDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(WIRE_FORMAT))
    }
}

impl FromStr for WireDate {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, WIRE_FORMAT).map(WireDate)
    }
}

impl Serialize for WireDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self)
    }
}

impl<'de> Deserialize<'de> for WireDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(|_| {
            de::Error::custom(format!("invalid date '{raw}', expected dd.mm.yyyy"))
        })
    }
}

impl ToSql<Date, Pg> for WireDate {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        <NaiveDate as ToSql<Date, Pg>>::to_sql(&self.0, out)
    }
}

impl FromSql<Date, Pg> for WireDate {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        <NaiveDate as FromSql<Date, Pg>>::from_sql(bytes).map(WireDate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_format() {
        let date: WireDate = "01.01.2024".parse().unwrap();
        assert_eq!(date.0, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn formats_with_zero_padding() {
        let date = WireDate(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(date.to_string(), "05.03.2024");
    }

    #[test]
    fn round_trips_through_serde() {
        let date: WireDate = serde_json::from_str("\"31.12.2099\"").unwrap();
        assert_eq!(serde_json::to_string(&date).unwrap(), "\"31.12.2099\"");
    }

    #[test]
    fn rejects_invalid_dates() {
        assert!("2024-01-01".parse::<WireDate>().is_err());
        assert!("32.01.2024".parse::<WireDate>().is_err());
        assert!("not a date".parse::<WireDate>().is_err());
    }

    #[test]
    fn orders_chronologically() {
        let early: WireDate = "01.01.2024".parse().unwrap();
        let late: WireDate = "31.12.2099".parse().unwrap();
        assert!(early < late);
    }
}
