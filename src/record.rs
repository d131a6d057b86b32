use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One row of `train.csv` as it sits on disk.
///
/// Every cell is optional so a missing column or a garbage value degrades to
/// `None` instead of failing the whole file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSalesRow {
    #[serde(rename = "Store", default)]
    pub store: Option<String>,
    #[serde(rename = "Date", default)]
    pub date: Option<String>,
    #[serde(rename = "Sales", default, deserialize_with = "csv::invalid_option")]
    pub sales: Option<f64>,
    #[serde(rename = "Customers", default, deserialize_with = "csv::invalid_option")]
    pub customers: Option<f64>,
    #[serde(rename = "Open", default, deserialize_with = "csv::invalid_option")]
    pub open: Option<f64>,
    #[serde(rename = "Promo", default, deserialize_with = "csv::invalid_option")]
    pub promo: Option<f64>,
    #[serde(rename = "DayOfWeek", default, deserialize_with = "csv::invalid_option")]
    pub day_of_week: Option<f64>,
    #[serde(rename = "StateHoliday", default)]
    pub state_holiday: Option<String>,
    #[serde(rename = "SchoolHoliday", default, deserialize_with = "csv::invalid_option")]
    pub school_holiday: Option<f64>,
}

/// One row of `store.csv` as it sits on disk.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStoreRow {
    #[serde(rename = "Store", default)]
    pub store: Option<String>,
    #[serde(rename = "StoreType", default)]
    pub store_type: Option<String>,
    #[serde(rename = "Assortment", default)]
    pub assortment: Option<String>,
    #[serde(rename = "CompetitionDistance", default, deserialize_with = "csv::invalid_option")]
    pub competition_distance: Option<f64>,
    #[serde(rename = "Promo2", default, deserialize_with = "csv::invalid_option")]
    pub promo2: Option<f64>,
}

/// Store-level attributes, one per store id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreAttributes {
    pub store_type: Option<String>,
    pub assortment: Option<String>,
    pub competition_distance: Option<f64>,
    pub promo2: Option<bool>,
}

impl StoreAttributes {
    pub fn from_raw(raw: RawStoreRow) -> Self {
        Self {
            store_type: non_empty(raw.store_type),
            assortment: non_empty(raw.assortment),
            competition_distance: raw.competition_distance.filter(|d| d.is_finite()),
            promo2: raw.promo2.and_then(flag),
        }
    }
}

/// A sales row after the join: daily figures plus the store's attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesRecord {
    pub store: i64,
    pub date: NaiveDate,
    pub sales: Option<f64>,
    pub customers: Option<u64>,
    pub open: bool,
    pub promo: Option<bool>,
    /// 1 = Monday … 7 = Sunday
    pub day_of_week: Option<u8>,
    pub state_holiday: Option<String>,
    pub school_holiday: Option<bool>,
    #[serde(flatten)]
    pub attributes: StoreAttributes,
}

impl SalesRecord {
    /// Build a record without store attributes; mostly useful in tests.
    pub fn new(store: i64, date: NaiveDate, sales: f64) -> Self {
        Self {
            store,
            date,
            sales: Some(sales),
            customers: None,
            open: true,
            promo: None,
            day_of_week: None,
            state_holiday: None,
            school_holiday: None,
            attributes: StoreAttributes::default(),
        }
    }
}

/// Parse a store id cell. Accepts `7` and `7.0`.
pub fn parse_store_id(cell: &str) -> Option<i64> {
    let cell = cell.trim();
    if let Ok(id) = cell.parse::<i64>() {
        return Some(id);
    }
    let f = cell.parse::<f64>().ok()?;
    (f.is_finite() && f.fract() == 0.0).then_some(f as i64)
}

/// Slash dates with the year last are read month-first.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Lenient calendar-date parse; `None` for anything unrecognised.
pub fn parse_date(cell: &str) -> Option<NaiveDate> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(cell, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(cell, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// 0/1 cell to bool; anything else is unknown.
pub fn flag(v: f64) -> Option<bool> {
    if v == 1.0 {
        Some(true)
    } else if v == 0.0 {
        Some(false)
    } else {
        None
    }
}

/// Trimmed, non-empty categorical value. `0.0`-style numerics collapse to `0`.
pub fn non_empty(cell: Option<String>) -> Option<String> {
    let cell = cell?;
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 => Some(format!("{}", f as i64)),
        _ => Some(trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2015, 7, 31).unwrap();
        assert_eq!(parse_date("2015-07-31"), Some(expected));
        assert_eq!(parse_date("2015/07/31"), Some(expected));
        assert_eq!(parse_date("07/31/2015"), Some(expected));
        assert_eq!(parse_date("2015-07-31 00:00:00"), Some(expected));
        assert_eq!(parse_date(" 2015-07-31 "), Some(expected));
    }

    #[test]
    fn slash_dates_are_month_first() {
        assert_eq!(
            parse_date("01/02/2015"),
            NaiveDate::from_ymd_opt(2015, 1, 2)
        );
        assert_eq!(parse_date("31/07/2015"), None);
    }

    #[test]
    fn rejects_garbage_dates() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("not-a-date"), None);
        assert_eq!(parse_date("2015-02-30"), None);
    }

    #[test]
    fn store_ids_accept_float_notation() {
        assert_eq!(parse_store_id("12"), Some(12));
        assert_eq!(parse_store_id("12.0"), Some(12));
        assert_eq!(parse_store_id("12.5"), None);
        assert_eq!(parse_store_id("x"), None);
    }

    #[test]
    fn categorical_cells_are_normalised() {
        assert_eq!(non_empty(Some(" a ".into())), Some("a".into()));
        assert_eq!(non_empty(Some("0.0".into())), Some("0".into()));
        assert_eq!(non_empty(Some("  ".into())), None);
        assert_eq!(non_empty(None), None);
    }

    #[test]
    fn flags_only_accept_zero_and_one() {
        assert_eq!(flag(1.0), Some(true));
        assert_eq!(flag(0.0), Some(false));
        assert_eq!(flag(2.0), None);
    }
}
