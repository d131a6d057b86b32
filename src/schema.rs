//! Column names and the load-time schema check.
//!
//! The source files are identified by column name. Which optional columns are
//! present is decided once, when the headers are read, and carried alongside
//! the data as a [`Schema`] so no later stage has to probe for columns.

use std::path::Path;

use csv::StringRecord;
use serde::Serialize;

use crate::error::{PipelineError, PipelineResult};

pub const STORE: &str = "Store";
pub const DATE: &str = "Date";
pub const SALES: &str = "Sales";
pub const CUSTOMERS: &str = "Customers";
pub const OPEN: &str = "Open";
pub const PROMO: &str = "Promo";
pub const DAY_OF_WEEK: &str = "DayOfWeek";
pub const STATE_HOLIDAY: &str = "StateHoliday";
pub const SCHOOL_HOLIDAY: &str = "SchoolHoliday";

pub const STORE_TYPE: &str = "StoreType";
pub const ASSORTMENT: &str = "Assortment";
pub const COMPETITION_DISTANCE: &str = "CompetitionDistance";
pub const PROMO2: &str = "Promo2";

const SALES_REQUIRED: [&str; 3] = [STORE, DATE, SALES];
const STORE_REQUIRED: [&str; 1] = [STORE];

/// Optional columns observed in the two source files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Schema {
    pub customers: bool,
    pub open: bool,
    pub promo: bool,
    pub day_of_week: bool,
    pub state_holiday: bool,
    pub school_holiday: bool,
    pub store_type: bool,
    pub assortment: bool,
    pub competition_distance: bool,
    pub promo2: bool,
}

impl Schema {
    /// Validate both header rows and record which optional columns exist.
    pub fn from_headers(
        sales: &StringRecord,
        sales_path: &Path,
        stores: &StringRecord,
        stores_path: &Path,
    ) -> PipelineResult<Self> {
        require(sales, sales_path, &SALES_REQUIRED)?;
        require(stores, stores_path, &STORE_REQUIRED)?;

        let has = |headers: &StringRecord, name: &str| headers.iter().any(|h| h.trim() == name);

        Ok(Self {
            customers: has(sales, CUSTOMERS),
            open: has(sales, OPEN),
            promo: has(sales, PROMO),
            day_of_week: has(sales, DAY_OF_WEEK),
            state_holiday: has(sales, STATE_HOLIDAY),
            school_holiday: has(sales, SCHOOL_HOLIDAY),
            store_type: has(stores, STORE_TYPE),
            assortment: has(stores, ASSORTMENT),
            competition_distance: has(stores, COMPETITION_DISTANCE),
            promo2: has(stores, PROMO2),
        })
    }

    /// `Ok(())` when `column` was present at load time, `ColumnMissing` otherwise.
    ///
    /// Required columns always pass.
    pub fn ensure(&self, column: &'static str) -> PipelineResult<()> {
        let present = match column {
            STORE | DATE | SALES => true,
            CUSTOMERS => self.customers,
            OPEN => self.open,
            PROMO => self.promo,
            DAY_OF_WEEK => self.day_of_week,
            STATE_HOLIDAY => self.state_holiday,
            SCHOOL_HOLIDAY => self.school_holiday,
            STORE_TYPE => self.store_type,
            ASSORTMENT => self.assortment,
            COMPETITION_DISTANCE => self.competition_distance,
            PROMO2 => self.promo2,
            _ => false,
        };
        if present {
            Ok(())
        } else {
            Err(PipelineError::ColumnMissing { column })
        }
    }
}

fn require(headers: &StringRecord, path: &Path, required: &[&str]) -> PipelineResult<()> {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|name| !headers.iter().any(|h| h.trim() == *name))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(PipelineError::MalformedSource {
        path: path.to_path_buf(),
        reason: format!("missing required column(s): {}", missing.join(", ")),
    })
}
