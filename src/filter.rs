//! Row predicates, combined with logical AND.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::{Dataset, FilteredView};
use crate::error::{PipelineError, PipelineResult};
use crate::record::SalesRecord;
use crate::schema::{self, Schema};

/// Inclusive calendar interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> PipelineResult<Self> {
        if start > end {
            return Err(PipelineError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Resolve a possibly incomplete selection.
    ///
    /// Unless both ends are given the full `bounds` are used.
    pub fn from_selection(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        bounds: (NaiveDate, NaiveDate),
    ) -> PipelineResult<Self> {
        match (start, end) {
            (Some(start), Some(end)) => Self::new(start, end),
            _ => Self::new(bounds.0, bounds.1),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Text-valued columns a category predicate can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryColumn {
    StoreType,
    Assortment,
    StateHoliday,
}

impl CategoryColumn {
    pub fn column_name(self) -> &'static str {
        match self {
            CategoryColumn::StoreType => schema::STORE_TYPE,
            CategoryColumn::Assortment => schema::ASSORTMENT,
            CategoryColumn::StateHoliday => schema::STATE_HOLIDAY,
        }
    }

    pub fn value(self, record: &SalesRecord) -> Option<&str> {
        match self {
            CategoryColumn::StoreType => record.attributes.store_type.as_deref(),
            CategoryColumn::Assortment => record.attributes.assortment.as_deref(),
            CategoryColumn::StateHoliday => record.state_holiday.as_deref(),
        }
    }
}

/// Integer-valued columns a membership predicate can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MembershipColumn {
    /// 0 = no promo, 1 = promo
    Promo,
    Store,
    DayOfWeek,
    SchoolHoliday,
    /// Store's continuing-promotion participation
    Promo2,
}

impl MembershipColumn {
    pub fn column_name(self) -> &'static str {
        match self {
            MembershipColumn::Promo => schema::PROMO,
            MembershipColumn::Store => schema::STORE,
            MembershipColumn::DayOfWeek => schema::DAY_OF_WEEK,
            MembershipColumn::SchoolHoliday => schema::SCHOOL_HOLIDAY,
            MembershipColumn::Promo2 => schema::PROMO2,
        }
    }

    pub fn value(self, record: &SalesRecord) -> Option<i64> {
        match self {
            MembershipColumn::Promo => record.promo.map(i64::from),
            MembershipColumn::Store => Some(record.store),
            MembershipColumn::DayOfWeek => record.day_of_week.map(i64::from),
            MembershipColumn::SchoolHoliday => record.school_holiday.map(i64::from),
            MembershipColumn::Promo2 => record.attributes.promo2.map(i64::from),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    DateRange(DateRange),
    /// An empty `allowed` set disables the predicate.
    Category {
        column: CategoryColumn,
        allowed: BTreeSet<String>,
    },
    /// An empty `allowed` set rejects every row.
    Membership {
        column: MembershipColumn,
        allowed: BTreeSet<i64>,
    },
}

impl Predicate {
    pub fn matches(&self, record: &SalesRecord) -> bool {
        match self {
            Predicate::DateRange(range) => range.contains(record.date),
            Predicate::Category { column, allowed } => {
                allowed.is_empty()
                    || column
                        .value(record)
                        .is_some_and(|v| allowed.contains(v))
            }
            Predicate::Membership { column, allowed } => column
                .value(record)
                .is_some_and(|v| allowed.contains(&v)),
        }
    }

    /// Predicates that cannot narrow the view: empty category selections and
    /// anything targeting a column the data does not have.
    fn is_noop(&self, schema: &Schema) -> bool {
        match self {
            Predicate::DateRange(_) => false,
            Predicate::Category { column, allowed } => {
                allowed.is_empty() || schema.ensure(column.column_name()).is_err()
            }
            Predicate::Membership { column, .. } => schema.ensure(column.column_name()).is_err(),
        }
    }
}

/// An ordered list of predicates applied conjunctively.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    predicates: Vec<Predicate>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn date_range(self, range: DateRange) -> Self {
        self.push(Predicate::DateRange(range))
    }

    pub fn category<I, S>(self, column: CategoryColumn, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(Predicate::Category {
            column,
            allowed: allowed.into_iter().map(Into::into).collect(),
        })
    }

    pub fn membership<I>(self, column: MembershipColumn, allowed: I) -> Self
    where
        I: IntoIterator<Item = i64>,
    {
        self.push(Predicate::Membership {
            column,
            allowed: allowed.into_iter().collect(),
        })
    }

    /// Store-id selection from the store picker. Unlike
    /// [`FilterSet::membership`], an empty selection keeps every store.
    pub fn stores<I>(self, chosen: I) -> Self
    where
        I: IntoIterator<Item = i64>,
    {
        let allowed: BTreeSet<i64> = chosen.into_iter().collect();
        if allowed.is_empty() {
            return self;
        }
        self.push(Predicate::Membership {
            column: MembershipColumn::Store,
            allowed,
        })
    }

    pub fn apply<'a>(&self, dataset: &'a Dataset) -> FilteredView<'a> {
        self.apply_to(&dataset.view())
    }

    /// Narrow an existing view. The view and its dataset are left untouched.
    pub fn apply_to<'a>(&self, view: &FilteredView<'a>) -> FilteredView<'a> {
        let schema = view.schema();
        let active: Vec<&Predicate> = self
            .predicates
            .iter()
            .filter(|p| !p.is_noop(schema))
            .collect();

        if active.is_empty() {
            return view.clone();
        }

        let narrowed = view.retain(|r| active.iter().all(|p| p.matches(r)));
        debug!(
            predicates = active.len(),
            before = view.len(),
            after = narrowed.len(),
            "filters applied"
        );
        narrowed
    }
}

/// Observed distinct values of a categorical column, sorted, nulls dropped.
pub fn distinct_categories(view: &FilteredView<'_>, column: CategoryColumn) -> Vec<String> {
    view.iter()
        .filter_map(|r| column.value(r))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_owned)
        .collect()
}

/// Store ids to offer in the store picker, or `None` when the view holds more
/// than `limit` distinct stores.
pub fn store_picker_options(view: &FilteredView<'_>, limit: usize) -> Option<Vec<i64>> {
    let stores = view.distinct_stores();
    (stores.len() <= limit).then_some(stores)
}
