use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};
use utoipa::ToSchema;

/// Calendar month, stored and rendered by its English name.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    ToSchema,
)]
#[strum(ascii_case_insensitive)]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    /// 1-based month number.
    pub fn number(self) -> u32 {
        self as u32 + 1
    }

    pub fn from_number(number: u32) -> Option<Self> {
        Month::iter().nth(number.checked_sub(1)? as usize)
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

impl TryFrom<String> for Month {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A (year, month) salary period. Orders chronologically.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
pub struct Period {
    #[schema(example = 2025)]
    pub year: i32,
    #[schema(example = "March")]
    pub month: Month,
}

impl Period {
    pub fn new(year: i32, month: Month) -> Self {
        Self { year, month }
    }

    pub fn containing(date: NaiveDate) -> Self {
        // chrono months are always 1..=12
        let month = Month::from_number(date.month()).unwrap_or(Month::January);
        Self::new(date.year(), month)
    }

    pub fn previous(self) -> Self {
        match self.month {
            Month::January => Self::new(self.year - 1, Month::December),
            m => Self::new(self.year, Month::from_number(m.number() - 1).unwrap_or(m)),
        }
    }

    /// The `N` periods ending at (and including) `self`, oldest first.
    pub fn trailing(self, count: u32) -> Vec<Period> {
        let mut periods = Vec::with_capacity(count as usize);
        let mut cursor = self;
        for _ in 0..count {
            periods.push(cursor);
            cursor = cursor.previous();
        }
        periods.reverse();
        periods
    }

    /// Filename the dashboard expects for a monthly salary upload, e.g. `March2025.csv`.
    pub fn upload_filename(&self) -> String {
        format!("{}{}.csv", self.month, self.year)
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.month, self.year)
    }
}
