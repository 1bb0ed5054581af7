use std::collections::BTreeMap;

use crate::model::{
    period::Period,
    salary::{PeriodCount, SalaryRecord},
};

/// Groups records by (year, month), counting records per period.
pub fn count_by_period<'a>(records: impl IntoIterator<Item = &'a SalaryRecord>) -> Vec<PeriodCount> {
    let mut counts: BTreeMap<Period, u64> = BTreeMap::new();
    for record in records {
        *counts.entry(record.period()).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(period, count)| PeriodCount {
            year: period.year,
            month: period.month,
            count,
        })
        .collect()
}

/// Orders the history view: years descending, then months descending.
pub fn sort_latest_first(counts: &mut [PeriodCount]) {
    counts.sort_by(|a, b| b.period().cmp(&a.period()));
}
