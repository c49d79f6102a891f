//! Work timing and date formatting for batch logs

use std::fmt::Write as _;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, NaiveDate};
use tracing::info;

use crate::error::{DocIdError, DocIdResult};

const BANNER: &str = "#######################################################";

/// `HH:MM:SS` for a millisecond count; sub-second remainders are dropped
pub fn format_elapsed(elapsed_ms: i64) -> String {
    let seconds = elapsed_ms.unsigned_abs() / 1000;
    let sign = if elapsed_ms < 0 && seconds > 0 { "-" } else { "" };
    format!(
        "{}{:02}:{:02}:{:02}",
        sign,
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Log start, end and duration of a named unit of work between two banners
pub fn show_work_time(start: DateTime<Local>, end: DateTime<Local>, work_name: &str) {
    let elapsed_ms = (end - start).num_milliseconds();

    info!("{}", BANNER);
    info!("## {} started: {}", work_name, start.format("%Y-%m-%d %H:%M:%S"));
    info!("## {} finished: {}", work_name, end.format("%Y-%m-%d %H:%M:%S"));
    info!(
        work = work_name,
        elapsed_ms,
        "## {} took {} ms ({} hh:mm:ss)",
        work_name,
        elapsed_ms,
        format_elapsed(elapsed_ms)
    );
    info!("{}", BANNER);
}

/// Wall-clock timer that reports through `show_work_time` when finished
#[derive(Debug, Clone)]
pub struct WorkTimer {
    name: String,
    started: DateTime<Local>,
}

impl WorkTimer {
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            started: Local::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn started(&self) -> DateTime<Local> {
        self.started
    }

    /// Log the timing block and return the elapsed milliseconds
    pub fn finish(self) -> i64 {
        let end = Local::now();
        show_work_time(self.started, end, &self.name);
        (end - self.started).num_milliseconds()
    }
}

/// Format a calendar date with a strftime pattern such as `%Y-%m-%d`.
///
/// Unknown specifiers and time-of-day fields are rejected instead of
/// producing partial output.
pub fn format_date(date: NaiveDate, pattern: &str) -> DocIdResult<String> {
    let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(DocIdError::InvalidInput(format!(
            "Invalid date pattern: {:?}",
            pattern
        )));
    }

    let mut formatted = String::new();
    write!(formatted, "{}", date.format_with_items(items.into_iter())).map_err(|_| {
        DocIdError::InvalidInput(format!("Date pattern needs a time of day: {:?}", pattern))
    })?;
    Ok(formatted)
}
