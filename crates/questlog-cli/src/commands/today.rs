//! The today view.

use questlog_core::review;

use super::{open_db, parse_date, print_json, CliResult};

pub fn run(date: Option<String>) -> CliResult {
    let db = open_db()?;
    let view = review::today_view(&db, parse_date(date.as_deref())?)?;
    print_json(&view)
}
