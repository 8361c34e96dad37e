// Reading participant rosters from Excel files.

use calamine::{open_workbook, DataType, Reader, Xlsx};
use log::debug;
use snafu::prelude::*;

use crate::survey::*;

/// One participant, as listed in a roster.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RosterEntry {
    /// 1-based, as displayed by spreadsheet programs.
    pub row: usize,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

pub fn read_roster(path: &str, worksheet: Option<&str>) -> CliResult<Vec<RosterEntry>> {
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    let wrange = match worksheet {
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu { name, path })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu { path })?,
    }
    .context(OpeningExcelSnafu { path })?;

    let mut rows = wrange.rows();
    let header = rows.next().context(EmptyExcelSnafu { path })?;
    debug!("header: {:?}", header);
    Ok(roster_entries(rows))
}

/// Converts the rows following the header. Blank rows are dropped.
pub fn roster_entries<'a, I>(rows: I) -> Vec<RosterEntry>
where
    I: Iterator<Item = &'a [DataType]>,
{
    let mut res: Vec<RosterEntry> = Vec::new();
    for (idx, row) in rows.enumerate() {
        let cells: Vec<String> = row.iter().take(3).map(cell_text).collect();
        if cells.iter().all(|c| c.is_empty()) {
            continue;
        }
        let cell = |i: usize| cells.get(i).cloned().unwrap_or_default();
        let entry = RosterEntry {
            // The header is row 1.
            row: idx + 2,
            email: cell(0),
            first_name: cell(1),
            last_name: cell(2),
        };
        debug!("roster_entries: {:?}", entry);
        res.push(entry);
    }
    res
}

fn cell_text(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.trim().to_string(),
        DataType::Int(i) => i.to_string(),
        DataType::Float(f) => f.to_string(),
        DataType::Bool(b) => b.to_string(),
        _ => "".to_string(),
    }
}
