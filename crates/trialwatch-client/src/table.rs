use scraper::{ElementRef, Html, Selector};
use trialwatch_core::error::AppError;
use trialwatch_core::models::RowCells;

/// Result table of the MFDS clinical trial approval listing.
pub const DEFAULT_TABLE_SELECTOR: &str = "#searchResultList table";

const ROW_SELECTOR: &str = "tbody > tr";
const CELL_SELECTOR: &str = "td";

/// Reads the result table out of a rendered listing page.
///
/// Selectors are compiled once, so a bad table selector is caught at
/// startup rather than on every page.
#[derive(Debug, Clone)]
pub struct TableParser {
    table: Selector,
    row: Selector,
    cell: Selector,
}

impl TableParser {
    pub fn new(table_selector: &str) -> Result<Self, AppError> {
        Ok(Self {
            table: compile(table_selector)?,
            row: compile(ROW_SELECTOR)?,
            cell: compile(CELL_SELECTOR)?,
        })
    }

    /// Cell texts of every body row of the first matching table.
    ///
    /// Errors if no table matches; an empty table yields no rows.
    pub fn parse(&self, html: &str) -> Result<Vec<RowCells>, String> {
        let document = Html::parse_document(html);
        let table = document
            .select(&self.table)
            .next()
            .ok_or_else(|| "result table not found".to_string())?;

        Ok(table
            .select(&self.row)
            .map(|row| row.select(&self.cell).map(cell_text).collect())
            .collect())
    }
}

fn compile(selector: &str) -> Result<Selector, AppError> {
    Selector::parse(selector)
        .map_err(|e| AppError::ConfigError(format!("Invalid CSS selector '{selector}': {e}")))
}

/// Visible text of a cell with whitespace runs collapsed to single spaces.
fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
