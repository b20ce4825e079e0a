use serde::Serialize;

use crate::error::Result;
use crate::workbook::RecordStore;

/// Rows of text under a header row.
///
/// Shared by search results over the workbook and database snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Keep the rows where some cell contains `term`, ignoring case.
///
/// An empty term keeps every row. Headers are never filtered.
///
/// # Examples
/// ```
/// use certbook::search::{Table, filter};
///
/// let table = Table {
///     headers: vec!["Company".into()],
///     rows: vec![vec!["Acme Co".into()], vec!["Globex".into()]],
/// };
/// assert_eq!(filter(&table, "acme").rows, vec![vec!["Acme Co".to_string()]]);
/// assert_eq!(filter(&table, ""), table);
/// ```
pub fn filter(table: &Table, term: &str) -> Table {
    if term.is_empty() {
        return table.clone();
    }

    let needle = fold_case(term);
    let rows = table
        .rows
        .iter()
        .filter(|row| row.iter().any(|cell| fold_case(cell).contains(&needle)))
        .cloned()
        .collect();

    Table {
        headers: table.headers.clone(),
        rows,
    }
}

/// Lower-case `text` one character at a time.
///
/// Characters whose lower-case form is longer than one character are kept
/// as they are, except the Turkish dotted and dotless I, which both fold to
/// `i`. Folding never merges or splits characters, so a term folds the same
/// way inside a cell as on its own.
fn fold_case(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{130}' | '\u{131}' => 'i',
            _ => {
                let mut lower = c.to_lowercase();
                match (lower.next(), lower.next()) {
                    (Some(l), None) => l,
                    _ => c,
                }
            }
        })
        .collect()
}

/// Re-read the workbook and filter its records.
///
/// Returns `None` when no workbook has been written yet.
pub fn search(store: &RecordStore, term: &str) -> Result<Option<Table>> {
    Ok(store.load_table()?.map(|table| filter(&table, term)))
}
