//! Column checks for Gherkin tables, run before any request is sent.

use super::RequestError;

/// Checks a table header row against required and allowed columns.
///
/// An empty `allowed` list permits any column.
///
/// # Errors
///
/// Returns [`RequestError::EmptyTable`] for an empty header,
/// [`RequestError::MissingColumn`] for a missing required column and
/// [`RequestError::UnexpectedColumn`] for a column outside `allowed`.
pub fn verify_table_columns<S: AsRef<str>>(
    header: &[S],
    required: &[&str],
    allowed: &[&str],
) -> Result<(), RequestError> {
    if header.is_empty() {
        return Err(RequestError::EmptyTable);
    }
    if let Some(missing) = required
        .iter()
        .find(|column| !header.iter().any(|found| found.as_ref() == **column))
    {
        return Err(RequestError::MissingColumn((*missing).to_owned()));
    }
    if allowed.is_empty() {
        return Ok(());
    }
    if let Some(extra) = header.iter().find(|found| {
        let name = found.as_ref();
        !allowed.contains(&name) && !required.contains(&name)
    }) {
        return Err(RequestError::UnexpectedColumn(extra.as_ref().to_owned()));
    }
    Ok(())
}

/// Checks that every row of a table has `expected` cells.
///
/// # Errors
///
/// Returns [`RequestError::EmptyTable`] for a table without rows and
/// [`RequestError::ColumnCount`] for the first row of another width.
pub fn verify_column_count<S: AsRef<str>>(
    rows: &[Vec<S>],
    expected: usize,
) -> Result<(), RequestError> {
    if rows.is_empty() {
        return Err(RequestError::EmptyTable);
    }
    match rows.iter().find(|row| row.len() != expected) {
        Some(row) => Err(RequestError::ColumnCount {
            expected,
            found: row.len(),
        }),
        None => Ok(()),
    }
}
