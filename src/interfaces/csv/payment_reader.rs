use crate::domain::payment::PaymentRow;
use crate::error::{OpsError, Result};
use std::io::Read;

/// Reads payment rows from a CSV source with a header line.
///
/// Cells are trimmed and rows may omit trailing optional columns.
pub struct PaymentReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> PaymentReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Column names of the source; fails when the source has no header line.
    pub fn headers(&mut self) -> Result<Vec<String>> {
        let headers = self.reader.headers()?;
        if headers.is_empty() || headers.iter().all(str::is_empty) {
            return Err(OpsError::InvalidRow {
                row: 1,
                reason: "CSV file is empty or has no headers".to_string(),
            });
        }
        Ok(headers.iter().map(str::to_string).collect())
    }

    /// Lazily deserializes the remaining rows.
    pub fn rows(self) -> impl Iterator<Item = Result<PaymentRow>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(OpsError::from))
    }
}
