use garde::Validate;

use crate::models::batch::ManifestRow;

/// The exact header row a batch manifest must carry, in order.
const REQUIRED_HEADERS: [&str; 3] = ["Serial Number", "Product Name", "Input Image Urls"];

/// Parse and validate an uploaded CSV manifest.
///
/// The manifest is accepted or rejected as a unit: a wrong header or any
/// row missing one of its three fields fails the whole upload.
pub fn parse_manifest(bytes: &[u8]) -> Result<Vec<ManifestRow>, ManifestError> {
    let mut reader = csv::Reader::from_reader(bytes);

    let headers = reader.headers().map_err(ManifestError::Csv)?;
    if headers.len() != REQUIRED_HEADERS.len()
        || headers.iter().zip(REQUIRED_HEADERS).any(|(h, want)| h != want)
    {
        return Err(ManifestError::Header {
            found: headers.iter().collect::<Vec<_>>().join(", "),
        });
    }

    let mut rows = Vec::new();
    for (idx, record) in reader.deserialize::<ManifestRow>().enumerate() {
        let line = idx + 2; // header is line 1
        let row = record.map_err(ManifestError::Csv)?;
        row.validate()
            .map_err(|report| ManifestError::Row { line, report })?;
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(ManifestError::Empty);
    }

    Ok(rows)
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("manifest header must be \"Serial Number, Product Name, Input Image Urls\", found \"{found}\"")]
    Header { found: String },

    #[error("manifest row {line} is invalid: {report}")]
    Row { line: usize, report: garde::Report },

    #[error("manifest contains no rows")]
    Empty,

    #[error("failed to read manifest: {0}")]
    Csv(#[from] csv::Error),
}
