use crate::domain::ports::Storage;
use crate::utils::error::{Result, WxError};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Parses CSV rows, skipping (and logging) the ones that do not fit `T`.
pub fn parse_rows<T: DeserializeOwned>(data: &[u8], source: &str) -> Vec<T> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    let mut rows = Vec::new();
    for (index, row) in reader.deserialize::<T>().enumerate() {
        match row {
            Ok(row) => rows.push(row),
            Err(e) => tracing::warn!("Skipping unreadable row {} in {}: {}", index + 2, source, e),
        }
    }
    rows
}

pub fn serialize_rows<T: Serialize>(rows: &[T], with_header: bool) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(with_header)
        .from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| WxError::processing(format!("flushing CSV buffer: {}", e)))
}

/// Reads a whole table; a missing file is an empty table.
pub async fn read_table<S: Storage, T: DeserializeOwned>(storage: &S, path: &str) -> Result<Vec<T>> {
    if !storage.exists(path).await {
        tracing::debug!("{} does not exist yet", path);
        return Ok(Vec::new());
    }
    let data = storage.read_file(path).await?;
    Ok(parse_rows(&data, path))
}

/// Appends rows, writing the header first when the file is new or truncated.
pub async fn append_rows<S: Storage, T: Serialize>(storage: &S, path: &str, rows: &[T]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let with_header = storage.is_empty(path).await;
    let data = serialize_rows(rows, with_header)?;
    storage.append_file(path, &data).await
}
