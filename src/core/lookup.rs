use crate::domain::ports::Storage;
use crate::utils::error::{Result, WxError};
use std::collections::HashMap;

/// Two-column `id,<value>` table used to normalise repeated forecast strings
/// (short descriptions, icon URLs).
#[derive(Debug, Clone, PartialEq)]
pub struct LookupTable {
    value_column: String,
    entries: Vec<(u64, String)>,
    index: HashMap<String, u64>,
}

impl LookupTable {
    pub fn new(value_column: impl Into<String>) -> Self {
        Self {
            value_column: value_column.into(),
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn from_csv(value_column: impl Into<String>, data: &[u8]) -> Result<Self> {
        let mut table = Self::new(value_column);
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(data);

        let headers = reader.headers()?.clone();
        let id_pos = headers.iter().position(|h| h == "id");
        let value_pos = headers.iter().position(|h| h == table.value_column);
        let (id_pos, value_pos) = match (id_pos, value_pos) {
            (Some(i), Some(v)) => (i, v),
            _ => {
                return Err(WxError::processing(format!(
                    "lookup table needs 'id' and '{}' columns, found {:?}",
                    table.value_column,
                    headers.iter().collect::<Vec<_>>()
                )))
            }
        };

        for record in reader.records() {
            let record = record?;
            let (Some(raw_id), Some(value)) = (record.get(id_pos), record.get(value_pos)) else {
                continue;
            };
            match raw_id.parse::<f64>() {
                Ok(id) if id >= 0.0 && id.fract() == 0.0 => table.insert(id as u64, value),
                _ => tracing::warn!("Ignoring lookup row with bad id '{}'", raw_id),
            }
        }
        Ok(table)
    }

    pub async fn load<S: Storage>(storage: &S, path: &str, value_column: &str) -> Result<Self> {
        if !storage.exists(path).await {
            return Ok(Self::new(value_column));
        }
        let data = storage.read_file(path).await?;
        Self::from_csv(value_column, &data)
    }

    fn insert(&mut self, id: u64, value: &str) {
        // first id wins if the file somehow repeats a value
        self.index.entry(value.to_string()).or_insert(id);
        self.entries.push((id, value.to_string()));
    }

    pub fn id_of(&self, value: &str) -> Option<u64> {
        self.index.get(value).copied()
    }

    pub fn value_of(&self, id: u64) -> Option<&str> {
        self.entries
            .iter()
            .find(|(entry_id, _)| *entry_id == id)
            .map(|(_, value)| value.as_str())
    }

    pub fn max_id(&self) -> u64 {
        self.entries.iter().map(|(id, _)| *id).max().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Id for `value`, allocating `max + 1` for values not seen before.
    /// Returns the id and whether the table grew.
    pub fn get_or_insert(&mut self, value: &str) -> (u64, bool) {
        if let Some(id) = self.id_of(value) {
            return (id, false);
        }
        let id = self.max_id() + 1;
        self.insert(id, value);
        (id, true)
    }

    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["id", self.value_column.as_str()])?;
        for (id, value) in &self.entries {
            writer.write_record([id.to_string().as_str(), value.as_str()])?;
        }
        writer
            .into_inner()
            .map_err(|e| WxError::processing(format!("flushing lookup table: {}", e)))
    }
}
