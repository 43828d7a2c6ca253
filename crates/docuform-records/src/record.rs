//! Student records and CSV parsing.

use std::collections::{BTreeMap, HashMap};

use docuform_core::normalize_field_key;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One spreadsheet row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    /// Value of the id column, trimmed.
    pub id: String,
    /// Every column of the row, keyed by header text.
    pub fields: BTreeMap<String, String>,
}

impl StudentRecord {
    /// Value of `column`, matched exactly first and then by normalized key
    /// (`"student name"` finds `"Student Name"`).
    pub fn get(&self, column: &str) -> Option<&str> {
        if let Some(value) = self.fields.get(column) {
            return Some(value);
        }
        let wanted = normalize_field_key(column);
        self.fields
            .iter()
            .find(|(header, _)| normalize_field_key(header) == wanted)
            .map(|(_, value)| value.as_str())
    }
}

/// Parsed records with an id index.
#[derive(Clone, Debug, Default)]
pub struct RecordTable {
    columns: Vec<String>,
    records: Vec<StudentRecord>,
    by_id: HashMap<String, usize>,
}

/// Normalized form of a student id used for matching.
pub fn id_key(id: &str) -> String {
    id.trim().to_lowercase()
}

impl RecordTable {
    /// Parse CSV bytes whose header row contains `id_column`.
    ///
    /// Rows with a blank id are skipped; when ids repeat, the first row
    /// wins.
    pub fn from_csv(bytes: &[u8], id_column: &str) -> Result<Self> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let wanted = normalize_field_key(id_column);
        let id_index = columns
            .iter()
            .position(|c| c == id_column)
            .or_else(|| columns.iter().position(|c| normalize_field_key(c) == wanted))
            .ok_or_else(|| Error::MissingColumn {
                column: id_column.to_string(),
                available: columns.clone(),
            })?;

        let mut table = Self {
            columns: columns.clone(),
            ..Self::default()
        };
        let mut skipped_blank = 0usize;

        for row in reader.records() {
            let row = row?;
            let id = row.get(id_index).unwrap_or("").trim();
            if id.is_empty() {
                skipped_blank += 1;
                continue;
            }
            let key = id_key(id);
            if table.by_id.contains_key(&key) {
                log::warn!("Duplicate student id '{id}' ignored (keeping first row)");
                continue;
            }

            let fields = columns
                .iter()
                .enumerate()
                .filter(|(_, header)| !header.is_empty())
                .map(|(i, header)| (header.clone(), row.get(i).unwrap_or("").to_string()))
                .collect();
            table.by_id.insert(key, table.records.len());
            table.records.push(StudentRecord {
                id: id.to_string(),
                fields,
            });
        }

        if skipped_blank > 0 {
            log::debug!("Skipped {skipped_blank} rows without a student id");
        }
        Ok(table)
    }

    /// Header row in source order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Records in source order.
    pub fn records(&self) -> &[StudentRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether there are no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record with the given id (trimmed, case-insensitive).
    pub fn get(&self, id: &str) -> Option<&StudentRecord> {
        self.by_id.get(&id_key(id)).map(|&i| &self.records[i])
    }

    /// Records whose `name_column` contains `query` (case-insensitive),
    /// falling back to the id for records without that column. A blank
    /// query returns the first `limit` records.
    pub fn search(&self, query: &str, name_column: &str, limit: usize) -> Vec<&StudentRecord> {
        let query = query.trim().to_lowercase();
        self.records
            .iter()
            .filter(|record| {
                if query.is_empty() {
                    return true;
                }
                let haystack = record
                    .get(name_column)
                    .filter(|name| !name.is_empty())
                    .unwrap_or(&record.id);
                haystack.to_lowercase().contains(&query) || record.id.to_lowercase() == query
            })
            .take(limit)
            .collect()
    }
}

/// Values for `fields` taken from `record`.
///
/// A `field_map` entry (field name → column) wins; otherwise a column whose
/// normalized header equals the normalized field name is used. Fields
/// without a matching column are omitted.
pub fn prefill<'a, I>(
    fields: I,
    record: &StudentRecord,
    field_map: &BTreeMap<String, String>,
) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut values = BTreeMap::new();
    for field in fields {
        let mapped = field_map.get(field).and_then(|column| record.get(column));
        let value = mapped.or_else(|| record.get(field));
        if let Some(value) = value {
            values.insert(field.to_string(), value.to_string());
        }
    }
    values
}
