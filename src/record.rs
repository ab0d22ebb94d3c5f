use crate::{CsvParserError, CsvResult};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// One data row keyed by header name, in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    entries: Vec<(String, String)>,
}

impl Record {
    /// Zip `headers` with `values`. Both must have the same length.
    ///
    /// A repeated header keeps its first position and takes the later value.
    pub fn try_from_pairs(headers: &[String], values: Vec<String>) -> CsvResult<Self> {
        if headers.len() != values.len() {
            return Err(CsvParserError::InvalidData(format!(
                "expected {} fields, found {}",
                headers.len(),
                values.len()
            )));
        }
        let mut record = Record {
            entries: Vec::with_capacity(headers.len()),
        };
        for (header, value) in headers.iter().zip(values) {
            record.insert(header.clone(), value);
        }
        Ok(record)
    }

    fn insert(&mut self, header: String, value: String) {
        match self.entries.iter_mut().find(|(h, _)| *h == header) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((header, value)),
        }
    }

    pub fn get(&self, header: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(h, _)| h.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(h, v)| (h.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::default();
        for (header, value) in iter {
            record.insert(header.into(), value.into());
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (header, value) in &self.entries {
            map.serialize_entry(header, value)?;
        }
        map.end()
    }
}

/// Result of a parse: bare rows, or records keyed by the header row.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(untagged)]
pub enum Parsed {
    Rows(Vec<Vec<String>>),
    Records(Vec<Record>),
}

impl Parsed {
    pub fn len(&self) -> usize {
        match self {
            Parsed::Rows(rows) => rows.len(),
            Parsed::Records(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_rows(self) -> Option<Vec<Vec<String>>> {
        match self {
            Parsed::Rows(rows) => Some(rows),
            Parsed::Records(_) => None,
        }
    }

    pub fn into_records(self) -> Option<Vec<Record>> {
        match self {
            Parsed::Records(records) => Some(records),
            Parsed::Rows(_) => None,
        }
    }
}
