pub use crate::config::*;

/// A builder for assembling a table row by row.
///
/// The readers of the command line program go through it, and it is the simplest way
/// to feed data from other sources.
///
/// ```
/// pub use diversity_index::builder::Builder;
/// pub use diversity_index::RawValue;
///
/// let mut builder = Builder::new(&["species", "count"]);
/// builder.add_row_simple(&["Parus major", "3"]);
/// builder.add_record(&[("species", "Erithacus rubecula".into()), ("count", RawValue::Number(1.0))]);
/// let table = builder.build();
///
/// assert_eq!(table.row_count(), 2);
/// ```
pub struct Builder {
    pub(crate) _columns: Vec<String>,
    pub(crate) _records: Vec<Record>,
}

impl Builder {
    pub fn new(columns: &[&str]) -> Builder {
        Builder {
            _columns: columns.iter().map(|s| s.to_string()).collect(),
            _records: Vec::new(),
        }
    }

    /// Starts from an explicit list of owned column names, as read from a header row.
    pub fn with_columns(columns: Vec<String>) -> Builder {
        Builder {
            _columns: columns,
            _records: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self._columns
    }

    /// Adds a row of text cells, matched to the columns by position.
    ///
    /// A row shorter than the header leaves the last fields absent. Extra cells are dropped.
    pub fn add_row_simple(&mut self, cells: &[&str]) {
        let values: Vec<RawValue> = cells.iter().map(|s| RawValue::from(*s)).collect();
        self.add_row(values);
    }

    /// Adds a row of values, matched to the columns by position.
    pub fn add_row(&mut self, values: Vec<RawValue>) {
        let fields: Vec<(String, RawValue)> = self
            ._columns
            .iter()
            .cloned()
            .zip(values)
            .collect();
        self._records.push(Record { fields });
    }

    /// Adds a record with named fields. The fields do not need to follow the order of the
    /// columns, and missing fields are absent.
    pub fn add_record(&mut self, fields: &[(&str, RawValue)]) {
        self._records.push(Record {
            fields: fields
                .iter()
                .map(|(name, v)| (name.to_string(), v.clone()))
                .collect(),
        });
    }

    pub fn num_records(&self) -> usize {
        self._records.len()
    }

    pub fn build(self) -> Table {
        Table {
            columns: self._columns,
            records: self._records,
        }
    }
}
