// ********* Input data structures ***********

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Display;

/// The content of one cell, as handed over by a table reader.
///
/// Readers do not interpret the cells: a CSV file only produces text, while JSON
/// extracted by a vision model may mix strings, numbers and booleans in the same column.
#[derive(PartialEq, Debug, Clone)]
pub enum RawValue {
    Text(String),
    Number(f64),
    Bool(bool),
    /// A missing field or an explicit null.
    Absent,
}

impl RawValue {
    /// The textual rendering of the value, as a spreadsheet user would read it.
    ///
    /// Numbers use their shortest form (`3` and not `3.0`). Absent values have no rendering.
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawValue::Text(s) => Some(s.clone()),
            RawValue::Number(n) => Some(n.to_string()),
            RawValue::Bool(b) => Some(b.to_string()),
            RawValue::Absent => None,
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        RawValue::Bool(b)
    }
}

static ABSENT: RawValue = RawValue::Absent;

/// One row of observations: the fields in the order they were read.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Record {
    pub fields: Vec<(String, RawValue)>,
}

impl Record {
    /// The value for a column. Missing fields are absent.
    pub fn get(&self, column: &str) -> &RawValue {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v)
            .unwrap_or(&ABSENT)
    }
}

/// An ordered sequence of records sharing the column names of the first record.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

impl Table {
    /// Builds a table, taking the column names from the first record.
    pub fn from_records(records: Vec<Record>) -> Table {
        let columns: Vec<String> = records
            .first()
            .map(|r| r.fields.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default();
        Table { columns, records }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    /// Checks that a column selection only refers to columns of this table.
    ///
    /// This is the check a user interface performs before running an analysis. It is
    /// stricter than the normalizer, which tolerates an unknown abundance column.
    pub fn validate_selection(&self, selection: &ColumnSelection) -> Result<(), DiversityErrors> {
        let species = selection.species_column.as_str();
        if species.trim().is_empty() {
            return Err(DiversityErrors::Validation(
                "missing species column".to_string(),
            ));
        }
        if !self.has_column(species) {
            return Err(DiversityErrors::Validation(format!(
                "unknown species column '{}'",
                species
            )));
        }
        if let Some(abundance) = selection.abundance() {
            if !self.has_column(abundance) {
                return Err(DiversityErrors::Validation(format!(
                    "unknown abundance column '{}'",
                    abundance
                )));
            }
        }
        Ok(())
    }
}

/// The two columns chosen by the user.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ColumnSelection {
    pub species_column: String,
    pub abundance_column: Option<String>,
}

impl ColumnSelection {
    pub fn new(species_column: &str, abundance_column: Option<&str>) -> ColumnSelection {
        ColumnSelection {
            species_column: species_column.to_string(),
            abundance_column: abundance_column.map(|s| s.to_string()),
        }
    }

    /// The abundance column, if one was chosen. An empty name means presence-only counting.
    pub fn abundance(&self) -> Option<&str> {
        match self.abundance_column.as_deref() {
            Some(s) if !s.trim().is_empty() => Some(s),
            _ => None,
        }
    }
}

// ********* Configuration **********

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct NormalizeRules {
    /// When set, an abundance value that cannot be read as a positive number is an error
    /// instead of being counted as a single individual.
    pub strict_abundance: bool,
}

impl NormalizeRules {
    pub const DEFAULT_RULES: NormalizeRules = NormalizeRules {
        strict_abundance: false,
    };
}

impl Default for NormalizeRules {
    fn default() -> Self {
        NormalizeRules::DEFAULT_RULES
    }
}

// ******** Output data structures *********

/// Accumulated abundance per species.
///
/// Invariant: every label is non-empty, every count is finite and strictly positive, and
/// so is the total.
/// The labels are kept sorted so that all the sums over the map are computed in the same
/// order, which makes the indices reproducible to the bit.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct SpeciesCountMap {
    counts: BTreeMap<String, f64>,
}

impl SpeciesCountMap {
    /// Builds a map from existing counts. Counts for the same species are added up.
    ///
    /// No validation is done here: `compute` rejects maps that break the invariant.
    pub fn from_counts<S: Into<String>, I: IntoIterator<Item = (S, f64)>>(
        counts: I,
    ) -> SpeciesCountMap {
        let mut res = SpeciesCountMap::default();
        for (name, count) in counts {
            res.add(name.into(), count);
        }
        res
    }

    pub(crate) fn add(&mut self, species: String, increment: f64) {
        *self.counts.entry(species).or_insert(0.0) += increment;
    }

    pub fn get(&self, species: &str) -> Option<f64> {
        self.counts.get(species).cloned()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn total(&self) -> f64 {
        self.counts.values().sum()
    }

    /// The share of each species in the total abundance.
    pub fn proportions(&self) -> Vec<(&str, f64)> {
        let total = self.total();
        self.iter().map(|(name, c)| (name, c / total)).collect()
    }

    pub(crate) fn check_invariant(&self) -> Result<(), DiversityErrors> {
        if self.counts.is_empty() {
            return Err(DiversityErrors::InvariantViolation(
                "the species count map is empty".to_string(),
            ));
        }
        for (name, count) in self.counts.iter() {
            if name.trim().is_empty() {
                return Err(DiversityErrors::InvariantViolation(format!(
                    "invalid species label {:?}",
                    name
                )));
            }
            if !count.is_finite() || *count <= 0.0 {
                return Err(DiversityErrors::InvariantViolation(format!(
                    "invalid count {} for species {:?}",
                    count, name
                )));
            }
        }
        if !self.total().is_finite() {
            return Err(DiversityErrors::InvariantViolation(
                "the total abundance is not finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// The diversity statistics of one analysis. Values are kept at full precision.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct DiversityIndices {
    /// Number of distinct species.
    pub richness: usize,
    pub total_individuals: f64,
    /// Shannon index, `-sum(p ln p)`.
    pub shannon: f64,
    /// Simpson's index of diversity, `1 - sum(p^2)`.
    pub simpson_diversity: f64,
}

/// Where a result comes from, carried next to the indices for discussion.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Provenance {
    pub source_name: String,
    pub species_column: String,
    pub abundance_column: Option<String>,
    pub row_count: usize,
}

/// Errors that prevent an analysis from completing.
#[derive(PartialEq, Debug, Clone)]
pub enum DiversityErrors {
    /// The column selection is missing or does not match the table.
    Validation(String),
    /// No row had a usable species value.
    EmptyResult,
    /// The calculator received a map that the normalizer would never produce.
    InvariantViolation(String),
    /// Only raised with strict abundance rules. The row starts at 1.
    InvalidAbundance { row: usize, value: RawValue },
    /// The total abundance no longer fits in a double from this row on.
    AbundanceOverflow { row: usize },
}

impl Error for DiversityErrors {}

impl Display for DiversityErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiversityErrors::Validation(msg) => write!(f, "invalid column selection: {}", msg),
            DiversityErrors::EmptyResult => {
                write!(f, "no valid species data found in the selected column")
            }
            DiversityErrors::InvariantViolation(msg) => {
                write!(f, "invariant violation in diversity_index: {}", msg)
            }
            DiversityErrors::InvalidAbundance { row, value } => {
                write!(f, "row {}: invalid abundance value {:?}", row, value)
            }
            DiversityErrors::AbundanceOverflow { row } => {
                write!(f, "row {}: the total abundance is too large", row)
            }
        }
    }
}
