//! The state of one interactive analysis: a loaded table, the columns chosen by the user
//! and the latest result.

use crate::census::*;

/// Holds at most one table and one result.
///
/// Loading a table or changing the selection discards the previous result, so that
/// a result always describes the current table and selection.
#[derive(Debug, Clone)]
pub struct AnalysisSession {
    rules: NormalizeRules,
    source_name: String,
    table: Option<Table>,
    selection: Option<ColumnSelection>,
    counts: Option<SpeciesCountMap>,
    indices: Option<DiversityIndices>,
}

impl AnalysisSession {
    pub fn new(rules: NormalizeRules) -> AnalysisSession {
        AnalysisSession {
            rules,
            source_name: String::new(),
            table: None,
            selection: None,
            counts: None,
            indices: None,
        }
    }

    pub fn load_table(&mut self, source_name: &str, table: Table) {
        info!(
            "load_table: {:?}: {} rows, columns {:?}",
            source_name,
            table.row_count(),
            table.columns
        );
        self.source_name = source_name.to_string();
        self.table = Some(table);
        self.selection = None;
        self.invalidate();
    }

    /// Back to the empty state.
    pub fn reset(&mut self) {
        self.source_name.clear();
        self.table = None;
        self.selection = None;
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.counts = None;
        self.indices = None;
    }

    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    pub fn columns(&self) -> &[String] {
        match &self.table {
            Some(t) => &t.columns,
            None => &[],
        }
    }

    pub fn rules(&self) -> NormalizeRules {
        self.rules
    }

    pub fn select_columns(&mut self, selection: ColumnSelection) -> CensusResult<()> {
        let table = self.table.as_ref().context(NoTableLoadedSnafu {})?;
        table.validate_selection(&selection).context(AnalysisSnafu {})?;
        debug!("select_columns: {:?}", selection);
        self.selection = Some(selection);
        self.invalidate();
        Ok(())
    }

    /// Normalizes the table with the current selection and computes the indices.
    pub fn calculate(&mut self) -> CensusResult<&DiversityIndices> {
        let table = self.table.as_ref().context(NoTableLoadedSnafu {})?;
        let selection = self.selection.as_ref().context(MissingSpeciesColumnSnafu {})?;
        let counts = normalize(table, selection, &self.rules).context(AnalysisSnafu {})?;
        let indices = compute(&counts).context(AnalysisSnafu {})?;
        self.counts = Some(counts);
        Ok(&*self.indices.insert(indices))
    }

    pub fn indices(&self) -> Option<&DiversityIndices> {
        self.indices.as_ref()
    }

    pub fn counts(&self) -> Option<&SpeciesCountMap> {
        self.counts.as_ref()
    }

    /// Describes the data behind the current result.
    pub fn provenance(&self) -> Option<Provenance> {
        self.indices.as_ref()?;
        let table = self.table.as_ref()?;
        let selection = self.selection.as_ref()?;
        // The column that was actually used for the counts.
        let abundance_column = selection
            .abundance()
            .filter(|c| table.has_column(c))
            .map(|c| c.to_string());
        Some(Provenance {
            source_name: self.source_name.clone(),
            species_column: selection.species_column.clone(),
            abundance_column,
            row_count: table.row_count(),
        })
    }

    /// The message that opens a discussion of the current result.
    pub fn hand_off(&self) -> Option<String> {
        let indices = self.indices.as_ref()?;
        let provenance = self.provenance()?;
        Some(to_prompt_text(indices, &provenance))
    }
}
