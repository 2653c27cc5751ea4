use crate::census::io_common::simplify_file_name;
use crate::census::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputSettings {
    /// JSON summary of the analysis. 'stdout' prints it.
    #[serde(rename = "summaryPath")]
    pub summary_path: Option<String>,
    /// The message for the analyst. Printed on the standard output when missing.
    #[serde(rename = "promptPath")]
    pub prompt_path: Option<String>,
    #[serde(rename = "dataExportPath")]
    pub data_export_path: Option<String>,
    #[serde(rename = "transcriptPath")]
    pub transcript_path: Option<String>,
}

/// The supported kinds of tables.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Provider {
    Csv,
    Json,
    /// The answer of a vision model asked to transcribe a table.
    Ai,
    Xlsx,
}

impl Provider {
    pub fn from_name(name: &str) -> CensusResult<Provider> {
        match name.to_lowercase().as_str() {
            "csv" => Ok(Provider::Csv),
            "json" => Ok(Provider::Json),
            "ai" | "ai_json" => Ok(Provider::Ai),
            "xlsx" | "excel" => Ok(Provider::Xlsx),
            _ => UnknownProviderSnafu { provider: name }.fail(),
        }
    }

    pub fn from_extension(path: &str) -> CensusResult<Provider> {
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(Provider::Csv),
            "json" => Ok(Provider::Json),
            "txt" | "md" => Ok(Provider::Ai),
            "xlsx" => Ok(Provider::Xlsx),
            _ => UnknownProviderSnafu { provider: ext }.fail(),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct TableSource {
    /// csv, json, ai or xlsx. Guessed from the extension of the file when missing.
    pub provider: Option<String>,
    #[serde(rename = "filePath")]
    pub file_path: String,
    /// The name under which the table is presented. Defaults to the file name.
    #[serde(rename = "sourceName")]
    pub source_name: Option<String>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

impl TableSource {
    pub fn from_path(path: &str) -> TableSource {
        TableSource {
            provider: None,
            file_path: path.to_string(),
            source_name: None,
            excel_worksheet_name: None,
        }
    }

    pub fn provider(&self) -> CensusResult<Provider> {
        match self.provider.as_deref() {
            Some(p) if !p.is_empty() => Provider::from_name(p),
            _ => Provider::from_extension(&self.file_path),
        }
    }

    pub fn display_name(&self) -> String {
        match self.source_name.as_deref() {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => simplify_file_name(&self.file_path),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct ColumnSettings {
    #[serde(rename = "speciesColumn", default)]
    pub species_column: String,
    #[serde(rename = "abundanceColumn")]
    pub abundance_column: Option<String>,
}

impl ColumnSettings {
    pub fn selection(&self) -> CensusResult<ColumnSelection> {
        ensure!(
            !self.species_column.trim().is_empty(),
            MissingSpeciesColumnSnafu {}
        );
        Ok(ColumnSelection::new(
            &self.species_column,
            self.abundance_column.as_deref(),
        ))
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnalysisRules {
    #[serde(rename = "strictAbundance")]
    pub strict_abundance: Option<bool>,
}

impl AnalysisRules {
    pub fn normalize_rules(&self) -> NormalizeRules {
        NormalizeRules {
            strict_abundance: self
                .strict_abundance
                .unwrap_or(NormalizeRules::DEFAULT_RULES.strict_abundance),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct CensusConfig {
    #[serde(rename = "outputSettings", default)]
    pub output_settings: OutputSettings,
    #[serde(rename = "tableSources", default)]
    pub table_sources: Vec<TableSource>,
    #[serde(default)]
    pub columns: ColumnSettings,
    #[serde(default)]
    pub rules: AnalysisRules,
}

fn resolve(root: &Path, path: &str) -> String {
    if path == "stdout" || Path::new(path).is_absolute() {
        path.to_string()
    } else {
        let p: PathBuf = [root, Path::new(path)].iter().collect();
        p.as_path().display().to_string()
    }
}

impl CensusConfig {
    /// Makes all the paths relative to the given directory.
    pub fn resolve_paths(&mut self, root: &Path) {
        for source in self.table_sources.iter_mut() {
            source.file_path = resolve(root, &source.file_path);
        }
        let out = &mut self.output_settings;
        for p in [
            &mut out.summary_path,
            &mut out.prompt_path,
            &mut out.data_export_path,
            &mut out.transcript_path,
        ] {
            if let Some(s) = p.as_mut() {
                *s = resolve(root, s);
            }
        }
    }
}

/// Reads a configuration file. The paths it contains are taken relative to its directory.
pub fn read_config(path: &Path) -> CensusResult<CensusConfig> {
    let path_s = path.display().to_string();
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path: &path_s })?;
    let mut config: CensusConfig =
        serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    if let Some(root) = path.parent() {
        config.resolve_paths(root);
    }
    debug!("read_config: {:?}", config);
    Ok(config)
}

pub fn read_summary(path: &str) -> CensusResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}
