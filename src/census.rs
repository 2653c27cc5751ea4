use log::{debug, info, warn};

use diversity_index::*;
use snafu::{prelude::*, Snafu};

use std::fs;

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

pub mod completion;
pub mod config_reader;
mod io_common;
mod io_csv;
mod io_json;
mod io_xlsx;
pub mod session;
pub mod transcript;

use crate::census::completion::CompletionError;
use crate::census::config_reader::*;
use crate::census::session::AnalysisSession;
use crate::census::transcript::Transcript;

#[derive(Debug, Snafu)]
pub enum CensusError {
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("The AI failed to return valid JSON. The table might be unclear."))]
    ParsingAiJson { source: serde_json::Error },
    #[snafu(display("Expected a JSON array of objects, found {found}"))]
    JsonNotArray { found: String },
    #[snafu(display("Row {lineno} is not a JSON object"))]
    JsonRowNotObject { lineno: usize },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error parsing CSV line {lineno}"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Error opening Excel file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("No worksheet found in {path}"))]
    EmptyExcel { path: String },
    #[snafu(display("Worksheet {name} not found in {path}"))]
    MissingWorksheet { name: String, path: String },
    #[snafu(display("Several worksheets in {path}, the worksheet name must be provided"))]
    AmbiguousWorksheet { path: String },
    #[snafu(display("The table {path} is empty or could not be parsed"))]
    EmptyTable { path: String },
    #[snafu(display("Unknown input type {provider:?}"))]
    UnknownProvider { provider: String },
    #[snafu(display("No table source provided"))]
    MissingSource {},
    #[snafu(display("Please select a column containing species names"))]
    MissingSpeciesColumn {},
    #[snafu(display("No table loaded"))]
    NoTableLoaded {},
    #[snafu(display("{source}"))]
    Analysis { source: DiversityErrors },
    #[snafu(display("Error during image analysis: {source}"))]
    Completion { source: CompletionError },
    #[snafu(display("Difference detected between calculated summary and reference summary"))]
    ReferenceMismatch {},

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type CensusResult<T> = Result<T, CensusError>;

/// Reads all the table sources and puts their records together.
///
/// The columns are the ones of the first source. The name of the result lists the names
/// of all the files.
fn read_tables(sources: &[TableSource]) -> CensusResult<(String, Table)> {
    let mut names: Vec<String> = Vec::new();
    let mut res: Option<Table> = None;
    for source in sources {
        info!("Attempting to read table {:?}", source.file_path);
        let table = read_table(source)?;
        info!(
            "Read {} rows, columns: {:?}",
            table.row_count(),
            table.columns
        );
        names.push(source.display_name());
        res = Some(match res {
            None => table,
            Some(mut acc) => {
                if acc.columns != table.columns {
                    warn!(
                        "read_tables: columns of {:?} differ from the first table: {:?}",
                        source.file_path, table.columns
                    );
                }
                acc.records.extend(table.records);
                acc
            }
        });
    }
    let table = res.context(MissingSourceSnafu {})?;
    Ok((names.join(", "), table))
}

fn read_table(source: &TableSource) -> CensusResult<Table> {
    let path = source.file_path.as_str();
    match source.provider()? {
        Provider::Csv => io_csv::read_csv_table(path),
        Provider::Json => io_json::read_json_table(path),
        Provider::Ai => io_json::read_ai_table(path),
        Provider::Xlsx => io_xlsx::read_excel_table(path, source.excel_worksheet_name.as_deref()),
    }
}

/// A count of individuals in JSON: an integer when it is one.
fn count_to_json(x: f64) -> JSValue {
    if x.fract() == 0.0 && x.abs() < 1e15 {
        json!(x as i64)
    } else {
        json!(round4(x))
    }
}

fn build_summary_js(
    provenance: &Provenance,
    rules: &NormalizeRules,
    counts: &SpeciesCountMap,
    indices: &DiversityIndices,
) -> JSValue {
    let mut species: JSMap<String, JSValue> = JSMap::new();
    for (name, count) in counts.iter() {
        species.insert(name.to_string(), count_to_json(count));
    }
    json!({
        "config": {
            "source": provenance.source_name,
            "speciesColumn": provenance.species_column,
            "abundanceColumn": provenance.abundance_column,
            "rowCount": provenance.row_count,
            "strictAbundance": rules.strict_abundance,
        },
        "results": {
            "richness": indices.richness,
            "totalIndividuals": count_to_json(indices.total_individuals),
            "shannon": round4(indices.shannon),
            "simpsonDiversity": round4(indices.simpson_diversity),
            "species": species,
        }
    })
}

fn write_output(path: &str, content: &str) -> CensusResult<()> {
    if path.trim().is_empty() {
        whatever!("Empty output path")
    }
    if path == "stdout" {
        println!("{}", content);
        Ok(())
    } else {
        info!("Writing {}", path);
        fs::write(path, content).context(WritingFileSnafu { path })
    }
}

/// Runs one analysis as described by the configuration and writes all the requested outputs.
///
/// Returns the JSON summary of the analysis.
pub fn run_analysis(
    config: &CensusConfig,
    check_summary_path: Option<String>,
) -> CensusResult<JSValue> {
    info!("config: {:?}", config);
    ensure!(!config.table_sources.is_empty(), MissingSourceSnafu {});

    let (source_name, table) = read_tables(&config.table_sources)?;

    let mut session = AnalysisSession::new(config.rules.normalize_rules());
    session.load_table(&source_name, table);

    if let Some(data_path) = config.output_settings.data_export_path.as_deref() {
        let table = session.table().context(NoTableLoadedSnafu {})?;
        write_output(data_path, &io_json::export_table_json(table)?)?;
    }

    session.select_columns(config.columns.selection()?)?;
    let indices = *session.calculate()?;
    let provenance = session.provenance().context(NoTableLoadedSnafu {})?;
    let counts = session.counts().context(NoTableLoadedSnafu {})?;
    info!(
        "{}: richness {}, individuals {}, Shannon {:.4}, Simpson {:.4}",
        provenance.source_name,
        indices.richness,
        format_count(indices.total_individuals),
        indices.shannon,
        indices.simpson_diversity
    );

    let result_js = build_summary_js(&provenance, &session.rules(), counts, &indices);
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;
    debug!("summary: {}", pretty_js_stats);

    if let Some(summary_path) = config.output_settings.summary_path.as_deref() {
        write_output(summary_path, &pretty_js_stats)?;
    }

    // The hand-off to the conversation.
    let seed = session.hand_off().context(NoTableLoadedSnafu {})?;
    let prompt_path = config
        .output_settings
        .prompt_path
        .clone()
        .unwrap_or_else(|| "stdout".to_string());
    write_output(&prompt_path, &seed)?;

    if let Some(transcript_path) = config.output_settings.transcript_path.as_deref() {
        let mut transcript = Transcript::new();
        transcript.preload(&seed);
        transcript.submit(false);
        write_output(transcript_path, &transcript.render_log())?;
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = check_summary_path {
        let summary_ref = read_summary(&summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference summary {}", summary_p);
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            return ReferenceMismatchSnafu {}.fail();
        }
        info!("The summary matches the reference {}", summary_p);
    }

    Ok(result_js)
}
