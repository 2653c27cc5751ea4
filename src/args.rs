use clap::Parser;

/// This is a biodiversity analysis program for tables of species observations.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON file describing the analysis: table sources, columns, rules and outputs.
    /// Paths inside the file are relative to the directory of the file.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,
    /// (file path) A reference file containing the summary of an analysis in JSON format. If provided, biocensus will
    /// check that the computed summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the analysis will be written in JSON format to the given
    /// location. Setting this option overrides the path that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) The table of observations. Setting this option overrides the table sources
    /// of the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (csv, json, ai or xlsx) The type of the input. By default, it is guessed from the file extension.
    /// 'ai' is the text answer of a vision model, a JSON array possibly wrapped in a markdown code block.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (column name) The column containing the species names.
    #[clap(short, long, value_parser)]
    pub species_column: Option<String>,

    /// (column name, optional) The column containing the number of individuals. Without it, every row
    /// counts as one individual.
    #[clap(short, long, value_parser)]
    pub abundance_column: Option<String>,

    /// (default: the only worksheet) When using an Excel file, indicates the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (file path or 'stdout') Where to write the message for the analyst. Defaults to the standard output.
    #[clap(long, value_parser)]
    pub prompt_out: Option<String>,

    /// (file path, optional) Writes the table that was read as a JSON array of objects.
    #[clap(long, value_parser)]
    pub data_out: Option<String>,

    /// (file path, optional) Writes the conversation log, opened with the message for the analyst.
    #[clap(long, value_parser)]
    pub transcript_out: Option<String>,

    /// If passed as an argument, abundance values that are not positive numbers are rejected instead of
    /// being counted as one individual.
    #[clap(long, takes_value = false)]
    pub strict_abundance: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
