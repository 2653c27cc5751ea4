mod args;

use std::path::Path;

use clap::Parser;
use log::{info, warn, LevelFilter};
use snafu::ErrorCompat;

use biocensus::census;
use biocensus::census::config_reader::{read_config, CensusConfig, TableSource};
use biocensus::census::CensusResult;

use crate::args::Args;

/// The configuration file, if any, with the command line flags on top.
fn build_config(args: &Args) -> CensusResult<CensusConfig> {
    let mut config = match args.config.as_deref() {
        Some(config_path) => read_config(Path::new(config_path))?,
        None => CensusConfig::default(),
    };

    if let Some(input) = args.input.as_deref() {
        config.table_sources = vec![TableSource {
            provider: args.input_type.clone(),
            file_path: input.to_string(),
            source_name: None,
            excel_worksheet_name: args.excel_worksheet_name.clone(),
        }];
    } else if let Some(ws) = args.excel_worksheet_name.as_deref() {
        for source in config.table_sources.iter_mut() {
            source.excel_worksheet_name = Some(ws.to_string());
        }
    }

    if let Some(species) = args.species_column.as_deref() {
        config.columns.species_column = species.to_string();
    }
    if let Some(abundance) = args.abundance_column.as_deref() {
        config.columns.abundance_column = Some(abundance.to_string());
    }
    if args.strict_abundance {
        config.rules.strict_abundance = Some(true);
    }

    let out = &mut config.output_settings;
    if args.out.is_some() {
        out.summary_path = args.out.clone();
    }
    if args.prompt_out.is_some() {
        out.prompt_path = args.prompt_out.clone();
    }
    if args.data_out.is_some() {
        out.data_export_path = args.data_out.clone();
    }
    if args.transcript_out.is_some() {
        out.transcript_path = args.transcript_out.clone();
    }
    Ok(config)
}

fn main() {
    let args = Args::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if args.verbose {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();
    info!("args: {:?}", args);

    let res = build_config(&args)
        .and_then(|config| census::run_analysis(&config, args.reference.clone()));

    if let Err(e) = res {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured: {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
