// Primitives for reading CSV files.

use std::io::Read;

use diversity_index::builder::Builder;

use crate::census::*;

/// Reads a CSV file whose first row holds the column names.
pub fn read_csv_table(path: &str) -> CensusResult<Table> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    read_records(rdr, path)
}

fn read_records<R: Read>(mut rdr: csv::Reader<R>, path: &str) -> CensusResult<Table> {
    let header: Vec<String> = rdr
        .headers()
        .context(CsvLineParseSnafu { lineno: 1_usize })?
        .iter()
        .map(|s| s.trim().to_string())
        .collect();
    debug!("read_csv: header: {:?}", header);

    let mut builder = Builder::with_columns(header);
    for (idx, line_r) in rdr.records().enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        let cells: Vec<&str> = line.iter().collect();
        // Only empty lines are dropped. A line of separators is a row of empty cells.
        if let [""] = cells.as_slice() {
            debug!("read_csv: line {}: empty, skipping", lineno);
            continue;
        }
        if cells.len() != builder.columns().len() {
            debug!(
                "read_csv: line {}: {} cells for {} columns",
                lineno,
                cells.len(),
                builder.columns().len()
            );
        }
        builder.add_row_simple(&cells);
    }

    ensure!(builder.num_records() > 0, EmptyTableSnafu { path });
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_csv_str(content: &str, name: &str) -> CensusResult<Table> {
        let rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(content.as_bytes());
        read_records(rdr, name)
    }

    #[test]
    fn read_simple() {
        let t = read_csv_str(
            "species,count\nParus major,3\n\n,,\nErithacus rubecula\n\"Turdus merula\",\"1,500\"\n",
            "birds.csv",
        )
        .unwrap();
        assert_eq!(t.columns, vec!["species", "count"]);
        assert_eq!(t.row_count(), 4);
        assert_eq!(t.records[2].get("count"), &RawValue::Absent);
        assert_eq!(
            t.records[3].get("count"),
            &RawValue::Text("1,500".to_string())
        );
    }

    #[test]
    fn separator_rows_are_kept() {
        let t = read_csv_str("species,count\n,\n\nBufo bufo,2\n,,\n", "toads.csv").unwrap();
        assert_eq!(t.row_count(), 3);
        assert_eq!(t.records[0].get("species"), &RawValue::Text(String::new()));
        assert_eq!(t.records[2].get("count"), &RawValue::Text(String::new()));
    }

    #[test]
    fn header_only_is_empty() {
        assert!(matches!(
            read_csv_str("species,count\n", "empty.csv"),
            Err(CensusError::EmptyTable { .. })
        ));
        assert!(matches!(
            read_csv_str("", "empty.csv"),
            Err(CensusError::EmptyTable { .. })
        ));
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            read_csv_table("/nonexistent/biocensus/obs.csv"),
            Err(CensusError::CsvOpen { .. })
        ));
    }
}
