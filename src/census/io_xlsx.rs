// Primitives for reading Excel workbooks.

use calamine::{open_workbook, DataType, Reader, Xlsx};
use diversity_index::builder::Builder;

use crate::census::*;

fn get_range(path: &str, worksheet_name_o: Option<&str>) -> CensusResult<calamine::Range<DataType>> {
    debug!(
        "read_excel_table: path: {:?} worksheet: {:?}",
        path, worksheet_name_o
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet_name) = worksheet_name_o {
        let wrange = workbook
            .worksheet_range(worksheet_name)
            .context(MissingWorksheetSnafu {
                name: worksheet_name,
                path,
            })?
            .context(OpeningExcelSnafu { path })?;
        Ok(wrange)
    } else {
        let all_worksheets = workbook.worksheets();
        match all_worksheets.as_slice() {
            [] => EmptyExcelSnafu { path }.fail(),
            [(worksheet_name, wrange)] => {
                debug!(
                    "read_excel_table: path: {:?} worksheet: {:?}",
                    path, worksheet_name
                );
                Ok(wrange.clone())
            }
            _ => AmbiguousWorksheetSnafu { path }.fail(),
        }
    }
}

/// Reads a worksheet whose first row holds the column names.
pub fn read_excel_table(path: &str, worksheet_name: Option<&str>) -> CensusResult<Table> {
    let wrange = get_range(path, worksheet_name)?;
    let mut rows = wrange.rows();
    let header: Vec<String> = match rows.next() {
        Some(cells) => cells
            .iter()
            .map(|c| {
                read_cell(c)
                    .as_text()
                    .map(|s| s.trim().to_string())
                    .unwrap_or_default()
            })
            .collect(),
        None => return EmptyTableSnafu { path }.fail(),
    };
    debug!("read_excel_table: header: {:?}", header);

    let mut builder = Builder::with_columns(header);
    for (idx, cells) in rows.enumerate() {
        let values: Vec<RawValue> = cells.iter().map(read_cell).collect();
        if values.iter().all(|v| *v == RawValue::Absent) {
            debug!("read_excel_table: row {}: blank, skipping", idx + 2);
            continue;
        }
        builder.add_row(values);
    }

    ensure!(builder.num_records() > 0, EmptyTableSnafu { path });
    Ok(builder.build())
}

pub fn read_cell(cell: &DataType) -> RawValue {
    match cell {
        DataType::String(s) if s.trim().is_empty() => RawValue::Absent,
        DataType::String(s) => RawValue::Text(s.clone()),
        DataType::Float(f) => RawValue::Number(*f),
        DataType::Int(i) => RawValue::Number(*i as f64),
        DataType::Bool(b) => RawValue::Bool(*b),
        // Dates are kept as their serial number.
        DataType::DateTime(f) => RawValue::Number(*f),
        DataType::Empty => RawValue::Absent,
        other => {
            warn!("read_cell: unreadable cell {:?}", other);
            RawValue::Absent
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells() {
        assert_eq!(read_cell(&DataType::Int(12)), RawValue::Number(12.0));
        assert_eq!(read_cell(&DataType::Float(2.5)), RawValue::Number(2.5));
        assert_eq!(
            read_cell(&DataType::String("Parus major".to_string())),
            RawValue::Text("Parus major".to_string())
        );
        assert_eq!(read_cell(&DataType::String("  ".to_string())), RawValue::Absent);
        assert_eq!(read_cell(&DataType::Bool(true)), RawValue::Bool(true));
        assert_eq!(read_cell(&DataType::Empty), RawValue::Absent);
    }

    #[test]
    fn missing_workbook() {
        assert!(matches!(
            read_excel_table("/nonexistent/biocensus/survey.xlsx", None),
            Err(CensusError::OpeningExcel { .. })
        ));
    }
}
