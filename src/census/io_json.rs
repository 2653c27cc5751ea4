// Tables as JSON: arrays of flat objects, as written by hand or transcribed by a vision model.

use crate::census::*;

pub fn read_json_table(path: &str) -> CensusResult<Table> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    table_from_json(&js, path)
}

/// Reads a file containing the raw answer of a vision model.
pub fn read_ai_table(path: &str) -> CensusResult<Table> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    parse_ai_table(&contents, path)
}

/// Models tend to wrap their JSON in a markdown code block even when told not to.
pub fn clean_ai_response(text: &str) -> String {
    text.replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string()
}

pub fn parse_ai_table(text: &str, name: &str) -> CensusResult<Table> {
    let cleaned = clean_ai_response(text);
    debug!("parse_ai_table: {}", cleaned);
    let js: JSValue = serde_json::from_str(&cleaned).context(ParsingAiJsonSnafu {})?;
    table_from_json(&js, name)
}

fn json_kind(js: &JSValue) -> &'static str {
    match js {
        JSValue::Null => "null",
        JSValue::Bool(_) => "a boolean",
        JSValue::Number(_) => "a number",
        JSValue::String(_) => "a string",
        JSValue::Array(_) => "an array",
        JSValue::Object(_) => "an object",
    }
}

/// Converts an array of objects into a table. The keys of the first object are the columns.
pub fn table_from_json(js: &JSValue, name: &str) -> CensusResult<Table> {
    let rows = match js {
        JSValue::Array(rows) => rows,
        other => {
            return JsonNotArraySnafu {
                found: json_kind(other),
            }
            .fail()
        }
    };
    ensure!(!rows.is_empty(), EmptyTableSnafu { path: name });

    let mut records: Vec<Record> = Vec::new();
    for (idx, row) in rows.iter().enumerate() {
        let obj = row
            .as_object()
            .context(JsonRowNotObjectSnafu { lineno: idx + 1 })?;
        let fields: Vec<(String, RawValue)> = obj
            .iter()
            .map(|(k, v)| (k.clone(), read_value(v)))
            .collect();
        records.push(Record { fields });
    }
    Ok(Table::from_records(records))
}

fn read_value(js: &JSValue) -> RawValue {
    match js {
        JSValue::Null => RawValue::Absent,
        JSValue::Bool(b) => RawValue::Bool(*b),
        JSValue::Number(n) => n.as_f64().map_or(RawValue::Absent, RawValue::Number),
        JSValue::String(s) => RawValue::Text(s.clone()),
        // Nested content is kept as its JSON text.
        other => RawValue::Text(other.to_string()),
    }
}

fn write_value(value: &RawValue) -> Option<JSValue> {
    match value {
        RawValue::Text(s) => Some(json!(s)),
        RawValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(json!(*n as i64)),
        RawValue::Number(n) => Some(json!(n)),
        RawValue::Bool(b) => Some(json!(b)),
        RawValue::Absent => None,
    }
}

/// The table as a pretty-printed JSON array of objects, for download.
///
/// Fields keep their order. Absent fields are left out.
pub fn export_table_json(table: &Table) -> CensusResult<String> {
    let rows: Vec<JSValue> = table
        .records
        .iter()
        .map(|r| {
            let obj: JSMap<String, JSValue> = r
                .fields
                .iter()
                .filter_map(|(k, v)| write_value(v).map(|js| (k.clone(), js)))
                .collect();
            JSValue::Object(obj)
        })
        .collect();
    serde_json::to_string_pretty(&rows).context(ParsingJsonSnafu {})
}
