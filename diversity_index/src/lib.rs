/*!

Species-abundance normalization and biodiversity indices.

The analysis of a table of observations goes through three steps:

1. [`normalize`] reduces a schema-less [`Table`] to a [`SpeciesCountMap`], using a
   species column and an optional abundance column.
2. [`compute`] derives the [`DiversityIndices`] from the counts: richness, total
   number of individuals, Shannon index and Simpson's index of diversity.
3. [`to_prompt_text`] writes the result as the opening message of a conversation with
   an assistant.

```
use diversity_index::*;

let mut builder = builder::Builder::new(&["sp", "n"]);
builder.add_row_simple(&["A", "3"]);
builder.add_row_simple(&["A", "2"]);
builder.add_row_simple(&["B", "5"]);
builder.add_row_simple(&["", "1"]);
let table = builder.build();

let selection = ColumnSelection::new("sp", Some("n"));
let counts = normalize(&table, &selection, &NormalizeRules::DEFAULT_RULES)?;
let indices = compute(&counts)?;
assert_eq!(indices.richness, 2);
assert_eq!(indices.total_individuals, 10.0);
assert!((indices.simpson_diversity - 0.5).abs() < 1e-12);
# Ok::<(), DiversityErrors>(())
```

## Missing data

The policy favours keeping observations:
- a row without a species name is skipped (an empty cell, `0` as a number, or `false`),
- without an abundance column, every row counts as one individual,
- an abundance value that is not a positive number counts as one individual. Thousands
  separators (`1,200`) are accepted. [`NormalizeRules::strict_abundance`] turns these
  values into errors instead.

Abundances whose total does not fit in a double are always an error.

*/
mod config;
pub mod builder;

use log::{debug, info, warn};

pub use crate::config::*;

/// Reduces a table to the total abundance of each species.
///
/// Arguments:
/// * `table` the observations. It is not modified, a failed call can be retried with
/// another selection.
/// * `selection` the species column (mandatory) and the abundance column (optional)
/// * `rules` the policy for malformed abundance values
pub fn normalize(
    table: &Table,
    selection: &ColumnSelection,
    rules: &NormalizeRules,
) -> Result<SpeciesCountMap, DiversityErrors> {
    let species_column = selection.species_column.as_str();
    if species_column.trim().is_empty() {
        return Err(DiversityErrors::Validation(
            "missing species column".to_string(),
        ));
    }
    if !table.has_column(species_column) {
        return Err(DiversityErrors::Validation(format!(
            "unknown species column '{}'",
            species_column
        )));
    }

    let abundance_column: Option<&str> = match selection.abundance() {
        Some(col) if table.has_column(col) => Some(col),
        Some(col) if rules.strict_abundance => {
            return Err(DiversityErrors::Validation(format!(
                "unknown abundance column '{}'",
                col
            )));
        }
        Some(col) => {
            warn!(
                "normalize: abundance column {:?} not in table, counting one individual per row",
                col
            );
            None
        }
        None => None,
    };

    info!(
        "normalize: {} records, species column: {:?}, abundance column: {:?}",
        table.row_count(),
        species_column,
        abundance_column
    );

    let mut counts = SpeciesCountMap::default();
    let mut total: f64 = 0.0;
    let mut skipped: usize = 0;
    for (idx, record) in table.records.iter().enumerate() {
        let species = match species_label(record.get(species_column)) {
            Some(s) => s,
            None => {
                debug!("normalize: row {}: no species, skipping", idx + 1);
                skipped += 1;
                continue;
            }
        };

        let increment = match abundance_column {
            None => 1.0,
            Some(col) => {
                let raw = record.get(col);
                match parse_abundance(raw) {
                    Some(x) => x,
                    None if rules.strict_abundance => {
                        return Err(DiversityErrors::InvalidAbundance {
                            row: idx + 1,
                            value: raw.clone(),
                        });
                    }
                    None => {
                        debug!(
                            "normalize: row {}: abundance {:?} is not a positive number, counting 1",
                            idx + 1,
                            raw
                        );
                        1.0
                    }
                }
            }
        };

        total += increment;
        if !total.is_finite() {
            return Err(DiversityErrors::AbundanceOverflow { row: idx + 1 });
        }
        counts.add(species, increment);
    }

    debug!(
        "normalize: {} species, {} rows skipped",
        counts.len(),
        skipped
    );

    if counts.is_empty() {
        return Err(DiversityErrors::EmptyResult);
    }
    // The map sums in label order, which may round differently from row order.
    if !counts.total().is_finite() {
        return Err(DiversityErrors::AbundanceOverflow {
            row: table.row_count(),
        });
    }
    Ok(counts)
}

/// The trimmed species name of a cell, if there is one.
///
/// Zero, NaN and `false` are not names.
fn species_label(value: &RawValue) -> Option<String> {
    match value {
        RawValue::Number(n) if *n == 0.0 || n.is_nan() => return None,
        RawValue::Bool(false) => return None,
        _ => {}
    }
    let s = value.as_text()?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Reads an abundance value.
///
/// Returns the value only if it is a finite, strictly positive number. Commas are
/// dropped before parsing (`"1,200"` is 1200) and trailing text after the number is
/// ignored (`"12 birds"` is 12).
pub fn parse_abundance(value: &RawValue) -> Option<f64> {
    let x = match value {
        RawValue::Number(n) => *n,
        RawValue::Text(s) => {
            let cleaned: String = s.chars().filter(|c| *c != ',').collect();
            parse_leading_float(&cleaned)?
        }
        RawValue::Bool(_) | RawValue::Absent => return None,
    };
    if x.is_finite() && x > 0.0 {
        Some(x)
    } else {
        None
    }
}

/// Parses the longest prefix of the string (after leading whitespace) that is a
/// decimal floating-point number: optional sign, digits, optional fraction and
/// optional exponent.
pub fn parse_leading_float(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut num_digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        num_digits += frac_end - frac_start;
        // A lone dot is not part of the number.
        if num_digits > 0 {
            end = frac_end;
        }
    }
    if num_digits == 0 {
        return None;
    }
    // The exponent only counts if it has digits.
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }
    s[..end].parse::<f64>().ok()
}

/// Computes the diversity indices of a community.
///
/// The map must come from [`normalize`] or at least respect its invariant: not empty,
/// all the counts finite and positive. Anything else is reported as
/// [`DiversityErrors::InvariantViolation`].
pub fn compute(counts: &SpeciesCountMap) -> Result<DiversityIndices, DiversityErrors> {
    counts.check_invariant()?;

    let total_individuals = counts.total();
    let richness = counts.len();

    let mut shannon: f64 = 0.0;
    let mut concentration: f64 = 0.0;
    for (_, p) in counts.proportions() {
        if p > 0.0 {
            shannon -= p * p.ln();
        }
        concentration += p * p;
    }

    let res = DiversityIndices {
        richness,
        total_individuals,
        shannon,
        simpson_diversity: 1.0 - concentration,
    };
    debug!("compute: {:?}", res);
    Ok(res)
}

/// Writes a result as the first message of a conversation with the analyst.
///
/// This is where the numbers get rounded: Shannon and Simpson use 4 decimal places.
pub fn to_prompt_text(indices: &DiversityIndices, provenance: &Provenance) -> String {
    let abundance = match provenance.abundance_column.as_deref() {
        Some(col) if !col.trim().is_empty() => format!("'{}'", col),
        _ => "None (used row count)".to_string(),
    };
    let mut summary = format!(
        "Hello! I just analyzed my dataset ({}) and calculated these biodiversity indices. Can you help me interpret them?\n\n",
        provenance.source_name
    );
    summary += "--- Calculated Indices ---\n";
    summary += &format!("Species Richness (S): {}\n", indices.richness);
    summary += &format!(
        "Total Individuals (N): {}\n",
        format_count(indices.total_individuals)
    );
    summary += &format!("Shannon Index (H'): {:.4}\n", indices.shannon);
    summary += &format!("Simpson's Index (1-D): {:.4}\n\n", indices.simpson_diversity);
    summary += "--- Data Context ---\n";
    summary += &format!("Species Column: '{}'\n", provenance.species_column);
    summary += &format!("Abundance Column: {}\n", abundance);
    summary += &format!("Total Rows Analyzed: {}\n", provenance.row_count);
    summary
}

/// Rounds a value to 4 decimal places, for display.
pub fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Counts of individuals are whole numbers most of the time; show them without decimals.
pub fn format_count(x: f64) -> String {
    if x.fract() == 0.0 && x.abs() < 1e15 {
        format!("{}", x as i64)
    } else {
        format!("{:.4}", x)
    }
}

#[cfg(test)]
mod tests {
    use super::builder::Builder;
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        let mut b = Builder::new(columns);
        for row in rows {
            b.add_row_simple(row);
        }
        b.build()
    }

    fn assert_close(x: f64, y: f64) {
        assert!((x - y).abs() < 1e-4, "{} != {}", x, y);
    }

    #[test]
    fn abundance_scenario() {
        init();
        let t = table(
            &["sp", "n"],
            &[&["A", "3"], &["A", "2"], &["B", "5"], &["", "1"]],
        );
        let counts = normalize(
            &t,
            &ColumnSelection::new("sp", Some("n")),
            &NormalizeRules::DEFAULT_RULES,
        )
        .unwrap();
        assert_eq!(counts, SpeciesCountMap::from_counts([("A", 5.0), ("B", 5.0)]));
        let idx = compute(&counts).unwrap();
        assert_eq!(idx.richness, 2);
        assert_eq!(idx.total_individuals, 10.0);
        assert_close(idx.shannon, 0.6931);
        assert_close(idx.simpson_diversity, 0.5);
    }

    #[test]
    fn presence_only_scenario() {
        init();
        let mut b = Builder::new(&["sp"]);
        b.add_record(&[("sp", "A".into())]);
        b.add_record(&[("sp", "A".into())]);
        b.add_record(&[("sp", "B".into())]);
        let t = b.build();
        let counts = normalize(
            &t,
            &ColumnSelection::new("sp", None),
            &NormalizeRules::DEFAULT_RULES,
        )
        .unwrap();
        assert_eq!(counts.get("A"), Some(2.0));
        assert_eq!(counts.get("B"), Some(1.0));
        let idx = compute(&counts).unwrap();
        assert_eq!(idx.richness, 2);
        assert_eq!(idx.total_individuals, 3.0);
        assert_close(idx.shannon, 0.6365);
        assert_close(idx.simpson_diversity, 0.4444);
    }

    #[test]
    fn empty_map_is_invariant_violation() {
        let res = compute(&SpeciesCountMap::default());
        assert!(matches!(res, Err(DiversityErrors::InvariantViolation(_))));
    }

    #[test]
    fn malformed_map_is_invariant_violation() {
        for counts in [
            SpeciesCountMap::from_counts([("A", 0.0)]),
            SpeciesCountMap::from_counts([("A", -2.0), ("B", 1.0)]),
            SpeciesCountMap::from_counts([("A", f64::NAN)]),
            SpeciesCountMap::from_counts([(" ", 1.0)]),
        ] {
            assert!(matches!(
                compute(&counts),
                Err(DiversityErrors::InvariantViolation(_))
            ));
        }
    }

    #[test]
    fn malformed_abundance_counts_one() {
        let t = table(&["sp", "n"], &[&["A", "abc"], &["A", "4"], &["B", "0"]]);
        let counts = normalize(
            &t,
            &ColumnSelection::new("sp", Some("n")),
            &NormalizeRules::DEFAULT_RULES,
        )
        .unwrap();
        assert_eq!(counts.get("A"), Some(5.0));
        // Zero is treated like any other invalid value.
        assert_eq!(counts.get("B"), Some(1.0));
    }

    #[test]
    fn abundance_parsing() {
        assert_eq!(parse_abundance(&"1,200".into()), Some(1200.0));
        assert_eq!(parse_abundance(&" 12 birds".into()), Some(12.0));
        assert_eq!(parse_abundance(&"2.5".into()), Some(2.5));
        assert_eq!(parse_abundance(&".5".into()), Some(0.5));
        assert_eq!(parse_abundance(&"1e2x".into()), Some(100.0));
        assert_eq!(parse_abundance(&"3e".into()), Some(3.0));
        assert_eq!(parse_abundance(&RawValue::Number(7.0)), Some(7.0));
        assert_eq!(parse_abundance(&"-3".into()), None);
        assert_eq!(parse_abundance(&".".into()), None);
        assert_eq!(parse_abundance(&"".into()), None);
        assert_eq!(parse_abundance(&"Infinity".into()), None);
        assert_eq!(parse_abundance(&RawValue::Number(f64::INFINITY)), None);
        assert_eq!(parse_abundance(&RawValue::Bool(true)), None);
        assert_eq!(parse_abundance(&RawValue::Absent), None);
    }

    #[test]
    fn missing_species_rows_are_excluded() {
        let with_blank = table(
            &["sp", "n"],
            &[&["A", "2"], &["  ", "10"], &["B", "1"], &["", "4"]],
        );
        let mut b = Builder::new(&["sp", "n"]);
        b.add_row_simple(&["A", "2"]);
        b.add_record(&[("n", "7".into())]);
        b.add_row_simple(&["B", "1"]);
        let with_absent = b.build();
        let sel = ColumnSelection::new("sp", Some("n"));
        let r1 = compute(&normalize(&with_blank, &sel, &NormalizeRules::DEFAULT_RULES).unwrap())
            .unwrap();
        let r2 = compute(&normalize(&with_absent, &sel, &NormalizeRules::DEFAULT_RULES).unwrap())
            .unwrap();
        assert_eq!(r1.richness, 2);
        assert_eq!(r1.total_individuals, 3.0);
        assert_eq!(r1, r2);
    }

    #[test]
    fn species_labels_are_trimmed_and_case_sensitive() {
        let t = table(&["sp"], &[&[" Quercus robur "], &["Quercus robur"], &["quercus robur"]]);
        let counts = normalize(
            &t,
            &ColumnSelection::new("sp", None),
            &NormalizeRules::DEFAULT_RULES,
        )
        .unwrap();
        assert_eq!(counts.get("Quercus robur"), Some(2.0));
        assert_eq!(counts.get("quercus robur"), Some(1.0));
    }

    #[test]
    fn numeric_species_values() {
        let mut b = Builder::new(&["plot", "count"]);
        b.add_record(&[("plot", RawValue::Number(3.0)), ("count", RawValue::Number(2.0))]);
        b.add_record(&[("plot", "3".into()), ("count", RawValue::Absent)]);
        let counts = normalize(
            &b.build(),
            &ColumnSelection::new("plot", Some("count")),
            &NormalizeRules::DEFAULT_RULES,
        )
        .unwrap();
        assert_eq!(counts.get("3"), Some(3.0));
    }

    #[test]
    fn unknown_abundance_column_is_presence_only() {
        let t = table(&["sp", "n"], &[&["A", "3"], &["B", "5"]]);
        let counts = normalize(
            &t,
            &ColumnSelection::new("sp", Some("count")),
            &NormalizeRules::DEFAULT_RULES,
        )
        .unwrap();
        assert_eq!(counts.total(), 2.0);
        let empty_name = normalize(
            &t,
            &ColumnSelection::new("sp", Some("")),
            &NormalizeRules::DEFAULT_RULES,
        )
        .unwrap();
        assert_eq!(empty_name, counts);
    }

    #[test]
    fn selection_errors() {
        let t = table(&["sp", "n"], &[&["A", "3"]]);
        let rules = NormalizeRules::DEFAULT_RULES;
        assert_eq!(
            normalize(&t, &ColumnSelection::new("", None), &rules),
            Err(DiversityErrors::Validation(
                "missing species column".to_string()
            ))
        );
        assert!(matches!(
            normalize(&t, &ColumnSelection::new("species", None), &rules),
            Err(DiversityErrors::Validation(_))
        ));
        assert!(t
            .validate_selection(&ColumnSelection::new("sp", Some("count")))
            .is_err());
        assert!(t
            .validate_selection(&ColumnSelection::new("sp", Some("n")))
            .is_ok());
        assert!(t.validate_selection(&ColumnSelection::new("sp", None)).is_ok());
    }

    #[test]
    fn no_usable_species_is_empty_result() {
        let t = table(&["sp", "n"], &[&["", "3"], &[" ", "2"]]);
        assert_eq!(
            normalize(
                &t,
                &ColumnSelection::new("sp", Some("n")),
                &NormalizeRules::DEFAULT_RULES
            ),
            Err(DiversityErrors::EmptyResult)
        );
    }

    #[test]
    fn strict_abundance() {
        let strict = NormalizeRules {
            strict_abundance: true,
        };
        let t = table(&["sp", "n"], &[&["A", "3"], &["", "x"], &["B", "abc"]]);
        assert_eq!(
            normalize(&t, &ColumnSelection::new("sp", Some("n")), &strict),
            Err(DiversityErrors::InvalidAbundance {
                row: 3,
                value: "abc".into()
            })
        );
        assert!(matches!(
            normalize(&t, &ColumnSelection::new("sp", Some("count")), &strict),
            Err(DiversityErrors::Validation(_))
        ));
        let ok = table(&["sp", "n"], &[&["A", "3"], &["B", "1,000"]]);
        let counts = normalize(&ok, &ColumnSelection::new("sp", Some("n")), &strict).unwrap();
        assert_eq!(counts.get("B"), Some(1000.0));
    }

    #[test]
    fn index_properties() {
        let communities = [
            SpeciesCountMap::from_counts([("A", 1.0)]),
            SpeciesCountMap::from_counts([("A", 3.0), ("B", 1.5), ("C", 0.25)]),
            SpeciesCountMap::from_counts([("A", 1000.0), ("B", 1.0)]),
            SpeciesCountMap::from_counts((0..17).map(|i| (format!("sp{}", i), 1.0 + i as f64))),
        ];
        for counts in communities.iter() {
            let idx = compute(counts).unwrap();
            assert_eq!(idx.richness, counts.len());
            assert_eq!(idx.total_individuals, counts.iter().map(|(_, c)| c).sum::<f64>());
            let total_p: f64 = counts.proportions().iter().map(|(_, p)| p).sum();
            assert!((total_p - 1.0).abs() < 1e-9);
            assert!(idx.shannon >= 0.0);
            assert_eq!(idx.shannon == 0.0, idx.richness == 1);
            assert!(idx.simpson_diversity >= 0.0 && idx.simpson_diversity < 1.0);
        }
    }

    #[test]
    fn simpson_limits() {
        let dominated = compute(&SpeciesCountMap::from_counts([("A", 1e9), ("B", 1.0)])).unwrap();
        assert!(dominated.simpson_diversity < 1e-8);
        let even = compute(&SpeciesCountMap::from_counts(
            (0..5).map(|i| (format!("sp{}", i), 4.0)),
        ))
        .unwrap();
        assert!((even.simpson_diversity - (1.0 - 1.0 / 5.0)).abs() < 1e-12);
        assert!((even.shannon - 5.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let t = table(
            &["sp", "n"],
            &[&["C", "0.1"], &["A", "0.2"], &["B", "0.3"], &["A", "1.7"], &["D", "x"]],
        );
        let sel = ColumnSelection::new("sp", Some("n"));
        let r1 = compute(&normalize(&t, &sel, &NormalizeRules::DEFAULT_RULES).unwrap()).unwrap();
        let r2 = compute(&normalize(&t, &sel, &NormalizeRules::DEFAULT_RULES).unwrap()).unwrap();
        assert_eq!(r1.shannon.to_bits(), r2.shannon.to_bits());
        assert_eq!(r1.simpson_diversity.to_bits(), r2.simpson_diversity.to_bits());
        assert_eq!(r1.total_individuals.to_bits(), r2.total_individuals.to_bits());
    }

    #[test]
    fn prompt_text() {
        let idx = DiversityIndices {
            richness: 2,
            total_individuals: 10.0,
            shannon: std::f64::consts::LN_2,
            simpson_diversity: 0.5,
        };
        let prov = Provenance {
            source_name: "pond.csv".to_string(),
            species_column: "sp".to_string(),
            abundance_column: Some("n".to_string()),
            row_count: 4,
        };
        let expected = "Hello! I just analyzed my dataset (pond.csv) and calculated these biodiversity indices. Can you help me interpret them?

--- Calculated Indices ---
Species Richness (S): 2
Total Individuals (N): 10
Shannon Index (H'): 0.6931
Simpson's Index (1-D): 0.5000

--- Data Context ---
Species Column: 'sp'
Abundance Column: 'n'
Total Rows Analyzed: 4
";
        assert_eq!(to_prompt_text(&idx, &prov), expected);

        let presence = Provenance {
            abundance_column: None,
            ..prov
        };
        let text = to_prompt_text(
            &DiversityIndices {
                total_individuals: 12.5,
                ..idx
            },
            &presence,
        );
        assert!(text.contains("Abundance Column: None (used row count)\n"));
        assert!(text.contains("Total Individuals (N): 12.5000\n"));
    }

    #[test]
    fn huge_abundances_overflow() {
        let t = table(
            &["sp", "n"],
            &[&["A", "1e308"], &["B", "1e308"], &["A", "1e308"]],
        );
        assert_eq!(
            normalize(
                &t,
                &ColumnSelection::new("sp", Some("n")),
                &NormalizeRules::DEFAULT_RULES
            ),
            Err(DiversityErrors::AbundanceOverflow { row: 2 })
        );
        // A map built by hand with an infinite total is a caller error.
        assert!(matches!(
            compute(&SpeciesCountMap::from_counts([("A", 1e308), ("B", 1e308)])),
            Err(DiversityErrors::InvariantViolation(_))
        ));
        let big = compute(&SpeciesCountMap::from_counts([("A", 1e307), ("B", 1e307)])).unwrap();
        assert!((big.shannon - std::f64::consts::LN_2).abs() < 1e-12);
        assert!((big.simpson_diversity - 0.5).abs() < 1e-12);
    }

    #[test]
    fn falsy_species_values_are_skipped() {
        let mut b = Builder::new(&["sp"]);
        b.add_record(&[("sp", RawValue::Number(0.0))]);
        b.add_record(&[("sp", RawValue::Number(f64::NAN))]);
        b.add_record(&[("sp", RawValue::Bool(false))]);
        b.add_record(&[("sp", RawValue::Bool(true))]);
        b.add_record(&[("sp", "0".into())]);
        let counts = normalize(
            &b.build(),
            &ColumnSelection::new("sp", None),
            &NormalizeRules::DEFAULT_RULES,
        )
        .unwrap();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts.get("true"), Some(1.0));
        assert_eq!(counts.get("0"), Some(1.0));
    }

    #[test]
    fn rounding() {
        assert_eq!(round4(0.636514), 0.6365);
        assert_eq!(round4(0.44444444), 0.4444);
        assert_eq!(format_count(3.0), "3");
        assert_eq!(format_count(2.25), "2.2500");
    }
}
