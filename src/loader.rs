use std::error::Error;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::height_zone::ZoneAssignment;

/// One line of a floor table file: `floor,elevation[,zone]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloorRow {
    pub floor_number: u32,
    pub elevation: Option<f64>,
    pub zone_number: Option<i64>,
}

/// Load a floor table from a CSV file
///
/// Each line is `floor,elevation` or `floor,elevation,zone`. Blank lines are
/// skipped, and so is the first non-blank line when it does not start with
/// a number (a header). An empty elevation is an unset floor. Rows are
/// returned sorted by floor number, which must run 1..N without gaps.
///
/// # Examples
/// ```no_run
/// use aspenlog::loader::from_csv;
///
/// match from_csv("floors.csv") {
///     Ok(rows) => println!("Loaded {} floors", rows.len()),
///     Err(e) => eprintln!("Error loading CSV: {}", e),
/// }
/// ```
pub fn from_csv(filepath: impl AsRef<Path>) -> Result<Vec<FloorRow>, Box<dyn Error>> {
    let file = File::open(filepath)?;
    let reader = BufReader::new(file);
    let lines: Vec<String> = reader.lines().collect::<Result<_, _>>()?;
    parse_floor_table(&lines.join("\n"))
}

/// Parse floor table text; see [`from_csv`] for the format.
pub fn parse_floor_table(text: &str) -> Result<Vec<FloorRow>, Box<dyn Error>> {
    let mut rows = Vec::new();
    let mut first_line = true;

    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields = parse_csv_row(line);
        let first = fields[0].trim();

        if std::mem::take(&mut first_line) && first.parse::<f64>().is_err() {
            continue; // header
        }

        let floor_number: u32 = first
            .parse()
            .map_err(|_| format!("Invalid floor number '{}' on line {}", first, i + 1))?;

        let elevation = match fields.get(1).map(|f| f.trim()) {
            None | Some("") => None,
            Some(text) => Some(
                text.parse::<f64>()
                    .map_err(|_| format!("Invalid elevation '{}' on line {}", text, i + 1))?,
            ),
        };

        let zone_number = match fields.get(2).map(|f| f.trim()) {
            None | Some("") => None,
            Some(text) => Some(
                text.parse::<i64>()
                    .map_err(|_| format!("Invalid height zone '{}' on line {}", text, i + 1))?,
            ),
        };

        rows.push(FloorRow {
            floor_number,
            elevation,
            zone_number,
        });
    }

    if rows.is_empty() {
        return Err("CSV file has no floors".into());
    }

    rows.sort_by_key(|row| row.floor_number);
    for (i, row) in rows.iter().enumerate() {
        if row.floor_number as usize != i + 1 {
            return Err(format!(
                "Floor numbers must run from 1 to {} without gaps (found {})",
                rows.len(),
                row.floor_number
            )
            .into());
        }
    }

    Ok(rows)
}

/// Zone assignments for every row. Floors without a zone label get their
/// own zone (label = floor number), like the zone table's default; a floor
/// without an elevation is an error.
pub fn zone_assignments(rows: &[FloorRow]) -> Result<Vec<ZoneAssignment>, Box<dyn Error>> {
    rows.iter()
        .map(|row| {
            let elevation = row
                .elevation
                .ok_or_else(|| format!("Floor {} has no elevation", row.floor_number))?;
            Ok(ZoneAssignment {
                floor_number: row.floor_number,
                elevation,
                zone_number: row.zone_number.unwrap_or(row.floor_number as i64),
            })
        })
        .collect()
}

// Parse a CSV row into a vector of strings
fn parse_csv_row(line: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    // Double quote inside quoted field
                    current_field.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                result.push(std::mem::take(&mut current_field));
            }
            _ => current_field.push(c),
        }
    }

    result.push(current_field);
    result
}
