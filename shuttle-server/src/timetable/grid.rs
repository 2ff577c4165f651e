//! Printed-timetable grid parsing.
//!
//! Schedules arrive as text pasted from a printed table: one header line of
//! stop names, then one line per trip, cells separated by tabs or runs of
//! spaces. Cells hold times, blanks, or notes ("Driver Meal Break"). Notes
//! and blanks are dropped per cell; they never abort a row.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::domain::parse_time_token;

/// Header label used for an empty header cell.
const UNNAMED_COLUMN: &str = "Stop";

/// One parsed trip: a minutes-since-midnight value per header column.
pub type TimetableRow = Vec<Option<u32>>;

/// A parsed timetable.
///
/// Every row has exactly `header.len()` cells, and at least one of them is
/// `Some`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimetableGrid {
    pub header: Vec<String>,
    pub rows: Vec<TimetableRow>,
}

impl TimetableGrid {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Split a line into cells on a single tab or a run of two or more
/// whitespace characters.
///
/// Cells are returned untrimmed and empty cells are kept, so cells stay
/// aligned with their columns.
pub fn split_cells(line: &str) -> Vec<&str> {
    let mut cells = Vec::new();
    let mut start = 0;
    let mut chars = line.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c == '\t' {
            cells.push(&line[start..i]);
            start = i + c.len_utf8();
            continue;
        }
        if !c.is_whitespace() {
            continue;
        }

        // A run of whitespace is a separator only when it is at least two long.
        let mut end = i + c.len_utf8();
        let mut run = 1;
        while let Some(&(j, next)) = chars.peek() {
            if !next.is_whitespace() {
                break;
            }
            end = j + next.len_utf8();
            run += 1;
            chars.next();
        }
        if run >= 2 {
            cells.push(&line[start..i]);
            start = end;
        }
    }
    cells.push(&line[start..]);
    cells
}

/// Make header labels unique.
///
/// The n-th repeat of a label (n ≥ 2) becomes `"{label} ({n})"`. Full stops
/// are ignored when comparing, so `"Miller Bldg."` and `"Miller Bldg"`
/// count as the same stop.
///
/// # Examples
///
/// ```
/// use shuttle_server::timetable::dedupe_header;
///
/// let header = dedupe_header(&["PDH", "Commons", "PDH"]);
/// assert_eq!(header, vec!["PDH", "Commons", "PDH (2)"]);
/// ```
pub fn dedupe_header<S: AsRef<str>>(labels: &[S]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    labels
        .iter()
        .map(|label| {
            let label = label.as_ref();
            let base = if label.is_empty() {
                UNNAMED_COLUMN
            } else {
                label
            };
            let key = base.replace('.', "");
            let count = seen.entry(key).or_insert(0);
            *count += 1;
            if *count > 1 {
                format!("{base} ({count})")
            } else {
                base.to_string()
            }
        })
        .collect()
}

/// Parse one data line against the running per-column state.
///
/// `previous` holds the last accepted value of each column and is updated in
/// place for every cell that parses. Returns `None` when no cell parsed.
fn parse_row(cells: &[&str], previous: &mut [Option<u32>]) -> Option<TimetableRow> {
    let mut row = vec![None; previous.len()];
    for (col, cell) in cells.iter().enumerate().take(previous.len()) {
        if let Some(minutes) = parse_time_token(cell, previous[col]) {
            row[col] = Some(minutes);
            previous[col] = Some(minutes);
        }
    }
    row.iter().any(Option::is_some).then_some(row)
}

/// Parse timetable text into a grid.
///
/// The first non-empty line is the header. Each later line is aligned to it
/// by position: extra cells are ignored and missing trailing cells are
/// absent. Each column keeps its own noon-rollover state, and rows where
/// nothing parsed (meal-break banners, notes) are dropped.
pub fn parse_grid(raw: &str) -> TimetableGrid {
    let mut lines = raw
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty());

    let Some(header_line) = lines.next() else {
        return TimetableGrid::default();
    };

    let labels: Vec<&str> = split_cells(header_line)
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    let header = dedupe_header(&labels);

    let mut previous: Vec<Option<u32>> = vec![None; header.len()];
    let rows = lines
        .filter_map(|line| parse_row(&split_cells(line), &mut previous))
        .collect();

    TimetableGrid { header, rows }
}

/// Invert a grid into one ascending time series per header label.
///
/// Every header label is present, even if its column is empty. Duplicates
/// are kept.
pub fn next_times_by_stop(grid: &TimetableGrid) -> BTreeMap<String, Vec<u32>> {
    let mut by_stop: BTreeMap<String, Vec<u32>> = grid
        .header
        .iter()
        .map(|label| (label.clone(), Vec::new()))
        .collect();

    for row in &grid.rows {
        for (label, cell) in grid.header.iter().zip(row) {
            if let (Some(minutes), Some(series)) = (cell, by_stop.get_mut(label)) {
                series.push(*minutes);
            }
        }
    }

    for series in by_stop.values_mut() {
        series.sort_unstable();
    }
    by_stop
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "PDH\tCommons\tCOB\tCovered Bridge\tCOB\tPDH\tCommons\tWFIT\tMiller Bldg.\tDorm Circle\tOlin Quad";

    #[test]
    fn split_on_tabs_keeps_empty_cells() {
        assert_eq!(split_cells("a\t\tb"), vec!["a", "", "b"]);
        assert_eq!(split_cells("\t9:18"), vec!["", "9:18"]);
        assert_eq!(split_cells("a\t"), vec!["a", ""]);
    }

    #[test]
    fn split_on_space_runs() {
        assert_eq!(split_cells("7:41  7:46   7:51"), vec!["7:41", "7:46", "7:51"]);
        // Single spaces stay inside a cell.
        assert_eq!(
            split_cells("Driver Meal Break  12:40"),
            vec!["Driver Meal Break", "12:40"]
        );
        assert_eq!(split_cells("1:08 PM  1:20"), vec!["1:08 PM", "1:20"]);
    }

    #[test]
    fn split_space_run_swallows_tabs() {
        assert_eq!(split_cells("a \tb"), vec!["a", "b"]);
        assert_eq!(split_cells("a\t b"), vec!["a", " b"]);
    }

    #[test]
    fn dedupe_repeated_labels() {
        assert_eq!(
            dedupe_header(&["PDH", "Commons", "PDH"]),
            vec!["PDH", "Commons", "PDH (2)"]
        );
        assert_eq!(
            dedupe_header(&["A", "A", "A"]),
            vec!["A", "A (2)", "A (3)"]
        );
    }

    #[test]
    fn dedupe_ignores_full_stops() {
        assert_eq!(
            dedupe_header(&["Miller Bldg.", "Miller Bldg"]),
            vec!["Miller Bldg.", "Miller Bldg (2)"]
        );
    }

    #[test]
    fn dedupe_names_empty_labels() {
        assert_eq!(dedupe_header(&["", ""]), vec!["Stop", "Stop (2)"]);
    }

    #[test]
    fn empty_input() {
        assert_eq!(parse_grid(""), TimetableGrid::default());
        assert_eq!(parse_grid("\n\r\n"), TimetableGrid::default());
    }

    #[test]
    fn header_only() {
        let grid = parse_grid("PDH\tCommons\n");
        assert_eq!(grid.header, vec!["PDH", "Commons"]);
        assert!(grid.is_empty());
    }

    #[test]
    fn header_is_deduplicated() {
        let grid = parse_grid(HEADER);
        assert_eq!(grid.header.len(), 11);
        assert_eq!(grid.header[4], "COB (2)");
        assert_eq!(grid.header[5], "PDH (2)");
        assert_eq!(grid.header[6], "Commons (2)");
    }

    #[test]
    fn rows_align_positionally() {
        let raw = format!("{HEADER}\n\t\t9:18\t9:21\t9:24\t9:29\t9:34\t9:39\t9:41\t9:42\t9:45\n");
        let grid = parse_grid(&raw);
        assert_eq!(grid.rows.len(), 1);
        let row = &grid.rows[0];
        assert_eq!(row.len(), 11);
        assert_eq!(row[0], None);
        assert_eq!(row[1], None);
        assert_eq!(row[2], Some(558));
        assert_eq!(row[10], Some(585));
    }

    #[test]
    fn extra_and_missing_columns() {
        let grid = parse_grid("A\tB\n1:00\t2:00\t3:00\n4:00\n");
        assert_eq!(grid.rows, vec![vec![Some(60), Some(120)], vec![Some(240), None]]);
    }

    #[test]
    fn meal_break_row_is_dropped() {
        let raw = "A\tB\n11:40\t11:45\nDriver Meal Break\tDriver Meal Break\n11:51\t11:56\n";
        let grid = parse_grid(raw);
        assert_eq!(
            grid.rows,
            vec![vec![Some(700), Some(705)], vec![Some(711), Some(716)]]
        );
    }

    #[test]
    fn meal_break_does_not_disturb_rollover() {
        let raw = "A\tB\n12:46\t12:51\nDriver Meal Break\n1:03\t1:08\n";
        let grid = parse_grid(raw);
        assert_eq!(grid.rows.len(), 2);
        assert_eq!(grid.rows[1], vec![Some(783), Some(788)]);
    }

    #[test]
    fn notes_are_dropped_per_cell() {
        let raw = format!(
            "{HEADER}\n10:43\t10:48\t10:53\t10:56\t10:59\t11:04\t11:09\tDriver Meal Break\n"
        );
        let grid = parse_grid(&raw);
        let row = &grid.rows[0];
        assert_eq!(row[6], Some(669));
        assert_eq!(row[7], None);
        assert_eq!(row[10], None);
    }

    #[test]
    fn rollover_is_per_column() {
        // Column A crosses noon, column B only ever has morning times.
        let raw = "A\tB\n12:50\t\n1:05\t9:00\n";
        let grid = parse_grid(raw);
        assert_eq!(grid.rows[1], vec![Some(785), Some(540)]);
    }

    #[test]
    fn crlf_lines() {
        let grid = parse_grid("A\tB\r\n7:41\t7:46\r\n");
        assert_eq!(grid.rows, vec![vec![Some(461), Some(466)]]);
    }

    #[test]
    fn series_sorted_per_label() {
        let grid = TimetableGrid {
            header: vec!["A".into(), "B".into()],
            rows: vec![
                vec![Some(600), None],
                vec![Some(540), Some(700)],
                vec![Some(540), None],
            ],
        };
        let series = next_times_by_stop(&grid);
        assert_eq!(series["A"], vec![540, 540, 600]);
        assert_eq!(series["B"], vec![700]);
    }

    #[test]
    fn series_keeps_empty_columns() {
        let grid = parse_grid("A\tB\n7:00\n");
        let series = next_times_by_stop(&grid);
        assert_eq!(series["A"], vec![420]);
        assert!(series["B"].is_empty());
    }
}
