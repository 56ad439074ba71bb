//! # Table Geometry
//!
//! Persisted table geometry lives in two places: every cell carries the
//! widths of the columns it spans (`colwidth`), and the table carries an
//! optional `tableHeight`. Table width is never stored; it is the sum of
//! the column widths.
//!
//! Resizes are measured against the rendered layout, then written back in
//! a single transaction so the persisted widths always match what the user
//! saw when they let go of the pointer.

use crate::config::EditorConfig;
use crate::layout::Layout;
use crate::manipulation::Size;
use crate::mutations::Mutation;
use crate::transaction::{Origin, Transaction};
use crate::EditorError;
use lectern_parser::schema::TABLE_BORDER_STYLES;
use lectern_parser::{AttrValue, NodeId, NodeKind, Tree};

/// A cell placed on the table grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellPosition {
    pub cell: NodeId,
    pub row: usize,
    pub col: usize,
    pub colspan: usize,
    pub rowspan: usize,
}

/// Grid occupancy of a table, spans resolved
#[derive(Debug, Clone, Default)]
pub struct TableMap {
    width: usize,
    height: usize,
    cells: Vec<CellPosition>,
}

impl TableMap {
    /// Row spans stop at the last row the table actually has
    pub fn build(tree: &Tree, table: NodeId) -> Self {
        let rows = tree.children(table);
        let mut occupied: Vec<Vec<bool>> = Vec::new();
        let mut cells = Vec::new();

        for (row, row_id) in rows.iter().enumerate() {
            let mut col = 0;
            for cell in tree.children(*row_id) {
                let colspan = span(tree, *cell, "colspan");
                let rowspan = span(tree, *cell, "rowspan").min(rows.len() - row);

                while is_occupied(&occupied, row, col) {
                    col += 1;
                }
                for r in row..row + rowspan {
                    if occupied.len() <= r {
                        occupied.resize_with(r + 1, Vec::new);
                    }
                    let line = &mut occupied[r];
                    if line.len() < col + colspan {
                        line.resize(col + colspan, false);
                    }
                    for slot in &mut line[col..col + colspan] {
                        *slot = true;
                    }
                }

                cells.push(CellPosition {
                    cell: *cell,
                    row,
                    col,
                    colspan,
                    rowspan,
                });
                col += colspan;
            }
        }

        let width = occupied.iter().map(Vec::len).max().unwrap_or(0);
        let height = rows.len();
        Self {
            width,
            height,
            cells,
        }
    }

    /// Number of columns
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cells(&self) -> &[CellPosition] {
        &self.cells
    }

    pub fn first_row(&self) -> impl Iterator<Item = &CellPosition> {
        self.cells.iter().filter(|cell| cell.row == 0)
    }

    pub fn position(&self, cell: NodeId) -> Option<&CellPosition> {
        self.cells.iter().find(|position| position.cell == cell)
    }
}

fn span(tree: &Tree, cell: NodeId, name: &str) -> usize {
    tree.attr(cell, name).as_int().unwrap_or(1).max(1) as usize
}

fn is_occupied(grid: &[Vec<bool>], row: usize, col: usize) -> bool {
    grid.get(row)
        .and_then(|line| line.get(col))
        .copied()
        .unwrap_or(false)
}

/// Persisted width of every column. The first cell (in row order) whose
/// `colwidth` covers a column decides it; unknown columns take the default.
pub fn column_widths(tree: &Tree, table: NodeId, config: &EditorConfig) -> Vec<u32> {
    let map = TableMap::build(tree, table);
    let mut widths: Vec<Option<u32>> = vec![None; map.width()];

    for position in map.cells() {
        let Some(stored) = tree.attr(position.cell, "colwidth").as_widths() else {
            continue;
        };
        if stored.len() != position.colspan {
            continue;
        }
        for (i, width) in stored.iter().enumerate() {
            let slot = &mut widths[position.col + i];
            if slot.is_none() && *width > 0 {
                *slot = Some(*width);
            }
        }
    }

    widths
        .into_iter()
        .map(|width| width.unwrap_or(config.default_column_width))
        .collect()
}

pub fn table_width(tree: &Tree, table: NodeId, config: &EditorConfig) -> u32 {
    column_widths(tree, table, config).iter().sum()
}

pub fn row_count(tree: &Tree, table: NodeId) -> usize {
    TableMap::build(tree, table).height()
}

pub fn column_count(tree: &Tree, table: NodeId) -> usize {
    TableMap::build(tree, table).width()
}

/// Mutations that store `widths` on every cell of the table
pub fn write_column_widths(tree: &Tree, table: NodeId, widths: &[u32]) -> Vec<Mutation> {
    TableMap::build(tree, table)
        .cells()
        .iter()
        .filter_map(|position| {
            let end = (position.col + position.colspan).min(widths.len());
            let slice = widths.get(position.col..end)?.to_vec();
            let value = AttrValue::Widths(slice);
            (*tree.attr(position.cell, "colwidth") != value)
                .then(|| Mutation::set_attribute(position.cell, "colwidth", value))
        })
        .collect()
}

fn expect_table(tree: &Tree, table: NodeId) -> Result<(), EditorError> {
    match tree.kind(table) {
        Some(NodeKind::Table) => Ok(()),
        _ => Err(EditorError::InvalidTarget(table)),
    }
}

/// Set one column's width, never below the configured minimum
pub fn resize_column(
    tree: &Tree,
    table: NodeId,
    column: usize,
    width: u32,
    config: &EditorConfig,
) -> Result<Transaction, EditorError> {
    expect_table(tree, table)?;
    let mut widths = column_widths(tree, table, config);
    let Some(slot) = widths.get_mut(column) else {
        return Err(EditorError::invalid_argument(format!(
            "table has no column {}",
            column
        )));
    };
    *slot = width.max(config.min_column_width);

    let mut transaction = Transaction::new(Origin::Manipulation).describe("resize column");
    transaction.extend(write_column_widths(tree, table, &widths));
    Ok(transaction)
}

/// Column widths for a table about to render `width` wide, measured from
/// its first row. A merged cell's width is split evenly over its span; the
/// rounding remainder goes to its last column.
pub fn measured_column_widths(
    tree: &Tree,
    table: NodeId,
    width: f64,
    layout: &dyn Layout,
    config: &EditorConfig,
) -> Vec<u32> {
    let mut widths = column_widths(tree, table, config);
    let mut col = 0;
    for measure in layout.measure_first_row(tree, table, width) {
        let span = measure.colspan.max(1);
        let total = measure.width.round().max(0.0) as u32;
        let each = total / span as u32;
        for i in 0..span {
            let Some(slot) = widths.get_mut(col + i) else {
                break;
            };
            let share = if i + 1 == span {
                total - each * (span as u32 - 1)
            } else {
                each
            };
            *slot = share.max(config.min_column_width);
        }
        col += span;
    }
    widths
}

/// Commit a whole-table resize: re-measured column widths plus the new
/// table height, in one transaction
pub fn commit_table_resize(
    tree: &Tree,
    table: NodeId,
    size: Size,
    layout: &dyn Layout,
    config: &EditorConfig,
) -> Result<Transaction, EditorError> {
    expect_table(tree, table)?;
    let rows = row_count(tree, table).max(1) as u32;
    let widths = measured_column_widths(tree, table, size.width, layout, config);
    let height = (size.height.round() as i64).max((rows * config.min_row_height) as i64);

    let mut transaction = Transaction::new(Origin::Manipulation).describe("resize table");
    transaction.extend(write_column_widths(tree, table, &widths));
    if *tree.attr(table, "tableHeight") != AttrValue::Int(height) {
        transaction.push(Mutation::set_attribute(table, "tableHeight", height));
    }

    tracing::debug!(
        %table,
        width = widths.iter().sum::<u32>(),
        height,
        "table resize measured"
    );
    Ok(transaction)
}

/// Set the table's border triple. The cell-border sync pass carries it to
/// every cell in the same commit.
pub fn set_border(
    tree: &Tree,
    table: NodeId,
    width: &str,
    style: &str,
    color: &str,
) -> Result<Transaction, EditorError> {
    expect_table(tree, table)?;
    if !is_pixel_length(width) {
        return Err(EditorError::invalid_argument(format!(
            "border width must look like 2px, got {:?}",
            width
        )));
    }
    if !TABLE_BORDER_STYLES.contains(&style) {
        return Err(EditorError::invalid_argument(format!(
            "unknown border style {:?}",
            style
        )));
    }
    if color.trim().is_empty() {
        return Err(EditorError::invalid_argument("border color is empty"));
    }

    Ok(Transaction::user()
        .with(Mutation::set_attribute(table, "borderWidth", width))
        .with(Mutation::set_attribute(table, "borderStyle", style))
        .with(Mutation::set_attribute(table, "borderColor", color.trim()))
        .describe("set table border"))
}

fn is_pixel_length(value: &str) -> bool {
    let Some(number) = value.strip_suffix("px") else {
        return false;
    };
    !number.is_empty()
        && number.chars().all(|c| c.is_ascii_digit() || c == '.')
        && number.parse::<f64>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::ModelLayout;
    use lectern_parser::parse;

    fn table_of(source: &str) -> (Tree, NodeId) {
        let tree = parse(source).unwrap();
        let table = tree.children(tree.root())[0];
        (tree, table)
    }

    #[test]
    fn test_map_resolves_spans() {
        let (tree, table) = table_of(concat!(
            "<table>",
            r#"<tr><td rowspan="2"><p>a</p></td><td colspan="2"><p>b</p></td></tr>"#,
            "<tr><td><p>c</p></td><td><p>d</p></td></tr>",
            "</table>"
        ));
        let map = TableMap::build(&tree, table);
        assert_eq!(map.width(), 3);
        assert_eq!(map.height(), 2);

        let cols: Vec<usize> = map.cells().iter().map(|cell| cell.col).collect();
        assert_eq!(cols, vec![0, 1, 1, 2]);
    }

    #[test]
    fn test_row_span_stops_at_last_row() {
        let (tree, table) = table_of(r#"<table><tr><td rowspan="65534"><p>a</p></td></tr></table>"#);
        let map = TableMap::build(&tree, table);
        assert_eq!(map.height(), 1);
        assert_eq!(map.cells()[0].rowspan, 1);

        let config = EditorConfig::default();
        let size = ModelLayout::new(config.clone()).table_size(&tree, table);
        assert_eq!(size.height, config.default_row_height as f64);

        let (tree, table) = table_of(concat!(
            "<table>",
            r#"<tr><td rowspan="5"><p>a</p></td><td><p>b</p></td></tr>"#,
            "<tr><td><p>c</p></td></tr>",
            "</table>"
        ));
        let map = TableMap::build(&tree, table);
        assert_eq!(map.height(), 2);
        assert_eq!(map.cells()[0].rowspan, 2);
        assert_eq!(map.position(map.cells()[2].cell).map(|cell| cell.col), Some(1));
    }

    #[test]
    fn test_column_widths_fall_back_to_default() {
        let (tree, table) = table_of(
            r#"<table><tr><td data-colwidth="80"><p>a</p></td><td><p>b</p></td></tr></table>"#,
        );
        let config = EditorConfig::default();
        assert_eq!(column_widths(&tree, table, &config), vec![80, 100]);
        assert_eq!(table_width(&tree, table, &config), 180);
    }

    #[test]
    fn test_resize_column_respects_minimum() {
        let (tree, table) = table_of("<table><tr><td><p>a</p></td><td><p>b</p></td></tr></table>");
        let config = EditorConfig::default();
        let transaction = resize_column(&tree, table, 1, 3, &config).unwrap();

        let mut tree = tree;
        for mutation in &transaction.mutations {
            mutation.apply(&mut tree).unwrap();
        }
        assert_eq!(column_widths(&tree, table, &config), vec![100, 25]);
        assert!(resize_column(&tree, table, 5, 50, &config).is_err());
    }

    #[test]
    fn test_merged_cell_width_splits_evenly() {
        let (tree, table) = table_of(concat!(
            "<table>",
            r#"<tr><td colspan="2" data-colwidth="50,50"><p>a</p></td></tr>"#,
            "<tr><td><p>b</p></td><td><p>c</p></td></tr>",
            "</table>"
        ));
        let config = EditorConfig::default();
        let widths =
            measured_column_widths(&tree, table, 101.0, &ModelLayout::new(config.clone()), &config);
        assert_eq!(widths, vec![50, 51]);
    }

    #[test]
    fn test_commit_table_resize_writes_height_and_widths() {
        let (tree, table) = table_of(concat!(
            "<table>",
            r#"<tr><td data-colwidth="100"><p>a</p></td><td data-colwidth="100"><p>b</p></td></tr>"#,
            r#"<tr><td data-colwidth="100"><p>c</p></td><td data-colwidth="100"><p>d</p></td></tr>"#,
            "</table>"
        ));
        let config = EditorConfig::default();
        let layout = ModelLayout::new(config.clone());
        let transaction =
            commit_table_resize(&tree, table, Size::new(300.0, 114.0), &layout, &config).unwrap();

        let mut tree = tree;
        for mutation in &transaction.mutations {
            mutation.apply(&mut tree).unwrap();
        }
        assert_eq!(column_widths(&tree, table, &config), vec![150, 150]);
        assert_eq!(tree.attr(table, "tableHeight"), &AttrValue::Int(114));
    }

    #[test]
    fn test_set_border_validates_input() {
        let (tree, table) = table_of("<table><tr><td><p>a</p></td></tr></table>");
        assert!(set_border(&tree, table, "2px", "dashed", "#ff0000").is_ok());
        assert!(set_border(&tree, table, "2", "dashed", "#ff0000").is_err());
        assert!(set_border(&tree, table, "2px", "wavy", "#ff0000").is_err());
        assert!(set_border(&tree, table, "2px", "solid", " ").is_err());

        let cell = tree.children(tree.children(table)[0])[0];
        assert!(matches!(
            set_border(&tree, cell, "2px", "solid", "#000"),
            Err(EditorError::InvalidTarget(_))
        ));
    }
}
