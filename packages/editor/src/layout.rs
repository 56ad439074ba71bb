//! Rendered geometry.
//!
//! The editor never renders; it asks a [`Layout`] how big things are on
//! screen. Hosts with a real rendering engine implement the trait; the
//! [`ModelLayout`] default derives everything from persisted attributes.

use crate::config::EditorConfig;
use crate::manipulation::Size;
use crate::table_geometry::{column_widths, TableMap};
use lectern_parser::{NodeId, Tree};

/// Size of an image with no persisted dimensions
pub const DEFAULT_IMAGE_SIZE: Size = Size {
    width: 300.0,
    height: 150.0,
};

/// Rendered width of one cell of a table's first row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellMeasure {
    pub cell: NodeId,
    pub colspan: usize,
    pub width: f64,
}

pub trait Layout: Send + Sync {
    /// On-screen size of an image node
    fn image_size(&self, tree: &Tree, image: NodeId) -> Size;

    /// On-screen size of a table node
    fn table_size(&self, tree: &Tree, table: NodeId) -> Size;

    /// Cells of the first row as they render once the table is `width`
    /// wide
    fn measure_first_row(&self, tree: &Tree, table: NodeId, width: f64) -> Vec<CellMeasure>;
}

/// Layout computed from the document model alone. Column widths scale
/// proportionally to the stored widths; rows without a persisted table
/// height take the configured row height.
#[derive(Debug, Clone, Default)]
pub struct ModelLayout {
    config: EditorConfig,
}

impl ModelLayout {
    pub fn new(config: EditorConfig) -> Self {
        Self { config }
    }
}

impl Layout for ModelLayout {
    fn image_size(&self, tree: &Tree, image: NodeId) -> Size {
        let width = tree.attr(image, "width").as_int();
        let height = tree.attr(image, "height").as_int();
        match (width, height) {
            (Some(w), Some(h)) => Size::new(w as f64, h as f64),
            (Some(w), None) => Size::new(
                w as f64,
                w as f64 * DEFAULT_IMAGE_SIZE.height / DEFAULT_IMAGE_SIZE.width,
            ),
            (None, Some(h)) => Size::new(
                h as f64 * DEFAULT_IMAGE_SIZE.width / DEFAULT_IMAGE_SIZE.height,
                h as f64,
            ),
            (None, None) => DEFAULT_IMAGE_SIZE,
        }
    }

    fn table_size(&self, tree: &Tree, table: NodeId) -> Size {
        let width: u32 = column_widths(tree, table, &self.config).iter().sum();
        let height = match tree.attr(table, "tableHeight").as_int() {
            Some(height) => height as f64,
            None => (TableMap::build(tree, table).height() as u32 * self.config.default_row_height) as f64,
        };
        Size::new(width as f64, height)
    }

    fn measure_first_row(&self, tree: &Tree, table: NodeId, width: f64) -> Vec<CellMeasure> {
        let widths = column_widths(tree, table, &self.config);
        let stored: u32 = widths.iter().sum();
        let scale = if stored == 0 { 1.0 } else { width / stored as f64 };

        TableMap::build(tree, table)
            .first_row()
            .map(|cell| CellMeasure {
                cell: cell.cell,
                colspan: cell.colspan,
                width: widths[cell.col..cell.col + cell.colspan]
                    .iter()
                    .map(|w| *w as f64 * scale)
                    .sum(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_parser::parse;

    #[test]
    fn test_table_size_from_model() {
        let tree = parse(
            r#"<table><tr><td data-colwidth="120"><p>a</p></td><td data-colwidth="80"><p>b</p></td></tr><tr><td><p>c</p></td><td><p>d</p></td></tr></table>"#,
        )
        .unwrap();
        let table = tree.children(tree.root())[0];
        let layout = ModelLayout::default();
        assert_eq!(layout.table_size(&tree, table), Size::new(200.0, 64.0));
    }

    #[test]
    fn test_first_row_scales_proportionally() {
        let tree = parse(
            r#"<table><tr><td data-colwidth="150"><p>a</p></td><td data-colwidth="50"><p>b</p></td></tr></table>"#,
        )
        .unwrap();
        let table = tree.children(tree.root())[0];
        let measures = ModelLayout::default().measure_first_row(&tree, table, 400.0);
        let widths: Vec<f64> = measures.iter().map(|m| m.width).collect();
        assert_eq!(widths, vec![300.0, 100.0]);
    }

    #[test]
    fn test_image_without_dimensions_keeps_default_ratio() {
        let tree = parse(r#"<img src="a.png" width="600">"#).unwrap();
        let image = tree.children(tree.root())[0];
        assert_eq!(
            ModelLayout::default().image_size(&tree, image),
            Size::new(600.0, 300.0)
        );
    }
}
