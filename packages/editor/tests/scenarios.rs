//! End-to-end editing scenarios
//!
//! Each test drives a session (or a document) the way a host would and
//! checks the committed tree.

use image::{DynamicImage, RgbaImage};
use lectern_editor::{
    AttrValue, Command, Document, EditSession, Handle, Mark, Mutation, NodeKind, Point, RotateDirection,
    Selection, Transaction,
};
use lectern_raster::MemoryStore;
use std::path::PathBuf;
use std::sync::Arc;

fn document(source: &str) -> Document {
    Document::from_source(PathBuf::from("scenario.html"), source).unwrap()
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = std::io::Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(RgbaImage::new(width, height))
        .write_to(&mut bytes, image::ImageFormat::Png)
        .unwrap();
    bytes.into_inner()
}

#[test]
fn test_table_corner_drag_grows_columns_and_height() {
    let mut session = EditSession::new("scenario", document("<p>intro</p>"));
    session
        .apply_command(&Command::InsertTable { rows: 2, cols: 2 })
        .unwrap();

    let tree = session.tree();
    let table = tree.children(tree.root())[1];
    assert_eq!(tree.kind(table), Some(NodeKind::Table));
    assert_eq!(
        lectern_editor::table_geometry::column_widths(tree, table, session.config()),
        vec![100, 100]
    );

    session
        .apply_command(&Command::ResizeNode {
            handle: Handle::Se,
            delta: Point::new(100.0, 50.0),
        })
        .unwrap();

    let tree = session.tree();
    // two rows at the default 32px row height, plus the drag
    assert_eq!(*tree.attr(table, "tableHeight"), AttrValue::Int(64 + 50));
    assert_eq!(
        lectern_editor::table_geometry::column_widths(tree, table, session.config()),
        vec![150, 150]
    );
    assert!(session.history().can_undo());
}

#[test]
fn test_bolding_whole_item_sets_marker_bold_in_same_transaction() {
    let mut doc = document("<ul><li><p>hello</p></li></ul>");
    let list = doc.tree().children(doc.tree().root())[0];
    let item = doc.tree().children(list)[0];
    let paragraph = doc.tree().children(item)[0];
    assert_eq!(*doc.tree().attr(item, "markerBold"), AttrValue::Bool(false));

    let result = doc
        .apply(Transaction::user().with(Mutation::AddMark {
            block: paragraph,
            from: 0,
            to: 5,
            mark: Mark::Bold,
        }))
        .unwrap();

    assert_eq!(result.version, 1);
    assert!(result
        .synced
        .contains(&Mutation::set_attribute(item, "markerBold", true)));
    assert_eq!(*doc.tree().attr(item, "markerBold"), AttrValue::Bool(true));
}

#[test]
fn test_bolding_half_the_item_leaves_marker_plain() {
    let mut session = EditSession::new("scenario", document("<ul><li><p>hello world</p></li></ul>"));
    session.select_path(&[0, 0, 0], Some(0), Some(5)).unwrap();
    session
        .apply_command(&Command::ToggleMark { mark: Mark::Bold })
        .unwrap();

    let tree = session.tree();
    let item = tree.node_at_path(&[0, 0]).unwrap();
    assert_eq!(*tree.attr(item, "markerBold"), AttrValue::Bool(false));
    assert_eq!(
        session.document().source(),
        "<ul><li><p><strong>hello</strong> world</p></li></ul>"
    );
}

#[test]
fn test_task_font_size_flows_to_following_items() {
    let mut session = EditSession::new(
        "scenario",
        document(
            r#"<ul data-type="taskList"><li data-type="taskItem"><p>one</p></li><li data-type="taskItem"><p>two</p></li><li data-type="taskItem"><p>three</p></li></ul>"#,
        ),
    );
    session.select_path(&[0, 0, 0], Some(0), Some(3)).unwrap();
    session
        .apply_command(&Command::SetFontSize {
            size: Some("20px".into()),
        })
        .unwrap();

    let tree = session.tree();
    let list = tree.children(tree.root())[0];
    for item in tree.children(list) {
        assert_eq!(*tree.attr(*item, "fontSize"), AttrValue::str("20px"));
    }
    assert_eq!(session.version(), 1);
}

#[tokio::test]
async fn test_rotate_right_swaps_dimensions() {
    let store = Arc::new(MemoryStore::new());
    store.insert("asset://photo", png(4, 2));
    let mut session = EditSession::new(
        "scenario",
        document(r#"<img src="asset://photo" width="200" height="100">"#),
    )
    .with_assets(store.clone());
    session.select_path(&[0], None, None).unwrap();

    let outcome = session
        .execute(Command::RotateImage {
            direction: RotateDirection::Right,
        })
        .await;
    assert!(outcome.success, "{:?}", outcome.error);

    let tree = session.tree();
    let image = tree.children(tree.root())[0];
    assert_eq!(*tree.attr(image, "rotation"), AttrValue::Int(90));
    assert_eq!(*tree.attr(image, "width"), AttrValue::Int(100));
    assert_eq!(*tree.attr(image, "height"), AttrValue::Int(200));
    assert_ne!(tree.attr(image, "src").as_str(), Some("asset://photo"));
    assert_eq!(store.len(), 2);
}

#[test]
fn test_corner_drag_keeps_ratio_and_clamps() {
    let mut session = EditSession::new(
        "scenario",
        document(r#"<img src="a.png" width="200" height="100">"#),
    );
    session.select_path(&[0], None, None).unwrap();
    let image = session.tree().children(session.tree().root())[0];
    assert_eq!(session.selection(), Selection::Node { node: image });

    session
        .apply_command(&Command::ResizeNode {
            handle: Handle::Nw,
            delta: Point::new(20.0, 0.0),
        })
        .unwrap();
    assert_eq!(*session.tree().attr(image, "width"), AttrValue::Int(180));
    assert_eq!(*session.tree().attr(image, "height"), AttrValue::Int(90));

    session
        .apply_command(&Command::ResizeNode {
            handle: Handle::Nw,
            delta: Point::new(170.0, 0.0),
        })
        .unwrap();
    assert_eq!(*session.tree().attr(image, "width"), AttrValue::Int(40));
    assert_eq!(*session.tree().attr(image, "height"), AttrValue::Int(40));
}
