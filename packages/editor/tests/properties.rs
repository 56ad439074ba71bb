//! Properties that hold for every committed document

use image::{DynamicImage, RgbaImage};
use lectern_editor::manipulation::resize_image;
use lectern_editor::{
    check, AttrValue, Command, Document, EditSession, EditorConfig, Handle, Mark, MirrorAxis, Point,
    RotateDirection, Size,
};
use lectern_parser::{parse, serialize};
use lectern_raster::MemoryStore;
use std::path::PathBuf;
use std::sync::Arc;

const RICH: &str = concat!(
    r#"<h2>Title</h2>"#,
    r#"<p>plain <strong>bold</strong> <span style="font-size: 18px">sized</span></p>"#,
    r#"<ul data-list-style="square"><li data-text-color="red"><p>one</p></li></ul>"#,
    r#"<ul data-type="taskList"><li data-type="taskItem" data-checked="true"><p>done</p></li></ul>"#,
    r#"<img src="a.png" width="120" height="80" data-rotation="90" data-flip-h="true" data-custom="kept">"#,
    r#"<table data-border-width="2px" data-table-height="90"><tr><td colspan="2" data-colwidth="60,40"><p>x</p></td></tr></table>"#,
);

fn document(source: &str) -> Document {
    Document::from_source(PathBuf::from("props.html"), source).unwrap()
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = std::io::Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(RgbaImage::new(width, height))
        .write_to(&mut bytes, image::ImageFormat::Png)
        .unwrap();
    bytes.into_inner()
}

fn image_session() -> EditSession {
    let store = Arc::new(MemoryStore::new());
    store.insert("asset://photo", png(6, 3));
    let mut session = EditSession::new(
        "props",
        document(r#"<img src="asset://photo" width="200" height="100">"#),
    )
    .with_assets(store);
    session.select_path(&[0], None, None).unwrap();
    session
}

fn image_attrs(session: &EditSession) -> (AttrValue, AttrValue, AttrValue, AttrValue) {
    let tree = session.tree();
    let image = tree.children(tree.root())[0];
    (
        tree.attr(image, "rotation").clone(),
        tree.attr(image, "width").clone(),
        tree.attr(image, "height").clone(),
        tree.attr(image, "flipH").clone(),
    )
}

#[test]
fn test_round_trip_keeps_every_attribute() {
    let tree = parse(RICH).unwrap();
    let reparsed = parse(&serialize(&tree)).unwrap();
    assert!(reparsed.structurally_eq(&tree));
    assert!(serialize(&reparsed).contains(r#"data-custom="kept""#));
}

#[test]
fn test_settled_documents_pass_every_check() {
    let doc = document(RICH);
    assert_eq!(check(doc.tree()), Vec::new());
}

#[test]
fn test_edits_keep_documents_consistent() {
    let mut session = EditSession::new("props", document(RICH));
    let script = [
        Command::Select {
            path: vec![2, 0, 0],
            from: Some(0),
            to: Some(3),
        },
        Command::ToggleMark { mark: Mark::Bold },
        Command::ToggleTaskList,
        Command::SetFontSize {
            size: Some("24px".into()),
        },
        Command::InsertTable { rows: 3, cols: 2 },
        Command::SetTableBorder {
            width: "3px".into(),
            style: "dashed".into(),
            color: "#333".into(),
        },
        Command::Undo,
        Command::Redo,
    ];
    for command in &script {
        session.apply_command(command).unwrap();
        assert_eq!(check(session.tree()), Vec::new(), "after {}", command.name());
    }
}

#[tokio::test]
async fn test_right_then_left_restores_rotation_and_size() {
    let mut session = image_session();
    let before = image_attrs(&session);

    for direction in [RotateDirection::Right, RotateDirection::Left] {
        let outcome = session.execute(Command::RotateImage { direction }).await;
        assert!(outcome.success, "{:?}", outcome.error);
    }
    assert_eq!(image_attrs(&session), before);

    for _ in 0..4 {
        session
            .execute(Command::RotateImage {
                direction: RotateDirection::Left,
            })
            .await;
    }
    assert_eq!(image_attrs(&session), before);
}

#[tokio::test]
async fn test_mirror_twice_restores_flag() {
    let mut session = image_session();
    let before = image_attrs(&session);

    session
        .execute(Command::MirrorImage {
            axis: MirrorAxis::Horizontal,
        })
        .await;
    assert_eq!(image_attrs(&session).3, AttrValue::Bool(true));

    session
        .execute(Command::MirrorImage {
            axis: MirrorAxis::Horizontal,
        })
        .await;
    assert_eq!(image_attrs(&session), before);
    assert_eq!(check(session.tree()), Vec::new());
}

#[test]
fn test_resize_stays_within_media_bounds() {
    let bounds = EditorConfig::default().media_bounds();
    let starts = [Size::new(200.0, 100.0), Size::new(40.0, 40.0), Size::new(2400.0, 600.0)];
    let deltas = [-5000.0, -150.0, 0.0, 75.0, 5000.0];

    for start in starts {
        for handle in Handle::ALL {
            for dx in deltas {
                for dy in deltas {
                    let size = resize_image(start, handle, Point::new(dx, dy), bounds);
                    assert!(
                        (40.0..=2400.0).contains(&size.width) && (40.0..=2400.0).contains(&size.height),
                        "{:?} {:?} ({}, {}) gave {:?}",
                        start,
                        handle,
                        dx,
                        dy,
                        size
                    );
                }
            }
        }
    }
}

#[test]
fn test_edge_handles_change_one_axis() {
    let bounds = EditorConfig::default().media_bounds();
    let start = Size::new(200.0, 100.0);
    assert_eq!(
        resize_image(start, Handle::E, Point::new(30.0, 99.0), bounds),
        Size::new(230.0, 100.0)
    );
    assert_eq!(
        resize_image(start, Handle::N, Point::new(30.0, 20.0), bounds),
        Size::new(200.0, 80.0)
    );
}
