//! Command scripts as a host would send them

use lectern_editor::{check, AttrValue, Command, Document, EditSession, NodeKind};
use std::path::PathBuf;

fn session(source: &str) -> EditSession {
    let doc = Document::from_source(PathBuf::from("commands.html"), source).unwrap();
    EditSession::new("commands", doc)
}

fn script(json: &str) -> Vec<Command> {
    serde_json::from_str(json).unwrap()
}

#[tokio::test]
async fn test_json_script_runs_in_order() {
    let mut session = session("<p>first</p><p>second</p>");
    let commands = script(
        r#"[
            { "command": "select", "path": [1], "from": 0, "to": 6 },
            { "command": "toggleBulletList", "style": "circle" },
            { "command": "toggleMark", "mark": { "type": "bold" } },
            { "command": "insertParagraph", "text": "third" }
        ]"#,
    );

    for command in commands {
        let outcome = session.execute(command).await;
        assert!(outcome.success, "{:?}", outcome.error);
    }

    assert_eq!(
        session.document().source(),
        // the new paragraph lands inside the item, so its marker is no longer bold
        r#"<p>first</p><ul data-list-style="circle"><li><p><strong>second</strong></p><p>third</p></li></ul>"#
    );
    assert_eq!(session.version(), 3);
}

#[test]
fn test_toggle_bullet_list_twice_lifts_back_out() {
    let mut session = session("<p>item</p>");
    session.select_path(&[0], Some(2), None).unwrap();

    session
        .apply_command(&Command::ToggleBulletList { style: None })
        .unwrap();
    assert_eq!(session.tree().kind(session.tree().node_at_path(&[0]).unwrap()), Some(NodeKind::BulletList));

    session
        .apply_command(&Command::ToggleBulletList { style: None })
        .unwrap();
    assert_eq!(session.document().source(), "<p>item</p>");
}

#[test]
fn test_task_list_toggle_converts_bullets() {
    let mut session = session("<ul><li><p>a</p></li><li><p>b</p></li></ul>");
    session.select_path(&[0, 1, 0], Some(0), None).unwrap();
    session.apply_command(&Command::ToggleTaskList).unwrap();

    let tree = session.tree();
    let list = tree.children(tree.root())[0];
    assert_eq!(tree.kind(list), Some(NodeKind::TaskList));
    assert!(tree
        .children(list)
        .iter()
        .all(|item| tree.kind(*item) == Some(NodeKind::TaskItem)));

    session
        .apply_command(&Command::SetChecked { checked: true })
        .unwrap();
    let item = session.tree().node_at_path(&[0, 1]).unwrap();
    assert_eq!(*session.tree().attr(item, "checked"), AttrValue::Bool(true));
}

#[test]
fn test_table_border_reaches_every_cell() {
    let mut session = session("<p>a</p>");
    session
        .apply_command(&Command::InsertTable { rows: 2, cols: 3 })
        .unwrap();
    session
        .apply_command(&Command::SetTableBorder {
            width: "2px".into(),
            style: "dotted".into(),
            color: "#ff0000".into(),
        })
        .unwrap();

    let tree = session.tree();
    let table = tree.children(tree.root())[1];
    let cells: Vec<_> = tree
        .descendants(table)
        .into_iter()
        .filter(|id| tree.kind(*id).is_some_and(NodeKind::is_cell))
        .collect();
    assert_eq!(cells.len(), 6);
    for cell in cells {
        assert_eq!(*tree.attr(cell, "cellBorder"), AttrValue::str("2px dotted #ff0000"));
    }
}

#[test]
fn test_rejected_commands_leave_document_alone() {
    let mut session = session("<table><tr><td><p>x</p></td></tr></table>");
    session.select_path(&[0, 0, 0], None, None).unwrap();
    let before = session.document().source();

    let bad = [
        Command::SetTableBorder {
            width: "thick".into(),
            style: "solid".into(),
            color: "#000".into(),
        },
        Command::SetTableBorder {
            width: "1px".into(),
            style: "wavy".into(),
            color: "#000".into(),
        },
        Command::SetAttribute {
            name: "cellBorder".into(),
            value: AttrValue::str("9px solid red"),
        },
        Command::InsertImage {
            attrs: Default::default(),
        },
    ];
    for command in &bad {
        assert!(session.apply_command(command).is_err(), "{} should fail", command.name());
    }

    assert_eq!(session.document().source(), before);
    assert_eq!(session.version(), 0);
    assert!(!session.history().can_undo());
}

#[test]
fn test_cell_background_and_undo() {
    let mut session = session("<table><tr><td><p>x</p></td><td><p>y</p></td></tr></table>");
    session.select_path(&[0, 0, 1], None, None).unwrap();

    session
        .apply_command(&Command::SetCellBackground {
            color: Some("#eeeeee".into()),
        })
        .unwrap();
    let cell = session.tree().node_at_path(&[0, 0, 1]).unwrap();
    assert_eq!(*session.tree().attr(cell, "background"), AttrValue::str("#eeeeee"));

    session.apply_command(&Command::Undo).unwrap();
    assert!(session.tree().attr(cell, "background").is_null());
    assert_eq!(check(session.tree()), Vec::new());
}
