//! Markup round trips and arena behaviour across the public API

use lectern_parser::{parse, serialize, AttrValue, Fragment, NodeKind, TreeError};

const DOCUMENTS: &[&str] = &[
    "<p>plain</p>",
    r#"<h3 data-align="right">Heading</h3><blockquote><p>quoted</p></blockquote><hr>"#,
    r#"<p><a href="https://example.com/?a=1&amp;b=2">link</a> and <code>code</code></p>"#,
    r#"<ol start="3" data-list-style="lower-roman"><li data-font-size="14px"><p>third</p></li></ol>"#,
    r#"<ul data-type="taskList"><li data-type="taskItem" data-checked="true" data-text-color="blue"><p>task</p></li></ul>"#,
    r#"<img src="data:image/png;base64,AAAA" width="320" height="240" data-rotation="180" data-flip-v="true" data-description="a &quot;quoted&quot; caption">"#,
    r##"<table data-border-style="double" data-table-height="120"><tr><th data-colwidth="50"><p>h</p></th><td rowspan="2" data-background="#eee"><p>c</p></td></tr></table>"##,
    r#"<p data-foo="bar" title="kept">unknown attributes survive</p>"#,
    r#"<p><a href="x" target="_blank" rel="noopener">l</a><span class="k">s</span></p>"#,
];

#[test]
fn test_serialized_documents_reparse_identically() {
    for source in DOCUMENTS {
        let tree = parse(source).unwrap_or_else(|err| panic!("{}: {}", source, err));
        let serialized = serialize(&tree);
        let reparsed = parse(&serialized).unwrap();
        assert!(reparsed.structurally_eq(&tree), "{} became {}", source, serialized);
        assert_eq!(serialize(&reparsed), serialized);
    }
}

#[test]
fn test_text_attributes_keep_surrounding_spaces() {
    let mut tree = parse(r#"<img src="a.png">"#).unwrap();
    let image = tree.children(tree.root())[0];
    tree.set_attr(image, "description", AttrValue::str(" A cat ")).unwrap();

    let serialized = serialize(&tree);
    assert!(serialized.contains(r#"data-description=" A cat ""#), "{}", serialized);
    let reparsed = parse(&serialized).unwrap();
    assert!(reparsed.structurally_eq(&tree), "{}", serialized);
    let image = reparsed.children(reparsed.root())[0];
    assert_eq!(*reparsed.attr(image, "description"), AttrValue::str(" A cat "));
}

#[test]
fn test_inline_attributes_and_styles_are_written_back() {
    let source = r#"<p><a href="x" target="_blank">l</a><span class="k" style="color: red; letter-spacing: 2px">s</span></p>"#;
    let tree = parse(source).unwrap();
    let serialized = serialize(&tree);
    assert_eq!(
        serialized,
        r#"<p><a href="x" target="_blank">l</a><span style="color: red; letter-spacing: 2px" class="k">s</span></p>"#
    );
    assert!(parse(&serialized).unwrap().structurally_eq(&tree));
}

#[test]
fn test_entities_decode_to_text() {
    let tree = parse("<p>&lt;tag&gt; &#65;&#x42; &#39;q&#39;</p>").unwrap();
    let paragraph = tree.children(tree.root())[0];
    assert_eq!(tree.text_content(paragraph), "<tag> AB 'q'");
}

#[test]
fn test_clamped_dimensions() {
    let tree = parse(r#"<img src="a.png" width="10" height="9000">"#).unwrap();
    let image = tree.children(tree.root())[0];
    assert_eq!(*tree.attr(image, "width"), AttrValue::Int(40));
    assert_eq!(*tree.attr(image, "height"), AttrValue::Int(2400));
}

#[test]
fn test_removed_ids_stay_dead() {
    let mut tree = parse("<p>a</p><p>b</p>").unwrap();
    let root = tree.root();
    let first = tree.children(root)[0];
    tree.remove(first).unwrap();

    let inserted = tree
        .insert_fragment(root, 0, &Fragment::paragraph("c"))
        .unwrap();
    assert_ne!(inserted, first);
    assert!(!tree.contains(first));
    assert!(matches!(
        tree.set_attr(first, "textAlign", AttrValue::str("center")),
        Err(TreeError::NodeNotFound(_))
    ));
    assert_eq!(serialize(&tree), "<p>c</p><p>b</p>");
}

#[test]
fn test_content_rules_reject_misplaced_nodes() {
    let mut tree = parse("<ul><li><p>a</p></li></ul>").unwrap();
    let list = tree.children(tree.root())[0];
    assert!(matches!(
        tree.insert_fragment(list, 0, &Fragment::paragraph("x")),
        Err(TreeError::InvalidChild {
            parent: NodeKind::BulletList,
            child: NodeKind::Paragraph
        })
    ));
}
