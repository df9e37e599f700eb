//! The cursor-position protocol: every codec leaves the cursor exactly one
//! event past the matching end-element, so sibling parsing never desyncs.

use xsdbind::{DocumentCursor, EventCursor, QName, UnmarshalTable, Unmarshaler, Value};

mod common;

#[test]
fn consecutive_siblings_parse_from_one_cursor() {
    let xml = "<pair>\
                 <person><name>Ada</name><age>36</age></person>\
                 <person><name>Grace</name></person>\
               </pair>";
    let catalog = common::catalog();
    let table = UnmarshalTable::build(&catalog).unwrap();
    let engine = Unmarshaler::new(&catalog, &table);

    let mut cursor = EventCursor::from_str(xml).unwrap();
    assert!(cursor.advance_to_next_start_element().unwrap());
    assert_eq!(cursor.local_name(), Some("pair"));
    cursor.next().unwrap();

    let first = engine
        .from_cursor(&mut cursor, &QName::local("person"))
        .unwrap();
    let Value::Complex(p) = &first else { panic!("expected complex") };
    assert_eq!(p.get_local("name"), Some(&Value::Text("Ada".into())));

    // The first operation must have left the cursor ready for its sibling.
    let after_first = cursor.position();
    let second = engine
        .from_cursor(&mut cursor, &QName::local("person"))
        .unwrap();
    let Value::Complex(p) = &second else { panic!("expected complex") };
    assert_eq!(p.get_local("name"), Some(&Value::Text("Grace".into())));
    assert!(cursor.position() > after_first, "cursor went backwards");

    // Nothing left but the enclosing end.
    assert!(!cursor.advance_to_next_start_element().unwrap());
    assert!(cursor.is_end_element());
    assert_eq!(cursor.local_name(), Some("pair"));
}

#[test]
fn cursor_positions_only_move_forward() {
    let xml = "<scores><score>1</score><score>2</score><score>3</score></scores>";
    let catalog = common::catalog();
    let table = UnmarshalTable::build(&catalog).unwrap();
    let engine = Unmarshaler::new(&catalog, &table);

    let mut cursor = EventCursor::from_str(xml).unwrap();
    let before = cursor.position();
    let value = engine
        .from_cursor(&mut cursor, &QName::local("scores"))
        .unwrap();
    assert_eq!(
        value,
        Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );
    assert!(cursor.position() > before);
    // The root was the last element; the cursor parked at end-of-input.
    assert!(!cursor.has_next());
}

#[test]
fn skipped_subtrees_do_not_desync_following_siblings() {
    let xml = "<person>\
                 <mystery><deep><deeper>?</deeper></deep></mystery>\
                 <name>Ada</name>\
                 <age>36</age>\
               </person>";
    let value = common::unmarshal(xml, "person").unwrap();
    let Value::Complex(p) = &value else { panic!("expected complex") };
    assert_eq!(p.get_local("name"), Some(&Value::Text("Ada".into())));
    assert_eq!(p.get_local("age"), Some(&Value::Int(36)));
}
