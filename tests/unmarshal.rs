//! Unmarshalling behavior per type category.

use xsdbind::{ComplexValue, QName, Value};

mod common;
use common::{unmarshal, unmarshal_strict};

// ============================================================================
// Simple content
// ============================================================================

#[test]
fn simple_text() {
    let value = unmarshal("<note>hello world</note>", "string").unwrap();
    assert_eq!(value, Value::Text("hello world".into()));
}

#[test]
fn simple_integer_with_surrounding_whitespace() {
    let value = unmarshal("<count>  42  </count>", "int").unwrap();
    assert_eq!(value, Value::Int(42));
}

#[test]
fn simple_boolean_numeric_form() {
    assert_eq!(unmarshal("<flag>1</flag>", "boolean").unwrap(), Value::Bool(true));
    assert_eq!(unmarshal("<flag>false</flag>", "boolean").unwrap(), Value::Bool(false));
}

#[test]
fn simple_text_preserves_entities_and_cdata() {
    let value = unmarshal("<note>a &amp; b <![CDATA[< c]]></note>", "string").unwrap();
    assert_eq!(value, Value::Text("a & b < c".into()));
}

#[test]
fn empty_element_is_empty_text() {
    assert_eq!(unmarshal("<note/>", "string").unwrap(), Value::Text(String::new()));
    assert_eq!(unmarshal("<note></note>", "string").unwrap(), Value::Text(String::new()));
}

// ============================================================================
// Complex by name
// ============================================================================

#[test]
fn complex_with_attribute_and_children() {
    let value = unmarshal(
        r#"<person id="7"><name>Ada</name><age>36</age></person>"#,
        "person",
    )
    .unwrap();
    let expected = ComplexValue::new()
        .with(QName::local("id"), 7i64)
        .with(QName::local("name"), "Ada")
        .with(QName::local("age"), 36i64)
        .with(QName::local("nickname"), Vec::<Value>::new());
    assert_eq!(value, Value::Complex(expected));
}

#[test]
fn optional_child_may_be_absent() {
    let value = unmarshal("<person><name>Ada</name></person>", "person").unwrap();
    let Value::Complex(person) = &value else { panic!("expected complex") };
    assert_eq!(person.get_local("name"), Some(&Value::Text("Ada".into())));
    assert_eq!(person.get_local("age"), None);
    assert_eq!(person.get_local("id"), None);
}

#[test]
fn repeated_child_collects_in_document_order() {
    let value = unmarshal(
        "<person><name>Ada</name><nickname>al</nickname><nickname>bee</nickname></person>",
        "person",
    )
    .unwrap();
    let Value::Complex(person) = &value else { panic!("expected complex") };
    assert_eq!(
        person.get_local("nickname"),
        Some(&Value::Array(vec![
            Value::Text("al".into()),
            Value::Text("bee".into()),
        ]))
    );
}

#[test]
fn missing_repeated_child_is_an_empty_array() {
    let value = unmarshal("<person><name>Ada</name></person>", "person").unwrap();
    let Value::Complex(person) = &value else { panic!("expected complex") };
    assert_eq!(person.get_local("nickname"), Some(&Value::Array(vec![])));
}

#[test]
fn lenient_skips_unmatched_children_and_keeps_the_rest() {
    let value = unmarshal(
        "<person><name>Ada</name><hobby><kind>chess</kind></hobby><age>36</age></person>",
        "person",
    )
    .unwrap();
    let Value::Complex(person) = &value else { panic!("expected complex") };
    assert_eq!(person.get_local("name"), Some(&Value::Text("Ada".into())));
    assert_eq!(person.get_local("age"), Some(&Value::Int(36)));
}

#[test]
fn lenient_duplicate_single_child_last_wins() {
    let value = unmarshal(
        "<person><name>Ada</name><name>Grace</name></person>",
        "person",
    )
    .unwrap();
    let Value::Complex(person) = &value else { panic!("expected complex") };
    assert_eq!(person.get_local("name"), Some(&Value::Text("Grace".into())));
}

#[test]
fn nested_complex_children() {
    let value = unmarshal(
        "<team>\
           <name>blue</name>\
           <scores><score>3</score><score>9</score></scores>\
           <member><name>Ada</name></member>\
           <member><name>Grace</name></member>\
         </team>",
        "team",
    )
    .unwrap();
    let Value::Complex(team) = &value else { panic!("expected complex") };
    assert_eq!(
        team.get_local("scores"),
        Some(&Value::Array(vec![Value::Int(3), Value::Int(9)]))
    );
    let Some(Value::Array(members)) = team.get_local("member") else {
        panic!("expected member array")
    };
    assert_eq!(members.len(), 2);
}

// ============================================================================
// Wrapped array
// ============================================================================

#[test]
fn wrapped_array_collects_items_in_document_order() {
    let value = unmarshal(
        "<scores><score>5</score><score>-3</score><score>0</score></scores>",
        "scores",
    )
    .unwrap();
    assert_eq!(
        value,
        Value::Array(vec![Value::Int(5), Value::Int(-3), Value::Int(0)])
    );
}

#[test]
fn empty_wrapped_array() {
    assert_eq!(unmarshal("<scores/>", "scores").unwrap(), Value::Array(vec![]));
}

#[test]
fn wrapped_array_lenient_skips_junk_and_keeps_valid_items() {
    let value = unmarshal(
        "<scores><score>1</score><junk><deep/></junk><score>2</score></scores>",
        "scores",
    )
    .unwrap();
    assert_eq!(value, Value::Array(vec![Value::Int(1), Value::Int(2)]));
}

#[test]
fn wrapped_array_strict_rejects_junk() {
    let result = unmarshal_strict(
        "<scores><score>1</score><junk/></scores>",
        "scores",
    );
    assert!(result.is_err());
}

// ============================================================================
// Union and list
// ============================================================================

#[test]
fn union_tries_members_in_declared_order() {
    assert_eq!(unmarshal("<v>true</v>", "boolOrInt").unwrap(), Value::Bool(true));
    assert_eq!(unmarshal("<v>42</v>", "boolOrInt").unwrap(), Value::Int(42));
    // "1" is in both lexical spaces; the boolean member is declared first.
    assert_eq!(unmarshal("<v>1</v>", "boolOrInt").unwrap(), Value::Bool(true));
}

#[test]
fn list_splits_on_whitespace() {
    let value = unmarshal("<l> 1  2\n3\t4 </l>", "intList").unwrap();
    assert_eq!(
        value,
        Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)])
    );
}

#[test]
fn empty_list_has_no_items() {
    assert_eq!(unmarshal("<l>   </l>", "intList").unwrap(), Value::Array(vec![]));
}

// ============================================================================
// Type substitution
// ============================================================================

#[test]
fn xsi_type_overrides_the_declared_type() {
    // `name` is declared as string, but the document substitutes int.
    let value = unmarshal(
        r#"<person xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
             <name xsi:type="int">7</name>
           </person>"#,
        "person",
    )
    .unwrap();
    let Value::Complex(person) = &value else { panic!("expected complex") };
    assert_eq!(person.get_local("name"), Some(&Value::Int(7)));
}
