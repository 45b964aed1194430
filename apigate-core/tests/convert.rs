use apigate_core::{convert, convert_with, MarkupOptions, TaggedValue, TypeTag};
use serde_json::json;

fn samples() -> Vec<TaggedValue> {
    vec![
        TaggedValue::Boolean(true),
        TaggedValue::Integer(-7),
        TaggedValue::Float(2.5),
        TaggedValue::text("on"),
        TaggedValue::Json(json!({"b": [1, 2], "a": "x"})),
        TaggedValue::Xml("<r a=\"1\"><c>t</c></r>".into()),
        TaggedValue::Html("<p>hi</p>".into()),
        TaggedValue::Array(vec![json!(1), json!("two")]),
        TaggedValue::Image("https://example.com/a.png".into()),
        TaggedValue::File("/tmp/upload.bin".into()),
    ]
}

#[test]
fn same_type_is_identity() {
    for v in samples() {
        let tag = v.type_tag();
        assert_eq!(convert(v.clone(), tag).unwrap(), v);
    }
}

#[test]
fn conversions_are_deterministic() {
    for v in samples() {
        for to in TypeTag::ALL {
            let first = convert(v.clone(), to);
            let second = convert(v.clone(), to);
            assert_eq!(first, second, "{} -> {to}", v.type_tag());
        }
    }
}

#[test]
fn unsupported_pairs_name_both_types() {
    let err = convert(TaggedValue::Boolean(true), TypeTag::Image).unwrap_err();
    assert_eq!(err.to_string(), "Cannot cast boolean to image");
    let err = convert(TaggedValue::Array(vec![]), TypeTag::Image).unwrap_err();
    assert_eq!(err.to_string(), "Cannot cast array to image");
    for v in samples().into_iter().filter(|v| v.type_tag() != TypeTag::File) {
        assert!(convert(v, TypeTag::File).is_err());
    }
}

#[test]
fn xml_attributes_and_text_map_to_json_tree() {
    let out = convert(TaggedValue::Xml("<r a=\"1\"><c>t</c></r>".into()), TypeTag::Json).unwrap();
    assert_eq!(
        out,
        TaggedValue::Json(json!({"r": [{"_a": "1"}, {"c": [{"#text": "t"}]}]}))
    );
}

#[test]
fn custom_wrapper_is_used() {
    let opts = MarkupOptions {
        xml_wrapper: "payload".into(),
        ..MarkupOptions::default()
    };
    let TaggedValue::Xml(xml) = convert_with(TaggedValue::Json(json!({"k": "v"})), TypeTag::Xml, &opts).unwrap()
    else {
        panic!("expected xml");
    };
    assert!(xml.ends_with("<payload><k>v</k></payload>"));
}

#[test]
fn boolean_to_html_wraps_in_document() {
    let TaggedValue::Html(html) = convert(TaggedValue::Boolean(true), TypeTag::Html).unwrap() else {
        panic!("expected html");
    };
    assert!(html.contains("<title>HTML generated by apigate</title>"));
    assert!(html.contains("<div>true</div>"));
}
