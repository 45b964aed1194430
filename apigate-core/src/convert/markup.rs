use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value as JsonValue};

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
const ATTR_PREFIX: char = '_';
const TEXT_KEY: &str = "#text";
const ARRAY_ITEM: &str = "item";

/// Wrap a scalar's text form in the root element.
pub fn wrap_scalar(wrapper: &str, text: &str) -> String {
    format!("{XML_DECL}<{wrapper}>{}</{wrapper}>", escape(text))
}

/// Render a JSON value as an XML document under `wrapper`.
pub fn json_to_xml(wrapper: &str, value: &JsonValue) -> String {
    let mut out = String::from(XML_DECL);
    write_element(&mut out, wrapper, value);
    out
}

/// Element markup for a JSON value, without a declaration.
pub fn json_fragment(wrapper: &str, value: &JsonValue) -> String {
    let mut out = String::new();
    write_element(&mut out, wrapper, value);
    out
}

fn write_element(out: &mut String, name: &str, value: &JsonValue) {
    let name = element_name(name);
    match value {
        JsonValue::Null => {
            out.push('<');
            out.push_str(&name);
            out.push_str("/>");
        }
        JsonValue::Object(map) => {
            out.push_str(&format!("<{name}>"));
            for (k, v) in map {
                write_element(out, k, v);
            }
            out.push_str(&format!("</{name}>"));
        }
        JsonValue::Array(items) => {
            out.push_str(&format!("<{name}>"));
            for item in items {
                write_element(out, ARRAY_ITEM, item);
            }
            out.push_str(&format!("</{name}>"));
        }
        JsonValue::String(s) => out.push_str(&format!("<{name}>{}</{name}>", escape(s.as_str()))),
        other => out.push_str(&format!("<{name}>{other}</{name}>")),
    }
}

/// Coerce an object key into a legal XML element name.
fn element_name(key: &str) -> String {
    let mut name: String = key
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    match name.chars().next() {
        None => name.push_str(ARRAY_ITEM),
        Some(c) if !(c.is_alphabetic() || c == '_') => name.insert(0, '_'),
        Some(_) => {}
    }
    name
}

pub fn html_document(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html><html lang="en-us"><head><meta charset="utf-8"/><title>{}</title></head><body><div>{body}</div></body></html>"#,
        escape(title)
    )
}

/// Drop a leading `<?xml ...?>` declaration so the markup can be embedded.
pub fn strip_declaration(xml: &str) -> &str {
    let trimmed = xml.trim_start();
    if trimmed.starts_with("<?xml") {
        if let Some(end) = trimmed.find("?>") {
            return trimmed[end + 2..].trim_start();
        }
    }
    trimmed
}

/// Parse XML or HTML into `{name: [{"_attr": v}, {child: [...]}, {"#text": t}]}`.
///
/// In HTML mode, valueless attributes and unknown entities are tolerated and
/// unclosed elements are closed by their nearest matching ancestor.
pub fn markup_to_json(src: &str, html: bool) -> Result<JsonValue, String> {
    let mut reader = Reader::from_str(src);
    let config = reader.config_mut();
    config.trim_text(true);
    config.check_end_names = !html;
    config.allow_unmatched_ends = html;

    let mut stack: Vec<(String, Vec<JsonValue>)> = Vec::new();
    let mut roots: Vec<JsonValue> = Vec::new();

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => {
                let name = tag_name(&e);
                let attrs = attributes(&e, html)?;
                stack.push((name, attrs));
            }
            Event::Empty(e) => {
                let name = tag_name(&e);
                let attrs = attributes(&e, html)?;
                push_child(&mut stack, &mut roots, element(name, attrs));
            }
            Event::Text(t) => {
                let text = match t.unescape() {
                    Ok(s) => s.into_owned(),
                    Err(_) if html => String::from_utf8_lossy(&t).into_owned(),
                    Err(e) => return Err(e.to_string()),
                };
                if !text.is_empty() {
                    push_child(&mut stack, &mut roots, text_node(text));
                }
            }
            Event::CData(c) => {
                let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                push_child(&mut stack, &mut roots, text_node(text));
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if let Some(pos) = stack.iter().rposition(|(n, _)| n.eq_ignore_ascii_case(&name)) {
                    while stack.len() > pos {
                        if let Some((n, children)) = stack.pop() {
                            push_child(&mut stack, &mut roots, element(n, children));
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    if !html && !stack.is_empty() {
        return Err("unexpected end of document".to_string());
    }
    while let Some((n, children)) = stack.pop() {
        push_child(&mut stack, &mut roots, element(n, children));
    }

    Ok(match roots.len() {
        0 => JsonValue::Null,
        1 => roots.remove(0),
        _ => JsonValue::Array(roots),
    })
}

fn tag_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn attributes(e: &BytesStart<'_>, html: bool) -> Result<Vec<JsonValue>, String> {
    let mut out = Vec::new();
    let attrs = if html { e.html_attributes() } else { e.attributes() };
    for attr in attrs {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = format!("{ATTR_PREFIX}{}", String::from_utf8_lossy(attr.key.as_ref()));
        let value = match attr.unescape_value() {
            Ok(v) => v.into_owned(),
            Err(_) if html => String::from_utf8_lossy(&attr.value).into_owned(),
            Err(e) => return Err(e.to_string()),
        };
        let mut map = Map::new();
        map.insert(key, JsonValue::String(value));
        out.push(JsonValue::Object(map));
    }
    Ok(out)
}

fn element(name: String, children: Vec<JsonValue>) -> JsonValue {
    let mut map = Map::new();
    map.insert(name, JsonValue::Array(children));
    JsonValue::Object(map)
}

fn text_node(text: String) -> JsonValue {
    let mut map = Map::new();
    map.insert(TEXT_KEY.to_string(), JsonValue::String(text));
    JsonValue::Object(map)
}

fn push_child(stack: &mut [(String, Vec<JsonValue>)], roots: &mut Vec<JsonValue>, child: JsonValue) {
    match stack.last_mut() {
        Some((_, children)) => children.push(child),
        None => roots.push(child),
    }
}
