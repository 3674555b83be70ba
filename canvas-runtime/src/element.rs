//! Declarative element tree
//!
//! An [`Element`] is what callers describe each pass: an intrinsic tag or a
//! component function, a JSON prop map and child elements. The reconciler
//! turns it into retained scene nodes.

use crate::error::{Result, RuntimeError};
use crate::scheduler::{FrameTime, UpdateCallback};
use canvas_compositor::SceneNode;
use serde_json::{Map, Value};
use std::fmt;
use std::rc::Rc;

pub type Props = Map<String, Value>;

/// Component function: props and children in, element out
pub type ComponentFn = Rc<dyn Fn(&Props, Vec<Element>) -> anyhow::Result<Element>>;

#[derive(Clone)]
pub enum ElementType {
    Intrinsic(String),
    Component { name: String, render: ComponentFn },
}

impl ElementType {
    /// Tag or component name
    pub fn name(&self) -> &str {
        match self {
            ElementType::Intrinsic(tag) => tag,
            ElementType::Component { name, .. } => name,
        }
    }
}

impl fmt::Debug for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::Intrinsic(tag) => f.debug_tuple("Intrinsic").field(tag).finish(),
            ElementType::Component { name, .. } => f.debug_tuple("Component").field(name).finish(),
        }
    }
}

pub struct Element {
    pub kind: ElementType,
    pub props: Props,
    pub children: Vec<Element>,
    /// Per-frame callback registered under this element's key
    pub on_update: Option<UpdateCallback>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            kind: ElementType::Intrinsic(tag.into()),
            props: Props::new(),
            children: Vec::new(),
            on_update: None,
        }
    }

    pub fn component<F>(name: impl Into<String>, render: F) -> Self
    where
        F: Fn(&Props, Vec<Element>) -> anyhow::Result<Element> + 'static,
    {
        Self {
            kind: ElementType::Component {
                name: name.into(),
                render: Rc::new(render),
            },
            props: Props::new(),
            children: Vec::new(),
            on_update: None,
        }
    }

    /// `text` element with the given content
    pub fn text(content: impl Into<String>) -> Self {
        Self::new("text").prop("text", content.into())
    }

    pub fn prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    pub fn key(self, key: impl Into<String>) -> Self {
        self.prop("key", key.into())
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn on_update<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&mut SceneNode, FrameTime) -> anyhow::Result<()> + 'static,
    {
        self.on_update = Some(Box::new(callback));
        self
    }

    pub fn type_name(&self) -> &str {
        self.kind.name()
    }

    /// The `key` prop, if it is a string or a number
    pub fn explicit_key(&self) -> Option<String> {
        match self.props.get("key")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Parse `{ "type": .., "props": { "children": .., .. } }`
    ///
    /// `null` and non-object roots are rejected. String and number children
    /// become `text` elements, or the content of an enclosing `text`.
    /// `null` and boolean children are dropped.
    pub fn from_json(value: &Value) -> Result<Element> {
        match value {
            Value::Null => Err(RuntimeError::InvalidArgument(
                "cannot render a null tree".into(),
            )),
            Value::Object(map) => parse_element(map),
            other => Err(RuntimeError::InvalidArgument(format!(
                "expected an element object, found {}",
                json_kind(other)
            ))),
        }
    }

    /// One-line summary for logs, e.g. `<rect key="a" x=1> (2 children)`
    pub fn describe(&self) -> String {
        describe(self.type_name(), &self.props, self.children.len())
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("kind", &self.kind)
            .field("props", &self.props)
            .field("children", &self.children)
            .field("on_update", &self.on_update.is_some())
            .finish()
    }
}

fn parse_element(map: &Map<String, Value>) -> Result<Element> {
    let tag = map
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| RuntimeError::InvalidArgument("element without a string `type`".into()))?;

    let mut props = match map.get("props") {
        Some(Value::Object(props)) => props.clone(),
        None | Some(Value::Null) => Props::new(),
        Some(other) => {
            return Err(RuntimeError::InvalidArgument(format!(
                "`props` of <{tag}> must be an object, found {}",
                json_kind(other)
            )))
        }
    };
    let children = props
        .remove("children")
        .or_else(|| map.get("children").cloned());

    let mut element = Element::new(tag);
    element.props = props;
    if let Some(children) = children {
        push_children(&mut element, children)?;
    }
    Ok(element)
}

fn push_children(parent: &mut Element, children: Value) -> Result<()> {
    match children {
        Value::Null | Value::Bool(_) => {}
        Value::Array(items) => {
            for item in items {
                push_children(parent, item)?;
            }
        }
        Value::String(_) | Value::Number(_) => {
            let content = match children {
                Value::String(s) => s,
                other => other.to_string(),
            };
            if parent.type_name() == "text" {
                let existing = parent.props.get("text").and_then(Value::as_str).unwrap_or("");
                let joined = format!("{existing}{content}");
                parent.props.insert("text".into(), Value::String(joined));
            } else {
                parent.children.push(Element::text(content));
            }
        }
        Value::Object(map) => parent.children.push(parse_element(&map)?),
    }
    Ok(())
}

/// Summary of a tag, its props and child count
///
/// Props are truncated, so arbitrarily large trees stay on one line.
pub(crate) fn describe(tag: &str, props: &Props, children: usize) -> String {
    let mut out = format!("<{tag}");
    for (name, value) in props.iter().take(6) {
        out.push(' ');
        out.push_str(name);
        out.push('=');
        out.push_str(&summarize(value));
    }
    if props.len() > 6 {
        out.push_str(" ..");
    }
    out.push('>');
    if children > 0 {
        out.push_str(&format!(" ({children} children)"));
    }
    out
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn summarize(value: &Value) -> String {
    match value {
        Value::Array(items) => format!("[{} items]", items.len()),
        Value::Object(map) => format!("{{{} fields}}", map.len()),
        Value::String(s) if s.chars().count() > 24 => {
            let head: String = s.chars().take(24).collect();
            format!("\"{head}..\"")
        }
        other => other.to_string(),
    }
}
