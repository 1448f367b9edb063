//! Per-screen layout XML.

use super::naming::ScreenNames;
use super::widgets::{widget_for, Attribute};
use crate::model::{AppModel, Component, Screen};
use std::fmt::Write;

const ANDROID_NS: &str = "http://schemas.android.com/apk/res/android";
const TOOLS_NS: &str = "http://schemas.android.com/tools";

/// Id of the element emitted for a screen with no components.
pub(crate) const PLACEHOLDER_ID: &str = "placeholder";

pub(crate) fn render_layout(model: &AppModel, screen: &Screen, names: &ScreenNames) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    let _ = writeln!(
        out,
        "<FrameLayout xmlns:android=\"{}\"\n    xmlns:tools=\"{}\"\n    android:layout_width=\"match_parent\"\n    android:layout_height=\"match_parent\"\n    tools:context=\"{}.{}\">",
        ANDROID_NS, TOOLS_NS, model.package, names.class_name
    );

    if screen.components.is_empty() {
        let _ = writeln!(
            out,
            "\n    <TextView\n        android:id=\"@+id/{}\"\n        android:layout_width=\"wrap_content\"\n        android:layout_height=\"wrap_content\"\n        android:layout_gravity=\"center\"\n        android:text=\"{}\" />",
            PLACEHOLDER_ID,
            escape_attr(&android_text(&screen.name))
        );
    } else {
        for component in &screen.components {
            out.push('\n');
            render_component(&mut out, component, 1, true);
        }
    }

    out.push_str("\n</FrameLayout>\n");
    out
}

fn render_component(out: &mut String, component: &Component, depth: usize, top_level: bool) {
    let spec = widget_for(component.kind);
    let indent = "    ".repeat(depth);
    let inner = "    ".repeat(depth + 1);

    let mut attrs: Vec<Attribute> = vec![
        ("android:id", format!("@+id/{}", component.id)),
        (
            "android:layout_width",
            dimension(component.properties.width, spec.default_size.0),
        ),
        (
            "android:layout_height",
            dimension(component.properties.height, spec.default_size.1),
        ),
    ];
    attrs.extend(position_attributes(component, top_level));
    if let Some(padding) = component.properties.padding {
        attrs.push(("android:padding", format!("{}dp", padding)));
    }
    if let Some(color) = &component.properties.background_color {
        attrs.push(("android:background", color.clone()));
    }
    attrs.extend((spec.attributes)(component));

    let _ = write!(out, "{}<{}", indent, spec.tag);
    for (name, value) in &attrs {
        let value = if *name == "android:text" || *name == "android:hint" {
            android_text(value)
        } else {
            value.clone()
        };
        let _ = write!(out, "\n{}{}=\"{}\"", inner, name, escape_attr(&value));
    }

    if component.children.is_empty() {
        out.push_str(" />\n");
    } else {
        out.push_str(">\n");
        for child in &component.children {
            render_component(out, child, depth + 1, false);
        }
        let _ = writeln!(out, "{}</{}>", indent, spec.tag);
    }
}

/// Absolute editor coordinates become margins inside the root frame.
fn position_attributes(component: &Component, top_level: bool) -> Vec<Attribute> {
    let props = &component.properties;
    let mut attrs = Vec::new();
    if top_level && (props.x.is_some() || props.y.is_some()) {
        attrs.push(("android:layout_gravity", "top|start".to_string()));
    }
    if let Some(x) = props.x {
        attrs.push(("android:layout_marginStart", format!("{}dp", x)));
    }
    if let Some(y) = props.y {
        attrs.push(("android:layout_marginTop", format!("{}dp", y)));
    }
    attrs
}

fn dimension(value: Option<i32>, default: &str) -> String {
    match value {
        None => default.to_string(),
        Some(v) if v < 0 => "match_parent".to_string(),
        Some(v) => format!("{}dp", v),
    }
}

/// Escape resource-reference prefixes and quotes that aapt treats specially in inline text.
pub(crate) fn android_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    if text.starts_with('@') || text.starts_with('?') {
        out.push('\\');
    }
    for c in text.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}

pub(crate) fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
