//! Component mapping table
//!
//! Each [`ComponentKind`] maps to a layout tag, the Java class the activity binds it to, and a
//! function producing its type-specific attributes. Kinds without an entry (currently only
//! `Unknown`) resolve to [`FALLBACK`], so the mapping is total. Adding a component kind is a
//! new row, not a new branch.

use crate::model::{Component, ComponentKind};

/// One `name="value"` attribute. Values are raw; the layout renderer escapes them.
pub type Attribute = (&'static str, String);

pub struct WidgetSpec {
    pub kind: ComponentKind,
    /// Layout XML tag
    pub tag: &'static str,
    /// Fully qualified class bound in the activity
    pub java_class: &'static str,
    pub attributes: fn(&Component) -> Vec<Attribute>,
    /// Default `(width, height)` when the model leaves size unset
    pub default_size: (&'static str, &'static str),
}

impl WidgetSpec {
    pub fn simple_class_name(&self) -> &'static str {
        self.java_class.rsplit('.').next().unwrap_or(self.java_class)
    }
}

const WRAP: &str = "wrap_content";
const MATCH: &str = "match_parent";

pub static WIDGETS: &[WidgetSpec] = &[
    WidgetSpec {
        kind: ComponentKind::Button,
        tag: "Button",
        java_class: "android.widget.Button",
        attributes: button_attributes,
        default_size: (WRAP, WRAP),
    },
    WidgetSpec {
        kind: ComponentKind::TextView,
        tag: "TextView",
        java_class: "android.widget.TextView",
        attributes: text_attributes,
        default_size: (WRAP, WRAP),
    },
    WidgetSpec {
        kind: ComponentKind::EditText,
        tag: "EditText",
        java_class: "android.widget.EditText",
        attributes: edit_text_attributes,
        default_size: (MATCH, WRAP),
    },
    WidgetSpec {
        kind: ComponentKind::ImageView,
        tag: "ImageView",
        java_class: "android.widget.ImageView",
        attributes: image_attributes,
        default_size: (WRAP, WRAP),
    },
    WidgetSpec {
        kind: ComponentKind::CheckBox,
        tag: "CheckBox",
        java_class: "android.widget.CheckBox",
        attributes: checkable_attributes,
        default_size: (WRAP, WRAP),
    },
    WidgetSpec {
        kind: ComponentKind::Switch,
        tag: "Switch",
        java_class: "android.widget.Switch",
        attributes: checkable_attributes,
        default_size: (WRAP, WRAP),
    },
    WidgetSpec {
        kind: ComponentKind::ProgressBar,
        tag: "ProgressBar",
        java_class: "android.widget.ProgressBar",
        attributes: progress_attributes,
        default_size: (WRAP, WRAP),
    },
    WidgetSpec {
        kind: ComponentKind::LinearLayout,
        tag: "LinearLayout",
        java_class: "android.widget.LinearLayout",
        attributes: linear_layout_attributes,
        default_size: (MATCH, WRAP),
    },
    WidgetSpec {
        kind: ComponentKind::FrameLayout,
        tag: "FrameLayout",
        java_class: "android.widget.FrameLayout",
        attributes: no_attributes,
        default_size: (MATCH, WRAP),
    },
    WidgetSpec {
        kind: ComponentKind::ScrollView,
        tag: "ScrollView",
        java_class: "android.widget.ScrollView",
        attributes: no_attributes,
        default_size: (MATCH, MATCH),
    },
    WidgetSpec {
        kind: ComponentKind::Spacer,
        tag: "Space",
        java_class: "android.widget.Space",
        attributes: no_attributes,
        default_size: ("16dp", "16dp"),
    },
];

/// Placeholder for kinds the table does not know.
pub static FALLBACK: WidgetSpec = WidgetSpec {
    kind: ComponentKind::Unknown,
    tag: "TextView",
    java_class: "android.widget.TextView",
    attributes: placeholder_attributes,
    default_size: (WRAP, WRAP),
};

pub fn widget_for(kind: ComponentKind) -> &'static WidgetSpec {
    WIDGETS
        .iter()
        .find(|spec| spec.kind == kind)
        .unwrap_or(&FALLBACK)
}

fn no_attributes(_: &Component) -> Vec<Attribute> {
    Vec::new()
}

fn text_style(component: &Component, attrs: &mut Vec<Attribute>) {
    let props = &component.properties;
    if let Some(size) = props.text_size {
        attrs.push(("android:textSize", format!("{}sp", size)));
    }
    if let Some(color) = &props.text_color {
        attrs.push(("android:textColor", color.clone()));
    }
}

fn text_attributes(component: &Component) -> Vec<Attribute> {
    let mut attrs = vec![(
        "android:text",
        component.properties.text.clone().unwrap_or_default(),
    )];
    text_style(component, &mut attrs);
    attrs
}

fn button_attributes(component: &Component) -> Vec<Attribute> {
    let mut attrs = vec![(
        "android:text",
        component
            .properties
            .text
            .clone()
            .unwrap_or_else(|| "Button".to_string()),
    )];
    text_style(component, &mut attrs);
    attrs
}

fn edit_text_attributes(component: &Component) -> Vec<Attribute> {
    let props = &component.properties;
    let mut attrs = vec![("android:inputType", "text".to_string())];
    if let Some(hint) = &props.hint {
        attrs.push(("android:hint", hint.clone()));
    }
    if let Some(text) = &props.text {
        attrs.push(("android:text", text.clone()));
    }
    text_style(component, &mut attrs);
    attrs
}

fn image_attributes(component: &Component) -> Vec<Attribute> {
    vec![
        ("android:src", "@mipmap/ic_launcher".to_string()),
        ("android:scaleType", "centerCrop".to_string()),
        (
            "android:contentDescription",
            component
                .properties
                .text
                .clone()
                .unwrap_or_else(|| component.id.clone()),
        ),
    ]
}

fn checkable_attributes(component: &Component) -> Vec<Attribute> {
    let props = &component.properties;
    let mut attrs = vec![("android:text", props.text.clone().unwrap_or_default())];
    if let Some(checked) = props.checked {
        attrs.push(("android:checked", checked.to_string()));
    }
    text_style(component, &mut attrs);
    attrs
}

fn progress_attributes(_: &Component) -> Vec<Attribute> {
    vec![("android:indeterminate", "true".to_string())]
}

fn linear_layout_attributes(component: &Component) -> Vec<Attribute> {
    let orientation = match component.properties.orientation.as_deref() {
        Some("horizontal") => "horizontal",
        _ => "vertical",
    };
    vec![("android:orientation", orientation.to_string())]
}

fn placeholder_attributes(component: &Component) -> Vec<Attribute> {
    vec![(
        "android:text",
        format!("Unsupported component: {}", component.id),
    )]
}
