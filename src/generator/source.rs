//! Per-screen Java activity source.

use super::naming::ScreenNames;
use super::widgets::widget_for;
use crate::model::{AppModel, Component, ComponentKind, Screen};
use std::collections::BTreeSet;
use std::fmt::Write;

pub(crate) fn render_activity(
    model: &AppModel,
    screen: &Screen,
    names: &ScreenNames,
    all: &[ScreenNames],
) -> String {
    let components = screen.walk();
    let navigations: Vec<(&Component, &str)> = components
        .iter()
        .filter_map(|c| {
            let target = c.properties.navigate_to.as_deref()?;
            let index = model.screens.iter().position(|s| s.name == target)?;
            Some((*c, all[index].class_name.as_str()))
        })
        .collect();

    let mut imports: BTreeSet<&str> = BTreeSet::new();
    imports.insert("android.os.Bundle");
    imports.insert("androidx.appcompat.app.AppCompatActivity");
    if !navigations.is_empty() {
        imports.insert("android.content.Intent");
    }
    for component in &components {
        imports.insert(widget_for(component.kind).java_class);
    }

    let mut out = String::new();
    let _ = writeln!(out, "package {};\n", model.package);
    for import in &imports {
        let _ = writeln!(out, "import {};", import);
    }
    let _ = writeln!(
        out,
        "\npublic class {} extends AppCompatActivity {{\n",
        names.class_name
    );

    for component in &components {
        let _ = writeln!(
            out,
            "    private {} {};",
            widget_for(component.kind).simple_class_name(),
            component.id
        );
    }
    if !components.is_empty() {
        out.push('\n');
    }

    out.push_str("    @Override\n    protected void onCreate(Bundle savedInstanceState) {\n");
    out.push_str("        super.onCreate(savedInstanceState);\n");
    let _ = writeln!(out, "        setContentView(R.layout.{});", names.layout);
    if !components.is_empty() {
        out.push('\n');
    }
    for component in &components {
        let _ = writeln!(
            out,
            "        {} = findViewById(R.id.{});",
            component.id, component.id
        );
    }
    for (component, target_class) in &navigations {
        let _ = writeln!(
            out,
            "        {}.setOnClickListener(v -> startActivity(new Intent(this, {}.class)));",
            component.id, target_class
        );
    }
    for component in components.iter().filter(|c| c.kind == ComponentKind::Unknown) {
        let _ = writeln!(
            out,
            "        // {} has no native mapping and renders as a placeholder",
            component.id
        );
    }
    out.push_str("    }\n}\n");
    out
}
