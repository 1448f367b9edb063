//! Property-based tests for project generation guarantees

use apkforge::generator::{generate, ProjectTree};
use apkforge::model::{AppModel, Component, ComponentKind, Properties, Screen, ThemeColors};
use proptest::prelude::*;
use std::collections::HashSet;

const LEAF_KINDS: [ComponentKind; 9] = [
    ComponentKind::Button,
    ComponentKind::TextView,
    ComponentKind::EditText,
    ComponentKind::ImageView,
    ComponentKind::CheckBox,
    ComponentKind::Switch,
    ComponentKind::ProgressBar,
    ComponentKind::Spacer,
    ComponentKind::Unknown,
];

const CONTAINER_KINDS: [ComponentKind; 3] = [
    ComponentKind::LinearLayout,
    ComponentKind::FrameLayout,
    ComponentKind::ScrollView,
];

const TEXT: &str = "[a-zA-Z0-9 &<>'\"]{0,12}";

/// Component tree without ids; ids are assigned when the model is built.
#[derive(Debug, Clone)]
enum Shape {
    Leaf(ComponentKind, String),
    Container(ComponentKind, Vec<Shape>),
}

fn shape_strategy() -> impl Strategy<Value = Shape> {
    let leaf = (prop::sample::select(LEAF_KINDS.to_vec()), TEXT)
        .prop_map(|(kind, text)| Shape::Leaf(kind, text));
    leaf.prop_recursive(3, 24, 4, |inner| {
        (
            prop::sample::select(CONTAINER_KINDS.to_vec()),
            prop::collection::vec(inner, 0..4),
        )
            .prop_map(|(kind, children)| Shape::Container(kind, children))
    })
}

/// Per screen: top-level component shapes.
fn screens_strategy() -> impl Strategy<Value = Vec<Vec<Shape>>> {
    prop::collection::vec(prop::collection::vec(shape_strategy(), 0..5), 1..4)
}

fn build_component(shape: &Shape, screen: usize, next_id: &mut usize) -> Component {
    let id = format!("c{}_{}", screen, *next_id);
    *next_id += 1;
    match shape {
        Shape::Leaf(kind, text) => Component {
            id,
            kind: *kind,
            properties: Properties {
                text: Some(text.clone()),
                ..Properties::default()
            },
            children: Vec::new(),
        },
        Shape::Container(kind, children) => {
            let limit = if *kind == ComponentKind::ScrollView { 1 } else { children.len() };
            Component {
                id,
                kind: *kind,
                properties: Properties::default(),
                children: children
                    .iter()
                    .take(limit)
                    .map(|child| build_component(child, screen, next_id))
                    .collect(),
            }
        }
    }
}

fn build_model(screens: &[Vec<Shape>]) -> AppModel {
    AppModel {
        id: "prop-app".to_string(),
        name: "Prop App".to_string(),
        package: "com.example.prop".to_string(),
        version_code: 1,
        version_name: "1.0".to_string(),
        min_sdk: 24,
        theme: ThemeColors::default(),
        screens: screens
            .iter()
            .enumerate()
            .map(|(s, shapes)| {
                let mut next_id = 0;
                Screen {
                    id: format!("s{}", s),
                    name: format!("Screen {}", s + 1),
                    components: shapes
                        .iter()
                        .map(|shape| build_component(shape, s, &mut next_id))
                        .collect(),
                }
            })
            .collect(),
    }
}

/// Identifiers following each occurrence of `prefix`, up to `terminator`.
fn ids_after(text: &str, prefix: &str, terminator: char) -> Vec<String> {
    text.split(prefix)
        .skip(1)
        .filter_map(|rest| rest.split(terminator).next())
        .map(str::to_string)
        .collect()
}

fn layout_text(tree: &ProjectTree, screen_index: usize) -> &str {
    let path = format!("app/src/main/res/layout/activity_screen{}.xml", screen_index + 1);
    tree.get(&path).and_then(|f| f.as_text()).unwrap()
}

/// The activity that inflates the screen's layout.
fn activity_text(tree: &ProjectTree, screen_index: usize) -> &str {
    let inflate = format!("setContentView(R.layout.activity_screen{});", screen_index + 1);
    tree.files()
        .iter()
        .filter(|f| f.path.ends_with("Activity.java"))
        .filter_map(|f| f.as_text())
        .find(|text| text.contains(&inflate))
        .unwrap()
}

/// Every generated file has its own path
#[test]
fn test_generated_paths_are_unique() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&screens_strategy(), |screens| {
            let tree = generate(&build_model(&screens)).unwrap();
            let mut seen = HashSet::new();
            for file in tree.files() {
                prop_assert!(seen.insert(file.path.clone()), "duplicate {}", file.path);
            }
            let layouts = tree
                .files()
                .iter()
                .filter(|f| f.path.starts_with("app/src/main/res/layout/"))
                .count();
            prop_assert_eq!(layouts, screens.len());
            Ok(())
        })
        .unwrap();
}

/// Each component id, nested or not, is declared exactly once in its screen's layout
#[test]
fn test_component_ids_declared_once() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&screens_strategy(), |screens| {
            let model = build_model(&screens);
            let tree = generate(&model).unwrap();
            for (s, screen) in model.screens.iter().enumerate() {
                let layout = layout_text(&tree, s);
                for component in screen.walk() {
                    let declaration = format!("android:id=\"@+id/{}\"", component.id);
                    prop_assert_eq!(layout.matches(&declaration).count(), 1);
                }
            }
            Ok(())
        })
        .unwrap();
}

/// The activity binds exactly the views its layout declares, in tree order
#[test]
fn test_activity_binds_layout_ids() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&screens_strategy(), |screens| {
            let model = build_model(&screens);
            let tree = generate(&model).unwrap();
            for (s, screen) in model.screens.iter().enumerate() {
                let expected: Vec<String> = screen.walk().iter().map(|c| c.id.clone()).collect();
                let bound = ids_after(activity_text(&tree, s), "findViewById(R.id.", ')');
                prop_assert_eq!(&bound, &expected);

                let declared = ids_after(layout_text(&tree, s), "android:id=\"@+id/", '"');
                if expected.is_empty() {
                    prop_assert_eq!(declared, vec!["placeholder".to_string()]);
                } else {
                    prop_assert_eq!(declared, expected);
                }
            }
            Ok(())
        })
        .unwrap();
}

/// Same model, same tree
#[test]
fn test_generation_is_deterministic() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&screens_strategy(), |screens| {
            let model = build_model(&screens);
            prop_assert_eq!(generate(&model).unwrap(), generate(&model).unwrap());
            Ok(())
        })
        .unwrap();
}
