//! Model validation. Runs to completion before any file is emitted.

use super::naming::{is_java_identifier, ScreenNames};
use crate::error::GenerationError;
use crate::model::{AppModel, Component, ComponentKind};
use std::collections::{HashMap, HashSet};

/// Names already bound inside a generated `onCreate`; a field with one of these
/// names would shadow the resource class or be shadowed by the parameter.
const RESERVED_COMPONENT_IDS: [&str; 2] = ["R", "savedInstanceState"];

/// Validate `model` and return the derived names for each screen, in screen order.
pub(crate) fn validate_model(model: &AppModel) -> Result<Vec<ScreenNames>, GenerationError> {
    validate_package(&model.package)?;
    validate_color("theme.primary", &model.theme.primary)?;
    validate_color("theme.primary_dark", &model.theme.primary_dark)?;
    validate_color("theme.accent", &model.theme.accent)?;

    if model.screens.is_empty() {
        return Err(GenerationError::NoScreens);
    }

    let mut names = Vec::with_capacity(model.screens.len());
    let mut by_class: HashMap<String, &str> = HashMap::new();
    for screen in &model.screens {
        if screen.name.trim().is_empty() {
            return Err(GenerationError::EmptyScreenName(screen.id.clone()));
        }
        let screen_names = ScreenNames::from_screen_name(&screen.name);
        if let Some(first) = by_class.insert(screen_names.class_name.clone(), screen.name.as_str()) {
            return Err(GenerationError::DuplicateScreen {
                first: first.to_string(),
                second: screen.name.clone(),
                class_name: screen_names.class_name,
            });
        }
        names.push(screen_names);
    }

    for screen in &model.screens {
        let mut ids = HashSet::new();
        for component in screen.walk() {
            if !is_java_identifier(&component.id) {
                return Err(GenerationError::InvalidComponentId {
                    screen: screen.name.clone(),
                    id: component.id.clone(),
                });
            }
            if RESERVED_COMPONENT_IDS.contains(&component.id.as_str()) {
                return Err(GenerationError::ReservedComponentId {
                    screen: screen.name.clone(),
                    id: component.id.clone(),
                });
            }
            if !ids.insert(component.id.as_str()) {
                return Err(GenerationError::DuplicateComponentId {
                    screen: screen.name.clone(),
                    id: component.id.clone(),
                });
            }
            validate_children(&screen.name, component)?;
            validate_component_colors(&screen.name, component)?;
            if let Some(target) = &component.properties.navigate_to {
                if !model.screens.iter().any(|s| &s.name == target) {
                    return Err(GenerationError::UnknownNavigationTarget {
                        screen: screen.name.clone(),
                        id: component.id.clone(),
                        target: target.clone(),
                    });
                }
            }
        }
    }

    Ok(names)
}

/// At least two dot-separated segments, each a Java identifier.
pub(crate) fn validate_package(package: &str) -> Result<(), GenerationError> {
    let segments: Vec<&str> = package.split('.').collect();
    if segments.len() < 2 || !segments.iter().all(|s| is_java_identifier(s)) {
        return Err(GenerationError::InvalidPackage(package.to_string()));
    }
    Ok(())
}

pub(crate) fn validate_color(field: &str, value: &str) -> Result<(), GenerationError> {
    let valid = value
        .strip_prefix('#')
        .map(|hex| (hex.len() == 6 || hex.len() == 8) && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false);
    if valid {
        Ok(())
    } else {
        Err(GenerationError::InvalidColor {
            field: field.to_string(),
            value: value.to_string(),
        })
    }
}

fn validate_children(screen: &str, component: &Component) -> Result<(), GenerationError> {
    if component.children.is_empty() {
        return Ok(());
    }
    if !component.kind.is_container() {
        return Err(GenerationError::ChildrenOnLeaf {
            screen: screen.to_string(),
            id: component.id.clone(),
            kind: format!("{:?}", component.kind),
        });
    }
    if component.kind == ComponentKind::ScrollView && component.children.len() > 1 {
        return Err(GenerationError::ScrollViewChildren {
            screen: screen.to_string(),
            id: component.id.clone(),
            count: component.children.len(),
        });
    }
    Ok(())
}

fn validate_component_colors(screen: &str, component: &Component) -> Result<(), GenerationError> {
    let props = &component.properties;
    if let Some(color) = &props.text_color {
        validate_color(&format!("{}/{}.text_color", screen, component.id), color)?;
    }
    if let Some(color) = &props.background_color {
        validate_color(&format!("{}/{}.background_color", screen, component.id), color)?;
    }
    Ok(())
}
