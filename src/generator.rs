//! Project Generator
//!
//! Deterministic, side-effect-free transform from an [`AppModel`] to a complete Gradle
//! project tree. The model is validated in full before any file is produced, so a
//! [`GenerationError`] never comes with partial output.

use crate::error::GenerationError;
use crate::model::{AppModel, Screen};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use std::collections::HashSet;

mod layout;
mod naming;
mod skeleton;
mod source;
mod validate;
pub mod widgets;
pub mod workflow;

pub use naming::ScreenNames;
pub use workflow::WorkflowVariant;

/// How a file's content travels over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Plain,
    Base64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Text(String),
    Binary(Vec<u8>),
}

/// One file of the generated project, path relative to the repository root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectFile {
    pub path: String,
    pub content: FileContent,
}

impl ProjectFile {
    pub fn text(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: FileContent::Text(content.into()),
        }
    }

    pub fn binary(path: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            content: FileContent::Binary(content),
        }
    }

    pub fn encoding(&self) -> Encoding {
        match self.content {
            FileContent::Text(_) => Encoding::Plain,
            FileContent::Binary(_) => Encoding::Base64,
        }
    }

    /// Content as it is sent to the host: raw text, or base64 for binary files.
    pub fn encoded(&self) -> String {
        match &self.content {
            FileContent::Text(text) => text.clone(),
            FileContent::Binary(bytes) => STANDARD.encode(bytes),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match &self.content {
            FileContent::Text(text) => text.as_bytes(),
            FileContent::Binary(bytes) => bytes,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.content {
            FileContent::Text(text) => Some(text),
            FileContent::Binary(_) => None,
        }
    }
}

/// Ordered set of project files with pairwise-unique relative paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectTree {
    files: Vec<ProjectFile>,
}

impl ProjectTree {
    /// Build a tree, rejecting duplicate or non-relative paths.
    pub fn from_files(files: Vec<ProjectFile>) -> Result<Self, GenerationError> {
        let mut seen = HashSet::new();
        for file in &files {
            if !is_relative_path(&file.path) {
                return Err(GenerationError::InvalidPath(file.path.clone()));
            }
            if !seen.insert(file.path.as_str()) {
                return Err(GenerationError::DuplicatePath(file.path.clone()));
            }
        }
        Ok(Self { files })
    }

    pub fn files(&self) -> &[ProjectFile] {
        &self.files
    }

    pub fn get(&self, path: &str) -> Option<&ProjectFile> {
        self.files.iter().find(|f| f.path == path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn into_files(self) -> Vec<ProjectFile> {
        self.files
    }
}

fn is_relative_path(path: &str) -> bool {
    !path.is_empty()
        && !path.starts_with('/')
        && !path.ends_with('/')
        && path.split('/').all(|part| !part.is_empty() && part != "." && part != "..")
}

/// Generate the full project for `model`.
pub fn generate(model: &AppModel) -> Result<ProjectTree, GenerationError> {
    let names = validate::validate_model(model)?;

    let mut files = skeleton::skeleton_files(model, &names);
    for (screen, screen_names) in model.screens.iter().zip(&names) {
        files.push(layout_file(model, screen, screen_names));
        files.push(source_file(model, screen, screen_names, &names));
    }

    ProjectTree::from_files(files)
}

fn layout_file(model: &AppModel, screen: &Screen, names: &ScreenNames) -> ProjectFile {
    ProjectFile::text(
        format!("app/src/main/res/layout/{}.xml", names.layout),
        layout::render_layout(model, screen, names),
    )
}

fn source_file(
    model: &AppModel,
    screen: &Screen,
    names: &ScreenNames,
    all: &[ScreenNames],
) -> ProjectFile {
    ProjectFile::text(
        format!(
            "app/src/main/java/{}/{}.java",
            model.package.replace('.', "/"),
            names.class_name
        ),
        source::render_activity(model, screen, names, all),
    )
}
