//! CI workflow definitions, one per build variant.

use super::skeleton::GRADLE_VERSION;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which binary the remote workflow produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowVariant {
    #[default]
    Debug,
    Release,
    Bundle,
}

impl WorkflowVariant {
    pub const ALL: [WorkflowVariant; 3] = [
        WorkflowVariant::Debug,
        WorkflowVariant::Release,
        WorkflowVariant::Bundle,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            WorkflowVariant::Debug => "debug",
            WorkflowVariant::Release => "release",
            WorkflowVariant::Bundle => "bundle",
        }
    }

    /// Workflow file name under `.github/workflows/`
    pub fn file_name(self) -> String {
        format!("apkforge-{}.yml", self.slug())
    }

    pub fn path(self) -> String {
        format!(".github/workflows/{}", self.file_name())
    }

    pub fn gradle_task(self) -> &'static str {
        match self {
            WorkflowVariant::Debug => "assembleDebug",
            WorkflowVariant::Release => "assembleRelease",
            WorkflowVariant::Bundle => "bundleRelease",
        }
    }

    pub fn artifact_name(self) -> &'static str {
        match self {
            WorkflowVariant::Debug => "app-debug",
            WorkflowVariant::Release => "app-release-unsigned",
            WorkflowVariant::Bundle => "app-release-bundle",
        }
    }

    fn output_glob(self) -> &'static str {
        match self {
            WorkflowVariant::Debug => "app/build/outputs/apk/debug/*.apk",
            WorkflowVariant::Release => "app/build/outputs/apk/release/*.apk",
            WorkflowVariant::Bundle => "app/build/outputs/bundle/release/*.aab",
        }
    }

    /// Render the GitHub Actions definition for this variant.
    pub fn render(self) -> String {
        format!(
            r#"name: apkforge {slug} build

on:
  workflow_dispatch:

jobs:
  build:
    runs-on: ubuntu-latest
    steps:
      - name: Checkout
        uses: actions/checkout@v4

      - name: Set up JDK 17
        uses: actions/setup-java@v4
        with:
          distribution: temurin
          java-version: '17'

      - name: Set up Gradle
        uses: gradle/actions/setup-gradle@v3
        with:
          gradle-version: '{gradle}'

      - name: Build {slug}
        run: gradle {task} --no-daemon --stacktrace

      - name: Upload artifact
        uses: actions/upload-artifact@v4
        with:
          name: {artifact}
          path: {glob}
          if-no-files-found: error
"#,
            slug = self.slug(),
            gradle = GRADLE_VERSION,
            task = self.gradle_task(),
            artifact = self.artifact_name(),
            glob = self.output_glob(),
        )
    }
}

impl fmt::Display for WorkflowVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for WorkflowVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkflowVariant::ALL
            .into_iter()
            .find(|v| v.slug().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown workflow variant '{}' (debug, release, bundle)", s))
    }
}
