//! Fixed project skeleton: Gradle scripts, wrapper properties, manifest, resources.

use super::layout::escape_attr;
use super::naming::ScreenNames;
use super::ProjectFile;
use crate::model::AppModel;
use std::fmt::Write;

pub(crate) const COMPILE_SDK: u32 = 34;
pub(crate) const ANDROID_GRADLE_PLUGIN: &str = "8.2.2";
pub(crate) const GRADLE_VERSION: &str = "8.5";

/// 1x1 PNG used as the launcher icon.
const LAUNCHER_ICON_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x04, 0x00, 0x00, 0x00, 0xb5,
    0x1c, 0x0c, 0x02, 0x00, 0x00, 0x00, 0x0b, 0x49, 0x44, 0x41, 0x54, 0x78, 0xda, 0x63, 0x64,
    0x60, 0x00, 0x00, 0x00, 0x06, 0x00, 0x02, 0x30, 0x81, 0xd0, 0x2f, 0x00, 0x00, 0x00, 0x00,
    0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

pub(crate) fn skeleton_files(model: &AppModel, screens: &[ScreenNames]) -> Vec<ProjectFile> {
    vec![
        ProjectFile::text("settings.gradle", settings_gradle(model)),
        ProjectFile::text("build.gradle", root_build_gradle()),
        ProjectFile::text("gradle.properties", GRADLE_PROPERTIES),
        ProjectFile::text(
            "gradle/wrapper/gradle-wrapper.properties",
            wrapper_properties(),
        ),
        ProjectFile::text(".gitignore", GITIGNORE),
        ProjectFile::text("app/build.gradle", app_build_gradle(model)),
        ProjectFile::text("app/proguard-rules.pro", "# Project specific ProGuard rules.\n"),
        ProjectFile::text("app/src/main/AndroidManifest.xml", manifest(screens)),
        ProjectFile::text("app/src/main/res/values/strings.xml", strings_xml(model)),
        ProjectFile::text("app/src/main/res/values/colors.xml", colors_xml(model)),
        ProjectFile::text("app/src/main/res/values/themes.xml", THEMES_XML),
        ProjectFile::binary(
            "app/src/main/res/mipmap-mdpi/ic_launcher.png",
            LAUNCHER_ICON_PNG.to_vec(),
        ),
    ]
}

fn groovy_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn settings_gradle(model: &AppModel) -> String {
    format!(
        r#"pluginManagement {{
    repositories {{
        google()
        mavenCentral()
        gradlePluginPortal()
    }}
}}
dependencyResolutionManagement {{
    repositoriesMode.set(RepositoriesMode.FAIL_ON_PROJECT_REPOS)
    repositories {{
        google()
        mavenCentral()
    }}
}}
rootProject.name = '{}'
include ':app'
"#,
        groovy_string(&model.name)
    )
}

fn root_build_gradle() -> String {
    format!(
        "plugins {{\n    id 'com.android.application' version '{}' apply false\n}}\n",
        ANDROID_GRADLE_PLUGIN
    )
}

const GRADLE_PROPERTIES: &str = "org.gradle.jvmargs=-Xmx2048m -Dfile.encoding=UTF-8
android.useAndroidX=true
android.nonTransitiveRClass=true
";

fn wrapper_properties() -> String {
    format!(
        "distributionBase=GRADLE_USER_HOME
distributionPath=wrapper/dists
distributionUrl=https\\://services.gradle.org/distributions/gradle-{}-bin.zip
zipStoreBase=GRADLE_USER_HOME
zipStorePath=wrapper/dists
",
        GRADLE_VERSION
    )
}

const GITIGNORE: &str = "*.iml
.gradle
/local.properties
.idea/
build/
";

fn app_build_gradle(model: &AppModel) -> String {
    format!(
        r#"plugins {{
    id 'com.android.application'
}}

android {{
    namespace '{package}'
    compileSdk {sdk}

    defaultConfig {{
        applicationId '{package}'
        minSdk {min_sdk}
        targetSdk {sdk}
        versionCode {version_code}
        versionName '{version_name}'
    }}

    buildTypes {{
        release {{
            minifyEnabled false
            proguardFiles getDefaultProguardFile('proguard-android-optimize.txt'), 'proguard-rules.pro'
        }}
    }}

    compileOptions {{
        sourceCompatibility JavaVersion.VERSION_17
        targetCompatibility JavaVersion.VERSION_17
    }}
}}

dependencies {{
    implementation 'androidx.appcompat:appcompat:1.6.1'
    implementation 'com.google.android.material:material:1.11.0'
}}
"#,
        package = model.package,
        sdk = COMPILE_SDK,
        min_sdk = model.min_sdk,
        version_code = model.version_code,
        version_name = groovy_string(&model.version_name),
    )
}

fn manifest(screens: &[ScreenNames]) -> String {
    let mut out = String::from(
        r#"<?xml version="1.0" encoding="utf-8"?>
<manifest xmlns:android="http://schemas.android.com/apk/res/android">

    <application
        android:allowBackup="true"
        android:icon="@mipmap/ic_launcher"
        android:label="@string/app_name"
        android:supportsRtl="true"
        android:theme="@style/Theme.App">
"#,
    );
    for (index, screen) in screens.iter().enumerate() {
        if index == 0 {
            let _ = writeln!(
                out,
                r#"        <activity
            android:name=".{}"
            android:exported="true">
            <intent-filter>
                <action android:name="android.intent.action.MAIN" />
                <category android:name="android.intent.category.LAUNCHER" />
            </intent-filter>
        </activity>"#,
                screen.class_name
            );
        } else {
            let _ = writeln!(
                out,
                r#"        <activity
            android:name=".{}"
            android:exported="false" />"#,
                screen.class_name
            );
        }
    }
    out.push_str("    </application>\n\n</manifest>\n");
    out
}

fn strings_xml(model: &AppModel) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<resources>\n    <string name=\"app_name\">{}</string>\n</resources>\n",
        escape_attr(&super::layout::android_text(&model.name))
    )
}

fn colors_xml(model: &AppModel) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<resources>
    <color name="primary">{}</color>
    <color name="primary_dark">{}</color>
    <color name="accent">{}</color>
</resources>
"#,
        model.theme.primary, model.theme.primary_dark, model.theme.accent
    )
}

const THEMES_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<resources>
    <style name="Theme.App" parent="Theme.MaterialComponents.DayNight.DarkActionBar">
        <item name="colorPrimary">@color/primary</item>
        <item name="colorPrimaryVariant">@color/primary_dark</item>
        <item name="colorSecondary">@color/accent</item>
    </style>
</resources>
"#;
