//! Project config file source: <project root>/laminate.toml

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::File;
use std::path::{Path, PathBuf};

pub const PROJECT_CONFIG_FILE: &str = "laminate.toml";

pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(PROJECT_CONFIG_FILE)
}

/// Add the project config file to builder if it exists.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    project_root: &Path,
) -> ConfigBuilder<DefaultState> {
    let path = project_config_path(project_root);
    if path.is_file() {
        builder.add_source(File::from(path).required(false))
    } else {
        builder
    }
}
