//! Shared fixtures: a module loader over JSON "module images" so the whole
//! pipeline can run without building shared libraries.

#![allow(dead_code)]

use anvil::config::Config;
use anvil::plugins::{
    EmbeddedResource, Import, LoadContext, LoadError, ModuleImage, ModuleLoader, Route,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Deserialize)]
struct JsonModule {
    name: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    imports: Vec<Import>,
    #[serde(default)]
    routes: Vec<Route>,
    #[serde(default)]
    resources: BTreeMap<String, String>,
}

/// Reads modules written as JSON and resolves their imports through the context
pub struct JsonModuleLoader;

impl ModuleLoader for JsonModuleLoader {
    fn load(&self, path: &Path, context: &mut LoadContext) -> Result<ModuleImage, LoadError> {
        let text =
            fs::read_to_string(path).map_err(|_| LoadError::FileNotFound(path.to_path_buf()))?;
        let module: JsonModule =
            serde_json::from_str(&text).map_err(|e| LoadError::IncompatibleFormat {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        for import in &module.imports {
            match import {
                Import::Managed(request) => context.resolve(request)?,
                Import::Native { name } => context.resolve_native(name)?,
            };
        }

        Ok(ModuleImage {
            name: module.name,
            version: module.version,
            imports: module.imports,
            routes: module.routes,
            resources: module
                .resources
                .into_iter()
                .map(|(path, body)| EmbeddedResource {
                    path,
                    bytes: body.into_bytes(),
                })
                .collect(),
        })
    }
}

pub fn write(dir: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

/// Config scanning `dir` for `rcl_*.mod`, serving host files from `dir/wwwroot`
pub fn config_for(dir: &Path) -> Config {
    let mut config = Config::default();
    config.plugins.directory = Some(dir.to_path_buf());
    config.plugins.extension = "mod".to_string();
    config.plugins.system_search = false;
    config.resources.web_root = Some(dir.join("wwwroot"));
    config
}
