use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::args::Args;
use crate::survey::*;

pub const DEFAULT_STORE_PATH: &str = "survey-store.json";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_SURVEY_NAME: &str = "Survey";

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurveyConfig {
    #[serde(rename = "storePath")]
    pub store_path: Option<String>,
    #[serde(rename = "baseUrl")]
    pub base_url: Option<String>,
    #[serde(rename = "surveyName")]
    pub survey_name: Option<String>,
}

/// The resolved settings of a run.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Settings {
    pub store_path: PathBuf,
    pub base_url: String,
    pub survey_name: String,
}

pub fn read_config(path: &str) -> CliResult<SurveyConfig> {
    let contents = fs::read_to_string(path).context(OpeningConfigSnafu { path })?;
    debug!("read config: {:?}", contents);
    serde_json::from_str(&contents).context(ParsingConfigSnafu { path })
}

/// Merges the command line, the config file and the defaults, in that order of priority.
///
/// A relative store path from the config file is relative to the directory of that file.
pub fn resolve_settings(args: &Args, config: Option<(&Path, SurveyConfig)>) -> Settings {
    let (root, config) = match config {
        Some((path, c)) => (path.parent().map(|p| p.to_path_buf()), c),
        None => (None, SurveyConfig::default()),
    };
    let store_path = match (&args.store, &config.store_path) {
        (Some(p), _) => PathBuf::from(p),
        (None, Some(p)) => match &root {
            Some(r) => r.join(p),
            None => PathBuf::from(p),
        },
        (None, None) => PathBuf::from(DEFAULT_STORE_PATH),
    };
    Settings {
        store_path,
        base_url: args
            .base_url
            .clone()
            .or(config.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        survey_name: config
            .survey_name
            .unwrap_or_else(|| DEFAULT_SURVEY_NAME.to_string()),
    }
}

pub fn load_settings(args: &Args) -> CliResult<Settings> {
    let settings = match &args.config {
        Some(path) => {
            let config = read_config(path)?;
            resolve_settings(args, Some((Path::new(path), config)))
        }
        None => resolve_settings(args, None),
    };
    info!("settings: {:?}", settings);
    Ok(settings)
}
