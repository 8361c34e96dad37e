// The JSON summary of a survey.

use std::fs;

use log::{debug, info, warn};
use serde_json::json;
use serde_json::Value as JSValue;
use snafu::prelude::*;
use survey_store::results::{survey_results, survey_stats};
use survey_store::Snapshot;
use text_diff::print_diff;

use crate::survey::*;

pub fn build_summary_js(settings: &Settings, snapshot: &Snapshot) -> JSValue {
    json!({
        "survey": settings.survey_name,
        "stats": survey_stats(snapshot),
        "results": survey_results(snapshot),
    })
}

pub fn read_summary(path: &str) -> CliResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    debug!("read content: {:?}", contents);
    serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })
}

/// Fails if the summary differs from the reference file. The differences are printed.
pub fn check_reference(pretty_summary: &str, reference_path: &str) -> CliResult<()> {
    let summary_ref = read_summary(reference_path)?;
    info!("summary: {:?}", summary_ref);
    let pretty_ref = serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {
        path: reference_path,
    })?;
    if pretty_ref != pretty_summary {
        warn!("Found differences with the reference summary");
        print_diff(pretty_ref.as_str(), pretty_summary, "\n");
        whatever!("Difference detected between the computed summary and {}", reference_path)
    }
    Ok(())
}
