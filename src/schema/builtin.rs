// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The chart options schema bundled with the crate.

use crate::schema::{SchemaError, SchemaSet};
use crate::Rc;

const CHART_OPTIONS_JSON: &str = include_str!("../../schemas/chart-options.json");

lazy_static::lazy_static! {
    static ref CHART_OPTIONS: Result<Rc<SchemaSet>, SchemaError> =
        SchemaSet::from_json_str(CHART_OPTIONS_JSON).map(Rc::new);
}

/// Raw JSON text of the bundled schema.
pub fn chart_options_json() -> &'static str {
    CHART_OPTIONS_JSON
}

/// The bundled schema set, loaded and frozen on first use.
///
/// Definitions are named after the option they describe, for example
/// `series.pie`, `drilldown` or `navigation`.
pub fn chart_options() -> Result<Rc<SchemaSet>, SchemaError> {
    CHART_OPTIONS.clone()
}
