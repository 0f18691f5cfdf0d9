//! `${VAR}` and `${VAR:-default}` references in config strings.
//!
//! Bare `$VAR` is left as written. A braced reference to an unset variable
//! without a default fails with the variable's name.

use std::env::VarError;

use crate::ConfigError;

/// A config string that may contain `${VAR}` references, tagged with the
/// dotted field name reported on failure.
pub(crate) struct Field<'a> {
    pub(crate) name: &'static str,
    pub(crate) value: &'a mut String,
}

impl<'a> Field<'a> {
    pub(crate) fn new(name: &'static str, value: &'a mut String) -> Self {
        Self { name, value }
    }
}

/// Expand every field in place. Stops at the first unset variable.
pub(crate) fn expand_fields<'a>(
    fields: impl IntoIterator<Item = Field<'a>>,
    lookup: impl Fn(&str) -> Result<String, VarError>,
) -> Result<(), ConfigError> {
    for Field { name, value } in fields {
        if !value.contains("${") {
            continue;
        }
        let expanded = shellexpand::env_with_context(value.as_str(), |var| match lookup(var) {
            Ok(found) => Ok(Some(found)),
            Err(_) => Err(var.to_owned()),
        })
        .map_err(|e| ConfigError::EnvVar {
            field: name,
            var: e.cause,
        })?;
        *value = expanded.into_owned();
    }
    Ok(())
}
