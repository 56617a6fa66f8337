use crate::error::{Error, Result};

pub const RUN_TIME_PLACEHOLDER: &str = "{run_time}";

/// A coverage-id template split around its `{run_time}` placeholder.
///
/// The service names each coverage `<prefix><run_time><suffix>`; the same
/// split drives both directions: formatting an id for a known run, and
/// recovering the run from ids listed in a capabilities document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageIdTemplate {
    prefix: String,
    suffix: String,
}

impl CoverageIdTemplate {
    /// Parse a template string. The placeholder must occur exactly once and
    /// the prefix must be non-empty, otherwise ids cannot be matched
    /// unambiguously. An empty suffix is allowed (run-terminated ids).
    pub fn parse(template: &str) -> Result<Self> {
        let mut parts = template.split(RUN_TIME_PLACEHOLDER);
        let prefix = parts.next().unwrap_or_default();
        let Some(suffix) = parts.next() else {
            return Err(Error::InvalidTemplate(format!(
                "{template}: missing {RUN_TIME_PLACEHOLDER} placeholder"
            )));
        };
        if parts.next().is_some() {
            return Err(Error::InvalidTemplate(format!(
                "{template}: more than one {RUN_TIME_PLACEHOLDER} placeholder"
            )));
        }
        if prefix.is_empty() {
            return Err(Error::InvalidTemplate(format!(
                "{template}: empty prefix before {RUN_TIME_PLACEHOLDER}"
            )));
        }

        Ok(Self {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        })
    }

    /// Substitute a run timestamp into the template.
    pub fn format(&self, run_time: &str) -> String {
        format!("{}{}{}", self.prefix, run_time, self.suffix)
    }

    /// Recover the run timestamp from a concrete coverage id, or `None` if
    /// the id does not carry this template's prefix and suffix.
    pub fn extract<'a>(&self, coverage_id: &'a str) -> Option<&'a str> {
        let run = coverage_id
            .strip_prefix(&self.prefix)?
            .strip_suffix(&self.suffix)?;
        (!run.is_empty()).then_some(run)
    }
}
