use chrono::{DateTime, Duration, Utc};
use roxmltree::{Document, Node};

use crate::error::{Error, Result};
use crate::time::{format_subset_time, parse_subset_time};

pub const GML_NS: &str = "http://www.opengis.net/gml/3.2";

/// Closed interval of forecast hours retrievable for one run, `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverageWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CoverageWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end < start {
            return Err(Error::InvalidWindow {
                start: format_subset_time(start),
                end: format_subset_time(end),
            });
        }
        Ok(Self { start, end })
    }

    /// Static resolution: offset both window boundaries from the run time by
    /// whole hours, no network round trip.
    pub fn from_offsets(run: DateTime<Utc>, offsets: [i64; 2]) -> Result<Self> {
        Self::new(
            run + Duration::hours(offsets[0]),
            run + Duration::hours(offsets[1]),
        )
    }

    /// Hourly subset times, start to end inclusive, in increasing order.
    pub fn hours(&self) -> Hours {
        Hours {
            next: Some(self.start),
            end: self.end,
        }
    }

    pub fn hour_count(&self) -> usize {
        ((self.end - self.start).num_hours() + 1) as usize
    }
}

#[derive(Debug, Clone)]
pub struct Hours {
    next: Option<DateTime<Utc>>,
    end: DateTime<Utc>,
}

impl Iterator for Hours {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = Some(current + Duration::hours(1)).filter(|n| *n <= self.end);
        Some(current)
    }
}

/// Dynamic resolution: read the window out of a DescribeCoverage response.
///
/// The time period lives in a `gml:EnvelopeWithTimePeriod` element with
/// `beginPosition`/`endPosition` children. A response without that envelope
/// means the service does not know the coverage id, typically because the
/// run never existed or has expired.
pub(crate) fn window_from_description(xml: &str, coverage_id: &str) -> Result<CoverageWindow> {
    let document = Document::parse(xml)?;

    let envelope = document
        .descendants()
        .find(|n| {
            n.is_element()
                && n.tag_name().name() == "EnvelopeWithTimePeriod"
                && n.tag_name().namespace() == Some(GML_NS)
        })
        .ok_or_else(|| Error::MissingTimePeriod {
            coverage_id: coverage_id.to_string(),
        })?;

    let begin = position_text(envelope, "beginPosition", coverage_id)?;
    let end = position_text(envelope, "endPosition", coverage_id)?;

    CoverageWindow::new(parse_subset_time(begin)?, parse_subset_time(end)?)
}

fn position_text<'a>(
    envelope: Node<'a, '_>,
    name: &str,
    coverage_id: &str,
) -> Result<&'a str> {
    envelope
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
        .and_then(|n| n.text())
        .ok_or_else(|| Error::MissingTimePeriod {
            coverage_id: coverage_id.to_string(),
        })
}
