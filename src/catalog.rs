use chrono::{DateTime, Utc};
use roxmltree::Document;

use crate::template::CoverageIdTemplate;
use crate::time::{format_run_time, parse_run_time};

pub const WCS_NS: &str = "http://www.opengis.net/wcs/2.0";

/// Find the most recent run advertised by a GetCapabilities document.
///
/// Coverage ids live in `wcs:CoverageSummary/wcs:CoverageId` elements; ids
/// matching the template's prefix and suffix contribute their run timestamp
/// and the chronologically latest one wins. An empty, malformed, or
/// unexpectedly shaped document means "no run published yet" and yields
/// `None` rather than an error.
pub(crate) fn latest_run_in_capabilities(
    xml: &str,
    template: &CoverageIdTemplate,
) -> Option<String> {
    let document = Document::parse(xml).ok()?;

    let mut latest: Option<DateTime<Utc>> = None;
    for node in document.descendants() {
        if !node.is_element()
            || node.tag_name().name() != "CoverageId"
            || node.tag_name().namespace() != Some(WCS_NS)
        {
            continue;
        }
        if !node
            .parent_element()
            .is_some_and(|p| p.tag_name().name() == "CoverageSummary")
        {
            continue;
        }

        let Some(coverage_id) = node.text() else {
            continue;
        };
        let Some(candidate) = template.extract(coverage_id.trim()) else {
            continue;
        };
        // Ids whose run portion does not parse are someone else's coverages.
        let Ok(run) = parse_run_time(candidate) else {
            continue;
        };

        if latest.is_none_or(|current| run > current) {
            latest = Some(run);
        }
    }

    latest.map(format_run_time)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capabilities(ids: &[&str]) -> String {
        let summaries: String = ids
            .iter()
            .map(|id| {
                format!(
                    "<wcs:CoverageSummary><wcs:CoverageId>{id}</wcs:CoverageId></wcs:CoverageSummary>"
                )
            })
            .collect();
        format!(
            r#"<wcs:Capabilities xmlns:wcs="http://www.opengis.net/wcs/2.0"
                xmlns:ows="http://www.opengis.net/ows/2.0" version="2.0.1">
                <wcs:Contents>{summaries}</wcs:Contents>
            </wcs:Capabilities>"#
        )
    }

    fn rain_template() -> CoverageIdTemplate {
        CoverageIdTemplate::parse("RAIN___{run_time}").unwrap()
    }

    #[test]
    fn picks_chronologically_latest_match() {
        let xml = capabilities(&[
            "RAIN___2024-11-17T09.00.00Z",
            "RAIN___2024-11-17T15.00.00Z",
            "RAIN___2024-11-17T12.00.00Z",
            "WIND___2024-11-17T18.00.00Z",
        ]);
        assert_eq!(
            latest_run_in_capabilities(&xml, &rain_template()),
            Some("2024-11-17T15.00.00Z".to_string())
        );
    }

    #[test]
    fn no_match_yields_none() {
        let xml = capabilities(&["WIND___2024-11-17T18.00.00Z"]);
        assert_eq!(latest_run_in_capabilities(&xml, &rain_template()), None);
    }

    #[test]
    fn empty_and_malformed_documents_yield_none() {
        assert_eq!(
            latest_run_in_capabilities(&capabilities(&[]), &rain_template()),
            None
        );
        assert_eq!(
            latest_run_in_capabilities("<wcs:Capabilities", &rain_template()),
            None
        );
        assert_eq!(latest_run_in_capabilities("", &rain_template()), None);
    }

    #[test]
    fn unparseable_run_portions_are_skipped() {
        let xml = capabilities(&[
            "RAIN___not-a-timestamp",
            "RAIN___2024-11-17T09.00.00Z",
        ]);
        assert_eq!(
            latest_run_in_capabilities(&xml, &rain_template()),
            Some("2024-11-17T09.00.00Z".to_string())
        );
    }

    #[test]
    fn ignores_ids_outside_coverage_summaries() {
        let xml = r#"<wcs:Capabilities xmlns:wcs="http://www.opengis.net/wcs/2.0">
            <wcs:CoverageId>RAIN___2024-11-17T15.00.00Z</wcs:CoverageId>
        </wcs:Capabilities>"#;
        assert_eq!(latest_run_in_capabilities(xml, &rain_template()), None);
    }

    #[test]
    fn ignores_ids_in_foreign_namespaces() {
        let xml = r#"<Capabilities xmlns="urn:other">
            <CoverageSummary><CoverageId>RAIN___2024-11-17T15.00.00Z</CoverageId></CoverageSummary>
        </Capabilities>"#;
        assert_eq!(latest_run_in_capabilities(xml, &rain_template()), None);
    }
}
