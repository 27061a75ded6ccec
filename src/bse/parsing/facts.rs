use chrono::{Datelike, NaiveDate};
use roxmltree::{Document, Node};
use std::collections::HashMap;

use super::text::sanitize_value;
use super::types::{BroadcastRow, DocumentMeta, PerFactRow, Resolved, DEFAULT_CONTEXT, UNKNOWN};

// Marker elements the document-level metadata is read from. Matching is on
// tag local names; namespace use varies between filers.
pub const ENTITY_CODE_ELEMENT: &str = "ScripCode";
pub const FINANCIAL_YEAR_END_ELEMENT: &str = "DateOfEndOfFinancialYear";
pub const PERIOD_START_ELEMENT: &str = "DateOfStartOfReportingPeriod";
pub const PERIOD_END_ELEMENT: &str = "DateOfEndOfReportingPeriod";

fn find_by_local_name<'a, 'input>(
    doc: &'a Document<'input>,
    local_name: &str,
) -> Option<Node<'a, 'input>> {
    doc.root_element()
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == local_name)
}

fn text_of(doc: &Document, local_name: &str) -> Resolved {
    match find_by_local_name(doc, local_name) {
        Some(node) => Resolved::from_option(node.text()),
        None => Resolved::Missing,
    }
}

fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Fiscal quarter bucket for a calendar month. The numbering is shifted by
/// one quarter against the calendar year, matching the filer's fiscal
/// calendar (April starts Q1).
pub fn quarter_for_month(month: u32) -> Option<&'static str> {
    match month {
        1..=3 => Some("04"),
        4..=6 => Some("01"),
        7..=9 => Some("02"),
        10..=12 => Some("03"),
        _ => None,
    }
}

/// Resolve the document-level metadata once, before per-fact extraction.
/// Every field soft-fails independently: a missing marker element or an
/// unparseable date yields `Missing`, never an error.
pub fn resolve_metadata(doc: &Document) -> DocumentMeta {
    let period_start = text_of(doc, PERIOD_START_ELEMENT);
    let period_end = text_of(doc, PERIOD_END_ELEMENT);

    let financial_year = match text_of(doc, FINANCIAL_YEAR_END_ELEMENT) {
        Resolved::Found(value) => match parse_iso_date(&value) {
            Some(date) => Resolved::Found(date.year().to_string()),
            None => {
                log::warn!("unparseable financial year end date: {}", value);
                Resolved::Missing
            }
        },
        Resolved::Missing => Resolved::Missing,
    };

    let quarter = match &period_start {
        Resolved::Found(value) => match parse_iso_date(value)
            .and_then(|date| quarter_for_month(date.month()))
        {
            Some(quarter) => Resolved::Found(quarter.to_string()),
            None => {
                log::warn!("unparseable reporting period start date: {}", value);
                Resolved::Missing
            }
        },
        Resolved::Missing => Resolved::Missing,
    };

    DocumentMeta {
        company_code: text_of(doc, ENTITY_CODE_ELEMENT),
        financial_year,
        quarter,
        period_start,
        period_end,
    }
}

fn element_value(node: Node) -> Option<String> {
    node.text()
        .map(sanitize_value)
        .filter(|value| !value.is_empty())
}

/// One row per element in document order, structural elements included
/// (their value is null), with the document-level metadata broadcast to
/// every row. The iterator borrows the document; collecting it is cheap and
/// calling it again restarts the walk.
pub fn broadcast_rows<'a>(
    doc: &'a Document<'a>,
    meta: &'a DocumentMeta,
) -> impl Iterator<Item = BroadcastRow> + 'a {
    doc.root_element()
        .descendants()
        .filter(|n| n.is_element())
        .map(move |node| BroadcastRow {
            company_code: meta.company_code.or_unknown(),
            financial_year: meta.financial_year.or_unknown(),
            quarter: meta.quarter.or_unknown(),
            element_name: node.tag_name().name().to_string(),
            unit: node
                .attribute("contextRef")
                .unwrap_or(DEFAULT_CONTEXT)
                .to_string(),
            value: element_value(node),
            decimal: node.attribute("decimals").unwrap_or("").to_string(),
            period_start_date: meta.period_start.or_unknown(),
            period_end_date: meta.period_end.or_unknown(),
        })
}

/// Period strings per context id: `"<start> To <end>"` for a date range,
/// the instant date for an instant, nothing when the context carries no
/// usable dates.
fn context_periods(doc: &Document) -> HashMap<String, String> {
    let mut periods = HashMap::new();

    let context_nodes = doc
        .root_element()
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "context");

    for context in context_nodes {
        let Some(id) = context.attribute("id") else {
            continue;
        };
        let find = |name: &str| {
            context
                .descendants()
                .find(|n| n.is_element() && n.tag_name().name() == name)
                .and_then(|n| n.text())
                .map(|t| t.trim().to_string())
        };
        let period = match (find("startDate"), find("endDate")) {
            (Some(start), Some(end)) => Some(format!("{} To {}", start, end)),
            _ => find("instant"),
        };
        if let Some(period) = period {
            periods.insert(id.to_string(), period);
        }
    }

    periods
}

/// One row per element in document order, with the period resolved per fact
/// from the context it references. Facts without a context, or whose
/// context carries no dates, report an unknown period.
pub fn per_fact_rows<'a>(doc: &'a Document<'a>) -> impl Iterator<Item = PerFactRow> + 'a {
    let periods = context_periods(doc);

    doc.root_element()
        .descendants()
        .filter(|n| n.is_element())
        .map(move |node| {
            let context_ref = node.attribute("contextRef").unwrap_or("");
            PerFactRow {
                element_name: node.tag_name().name().to_string(),
                fact_value: element_value(node),
                period: periods
                    .get(context_ref)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN.to_string()),
                decimals: node.attribute("decimals").unwrap_or("").to_string(),
                unit: context_ref.to_string(),
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bse::parsing::document::parse_document;
    use crate::bse::parsing::types::unit_element_key;

    const FILING: &str = r#"<xbrli:xbrl xmlns:xbrli="http://www.xbrl.org/2003/instance" xmlns:in-bse="http://example.com/in-bse">
  <xbrli:context id="OneD">
    <xbrli:period>
      <xbrli:startDate>2023-04-01</xbrli:startDate>
      <xbrli:endDate>2023-06-30</xbrli:endDate>
    </xbrli:period>
  </xbrli:context>
  <xbrli:context id="OneI">
    <xbrli:period>
      <xbrli:instant>2023-06-30</xbrli:instant>
    </xbrli:period>
  </xbrli:context>
  <in-bse:ScripCode contextRef="OneD">500325</in-bse:ScripCode>
  <in-bse:DateOfStartOfReportingPeriod contextRef="OneD">2023-04-01</in-bse:DateOfStartOfReportingPeriod>
  <in-bse:DateOfEndOfReportingPeriod contextRef="OneD">2023-06-30</in-bse:DateOfEndOfReportingPeriod>
  <in-bse:DateOfEndOfFinancialYear contextRef="OneD">2024-03-31</in-bse:DateOfEndOfFinancialYear>
  <in-bse:Revenue contextRef="OneD" decimals="-3">1000</in-bse:Revenue>
  <in-bse:Assets contextRef="OneI">4000</in-bse:Assets>
</xbrli:xbrl>"#;

    #[test]
    fn test_quarter_for_month_buckets() {
        for (month, quarter) in [(1, "04"), (3, "04"), (4, "01"), (6, "01"), (7, "02"), (9, "02"), (10, "03"), (12, "03")] {
            assert_eq!(quarter_for_month(month), Some(quarter));
        }
        assert_eq!(quarter_for_month(13), None);
    }

    #[test]
    fn test_resolve_metadata() {
        let doc = parse_document(FILING).unwrap();
        let meta = resolve_metadata(&doc);
        assert_eq!(meta.company_code, Resolved::Found("500325".to_string()));
        assert_eq!(meta.financial_year, Resolved::Found("2024".to_string()));
        assert_eq!(meta.quarter, Resolved::Found("01".to_string()));
        assert_eq!(meta.period_start, Resolved::Found("2023-04-01".to_string()));
        assert_eq!(meta.period_end, Resolved::Found("2023-06-30".to_string()));
    }

    #[test]
    fn test_missing_markers_soft_fail() {
        let doc = parse_document("<xbrl><a>1</a></xbrl>").unwrap();
        let meta = resolve_metadata(&doc);
        assert_eq!(meta.company_code, Resolved::Missing);
        assert_eq!(meta.financial_year, Resolved::Missing);
        assert_eq!(meta.quarter, Resolved::Missing);
        assert_eq!(meta.period_start, Resolved::Missing);
        assert_eq!(meta.period_end, Resolved::Missing);
    }

    #[test]
    fn test_unparseable_date_soft_fails() {
        let doc = parse_document(
            "<xbrl><DateOfEndOfFinancialYear>soon</DateOfEndOfFinancialYear></xbrl>",
        )
        .unwrap();
        assert_eq!(resolve_metadata(&doc).financial_year, Resolved::Missing);
    }

    #[test]
    fn test_row_count_equals_element_count() {
        let doc = parse_document(FILING).unwrap();
        let meta = resolve_metadata(&doc);
        let element_count = doc
            .root_element()
            .descendants()
            .filter(|n| n.is_element())
            .count();
        assert_eq!(broadcast_rows(&doc, &meta).count(), element_count);
        assert_eq!(per_fact_rows(&doc).count(), element_count);
    }

    #[test]
    fn test_broadcast_metadata_is_shared_by_every_row() {
        let doc = parse_document(FILING).unwrap();
        let meta = resolve_metadata(&doc);
        let rows: Vec<_> = broadcast_rows(&doc, &meta).collect();
        assert!(rows.iter().all(|r| {
            r.company_code == "500325"
                && r.financial_year == "2024"
                && r.quarter == "01"
                && r.period_start_date == "2023-04-01"
                && r.period_end_date == "2023-06-30"
        }));
    }

    #[test]
    fn test_broadcast_revenue_scenario() {
        let doc = parse_document(FILING).unwrap();
        let meta = resolve_metadata(&doc);
        let rows: Vec<_> = broadcast_rows(&doc, &meta).collect();
        let revenue = rows.iter().find(|r| r.element_name == "Revenue").unwrap();
        assert_eq!(revenue.quarter, "01");
        assert_eq!(revenue.value.as_deref(), Some("1000"));
        assert_eq!(revenue.decimal, "-3");
        assert_eq!(revenue.unit, "OneD");
        assert_eq!(
            unit_element_key(&revenue.unit, &revenue.element_name),
            "OneD-Revenue"
        );
    }

    #[test]
    fn test_structural_elements_have_null_values() {
        let doc = parse_document(FILING).unwrap();
        let meta = resolve_metadata(&doc);
        let rows: Vec<_> = broadcast_rows(&doc, &meta).collect();
        let root = rows.iter().find(|r| r.element_name == "xbrl").unwrap();
        assert_eq!(root.value, None);
        // an element with no contextRef falls back to the sentinel context
        assert_eq!(root.unit, DEFAULT_CONTEXT);
    }

    #[test]
    fn test_per_fact_period_resolution() {
        let doc = parse_document(FILING).unwrap();
        let rows: Vec<_> = per_fact_rows(&doc).collect();

        let revenue = rows.iter().find(|r| r.element_name == "Revenue").unwrap();
        assert_eq!(revenue.period, "2023-04-01 To 2023-06-30");
        assert_eq!(revenue.unit, "OneD");
        assert_eq!(revenue.decimals, "-3");

        let assets = rows.iter().find(|r| r.element_name == "Assets").unwrap();
        assert_eq!(assets.period, "2023-06-30");

        // no contextRef at all: unknown period, empty unit
        let root = rows.iter().find(|r| r.element_name == "xbrl").unwrap();
        assert_eq!(root.period, UNKNOWN);
        assert_eq!(root.unit, "");
    }

    #[test]
    fn test_per_fact_unknown_context_reference() {
        let doc = parse_document(
            r#"<xbrl><Revenue contextRef="Nowhere">1</Revenue></xbrl>"#,
        )
        .unwrap();
        let rows: Vec<_> = per_fact_rows(&doc).collect();
        let revenue = rows.iter().find(|r| r.element_name == "Revenue").unwrap();
        assert_eq!(revenue.period, UNKNOWN);
    }
}
