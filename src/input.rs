//! Tab-separated survey input: `id<TAB>text<TAB>stakeholder`, one response per line.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{AnalysisError, Result};
use crate::model::Row;
use crate::segment::Segmenter;

/// One raw survey response before segmentation.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub id: i64,
    pub text: String,
    pub stakeholder: String,
}

/// A line that was left out of the analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedLine {
    /// 1-based line number in the submitted text
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseReport {
    pub accepted: usize,
    pub skipped: Vec<SkippedLine>,
}

/// Parse raw input into responses.
///
/// Malformed lines (missing fields, non-integer id, empty text) are skipped
/// and listed in the report; blank lines are ignored. A repeated id is kept
/// and only logged. Input with no usable line is an error.
pub fn parse_responses(raw: &str) -> Result<(Vec<Response>, ParseReport)> {
    let mut responses = Vec::new();
    let mut report = ParseReport::default();
    let mut seen_ids = HashSet::new();

    for (idx, line) in raw.lines().enumerate() {
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }

        match parse_line(line, line_no) {
            Ok(resp) => {
                if !seen_ids.insert(resp.id) {
                    warn!("Line {} repeats response id {}", line_no, resp.id);
                }
                responses.push(resp);
            }
            Err(AnalysisError::MalformedLine { line, reason }) => {
                warn!("Skipping line {}: {}", line, reason);
                report.skipped.push(SkippedLine { line, reason });
            }
            Err(e) => return Err(e),
        }
    }

    if responses.is_empty() {
        return Err(AnalysisError::EmptyInput);
    }

    report.accepted = responses.len();
    debug!(
        "Parsed input - accepted={}, skipped={}",
        report.accepted,
        report.skipped.len()
    );
    Ok((responses, report))
}

fn parse_line(line: &str, line_no: usize) -> Result<Response> {
    let malformed = |reason: &str| AnalysisError::MalformedLine {
        line: line_no,
        reason: reason.to_string(),
    };

    let mut fields = line.trim_end_matches('\r').split('\t');
    let (id, text, stakeholder) = match (fields.next(), fields.next(), fields.next()) {
        (Some(id), Some(text), Some(stakeholder)) => (id, text, stakeholder),
        _ => return Err(malformed("expected 3 tab-separated fields (id, text, stakeholder)")),
    };

    let id: i64 = id
        .trim()
        .parse()
        .map_err(|_| malformed(&format!("response id '{}' is not an integer", id.trim())))?;

    let text = text.trim();
    if text.is_empty() {
        return Err(malformed("response text is empty"));
    }

    Ok(Response {
        id,
        text: text.to_string(),
        stakeholder: stakeholder.trim().to_string(),
    })
}

/// Split each response into sentence rows, numbering sentences from zero.
///
/// Numbering continues across lines sharing an id, so `(id, sentence_index)`
/// stays unique.
pub fn segment_responses(responses: &[Response], segmenter: &dyn Segmenter) -> Vec<Row> {
    let mut rows = Vec::new();
    let mut next_index: HashMap<i64, usize> = HashMap::new();
    for resp in responses {
        let index = next_index.entry(resp.id).or_insert(0);
        for sentence in segmenter.segment(&resp.text) {
            rows.push(Row::new(resp.id, *index, sentence.trim(), resp.stakeholder.trim()));
            *index += 1;
        }
    }
    rows
}

/// Parse and segment in one step.
pub fn parse_rows(raw: &str, segmenter: &dyn Segmenter) -> Result<(Vec<Row>, ParseReport)> {
    let (responses, report) = parse_responses(raw)?;
    let rows = segment_responses(&responses, segmenter);
    if rows.is_empty() {
        return Err(AnalysisError::EmptyInput);
    }
    Ok((rows, report))
}
