//! JSON bundle of one analysis for downstream plotting.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::error::Result;
use crate::filter::{score_to_hex, visible_rows, FilterSpec, PlotBounds, Selection};
use crate::lexicon::SortOrder;
use crate::model::{Coords, Row, Sentiment};
use crate::pipeline::Snapshot;

pub const BUNDLE_FILES: [&str; 4] = ["rows.json", "frequency.json", "plot.json", "summary.json"];

#[derive(Serialize)]
struct ExportRow<'a> {
    key: String,
    id: i64,
    sentence_index: usize,
    text: &'a str,
    stakeholder: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    coords: Option<Coords>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sentiment: Option<&'a Sentiment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    roots: Option<&'a [String]>,
}

impl<'a> From<&'a Row> for ExportRow<'a> {
    fn from(row: &'a Row) -> Self {
        Self {
            key: row.key().to_string(),
            id: row.id,
            sentence_index: row.sentence_index,
            text: &row.text,
            stakeholder: &row.stakeholder,
            coords: row.coords,
            sentiment: row.sentiment.as_ref(),
            roots: row.roots.as_deref(),
        }
    }
}

#[derive(Serialize)]
struct PlotPoint<'a> {
    key: String,
    x: f32,
    y: f32,
    stakeholder: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    /// Sentiment confidence as a hex alpha byte
    #[serde(skip_serializing_if = "Option::is_none")]
    alpha: Option<String>,
}

#[derive(Serialize)]
struct Frequency {
    min_count: usize,
    distinct_roots: usize,
    total_roots: usize,
    by_count: Vec<(String, usize)>,
    alphabetical: Vec<(String, usize)>,
}

fn write_json<P: AsRef<Path>, T: ?Sized + Serialize>(path: P, value: &T) -> Result<()> {
    fs::write(path, serde_json::to_vec_pretty(value)?)?;
    Ok(())
}

/// Write the bundle for `snapshot` into `dir`, rows restricted by `filter`
/// and, when non-empty, by `selection`.
pub fn write_bundle(
    dir: &Path,
    snapshot: &Snapshot,
    filter: &FilterSpec,
    selection: &Selection,
    min_count: usize,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let rows = visible_rows(&snapshot.rows, filter, selection);

    let exported: Vec<ExportRow> = rows.iter().map(|r| ExportRow::from(*r)).collect();
    write_json(dir.join("rows.json"), &exported)?;

    let table = &snapshot.frequency;
    let frequency = Frequency {
        min_count,
        distinct_roots: table.len(),
        total_roots: table.total(),
        by_count: table.display(min_count, SortOrder::Count),
        alphabetical: table.display(min_count, SortOrder::Alpha),
    };
    write_json(dir.join("frequency.json"), &frequency)?;

    let points: Vec<PlotPoint> = rows
        .iter()
        .filter_map(|r| {
            r.coords.map(|c| PlotPoint {
                key: r.key().to_string(),
                x: c.x,
                y: c.y,
                stakeholder: &r.stakeholder,
                label: r.sentiment.as_ref().map(Sentiment::normalized_label),
                alpha: r.sentiment.as_ref().map(|s| score_to_hex(s.score)),
            })
        })
        .collect();
    let bounds = PlotBounds::from_points(rows.iter().filter_map(|r| r.coords));
    write_json(dir.join("plot.json"), &json!({ "bounds": bounds, "points": points }))?;

    let summary = json!({
        "generated_at": Utc::now().to_rfc3339(),
        "generation": snapshot.generation,
        "status": snapshot.status,
        "rows": snapshot.rows.len(),
        "filtered_rows": rows.len(),
        "merges": snapshot.merges,
        "stakeholders": snapshot.stakeholders,
        "filter": filter,
        "selected": selection.len(),
        "parse": snapshot.parse_report,
        "error": snapshot.error,
        "sentiment_error": snapshot.sentiment_error,
        "files": BUNDLE_FILES,
    });
    write_json(dir.join("summary.json"), &summary)?;

    info!(
        "Export completed - dir={}, rows={}, points={}",
        dir.display(),
        rows.len(),
        points.len()
    );
    Ok(BUNDLE_FILES.iter().map(|f| dir.join(f)).collect())
}
