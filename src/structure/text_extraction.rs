use serde::{Deserialize, Serialize};

use crate::provider::TextRun;

/// A cluster of text runs whose vertical centers fall within the grouping
/// tolerance, ordered top-to-bottom, left-to-right within a row band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Line {
    pub index: usize,
    pub text: String,
    pub x_min: f32,
    pub x_max: f32,
    pub y_min: f32,
    pub y_max: f32,
    /// Median run height, robust against stray superscripts and footnote
    /// marks on the line.
    pub height: f32,
}

impl Line {
    pub fn mid_y(&self) -> f32 {
        (self.y_min + self.y_max) / 2.0
    }
}

/// Groups raw runs into [`Line`]s with a single sweep over runs sorted by
/// y: a run joins the current line while its y stays within `tol_y` of the
/// line's anchor y, otherwise it starts a new line.
pub fn group_runs_into_lines(runs: &[TextRun], tol_y: f32) -> Vec<Line> {
    let mut items: Vec<&TextRun> = runs.iter().filter(|r| !r.text.trim().is_empty()).collect();
    if items.is_empty() {
        return Vec::new();
    }
    items.sort_by(|a, b| a.y.total_cmp(&b.y));

    let mut clusters: Vec<Vec<&TextRun>> = Vec::new();
    let mut current: Vec<&TextRun> = Vec::new();
    let mut anchor_y: Option<f32> = None;

    for run in items {
        match anchor_y {
            Some(y) if (run.y - y).abs() > tol_y => {
                clusters.push(std::mem::take(&mut current));
                current.push(run);
                anchor_y = Some(run.y);
            }
            Some(_) => current.push(run),
            None => {
                current.push(run);
                anchor_y = Some(run.y);
            }
        }
    }
    if !current.is_empty() {
        clusters.push(current);
    }

    let mut lines: Vec<Line> = clusters
        .iter()
        .map(|cluster| {
            let mut sorted: Vec<&&TextRun> = cluster.iter().collect();
            sorted.sort_by(|a, b| a.x.total_cmp(&b.x));

            let y_min = cluster.iter().map(|r| r.y).fold(f32::INFINITY, f32::min);
            let y_max = cluster
                .iter()
                .map(|r| r.y)
                .fold(f32::NEG_INFINITY, f32::max);
            let x_min = cluster.iter().map(|r| r.x).fold(f32::INFINITY, f32::min);
            let x_max = cluster
                .iter()
                .map(|r| r.x)
                .fold(f32::NEG_INFINITY, f32::max);

            let text = sorted
                .iter()
                .map(|r| r.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");

            Line {
                index: 0,
                text,
                x_min,
                x_max,
                y_min,
                y_max,
                height: median_height(cluster),
            }
        })
        .collect();

    lines.sort_by(|a, b| a.y_min.total_cmp(&b.y_min).then(a.x_min.total_cmp(&b.x_min)));
    for (i, line) in lines.iter_mut().enumerate() {
        line.index = i;
    }
    lines
}

fn median_height(cluster: &[&TextRun]) -> f32 {
    let mut heights: Vec<f32> = cluster.iter().map(|r| r.height).collect();
    heights.sort_by(f32::total_cmp);
    heights.get(heights.len() / 2).copied().unwrap_or(12.0)
}
