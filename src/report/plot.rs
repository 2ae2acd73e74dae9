//! Topic scatter plot on two dimensions: origin lines, the `y = -x`
//! diagonal, and one label per quadrant.

use std::path::Path;

use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::aggregate::TopicFactorTable;
use crate::error::{Result, SurveyError};

const AXIS_LIMIT: f64 = 1.1;

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterPoint {
    pub topic_id: u32,
    /// Short label, or the topic id when the lookup has none.
    pub label: String,
    pub x: f64,
    pub y: f64,
}

/// One point per topic with both means present.
pub fn scatter_points(table: &TopicFactorTable, x_dim: &str, y_dim: &str) -> Vec<ScatterPoint> {
    table
        .rows
        .iter()
        .filter_map(|row| {
            let x = row.stats.get(x_dim)?.mean?;
            let y = row.stats.get(y_dim)?.mean?;
            let label = row
                .short_label
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| row.topic_id.to_string());
            Some(ScatterPoint {
                topic_id: row.topic_id,
                label,
                x,
                y,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuadrantLabels {
    pub top_right: String,
    pub top_left: String,
    pub bottom_left: String,
    pub bottom_right: String,
}

impl QuadrantLabels {
    pub fn from_dimensions(x: &str, y: &str) -> Self {
        Self {
            top_right: format!("high {x}, high {y}"),
            top_left: format!("low {x}, high {y}"),
            bottom_left: format!("low {x}, low {y}"),
            bottom_right: format!("high {x}, low {y}"),
        }
    }

    /// Anchor points in data coordinates, clockwise from top right.
    pub fn placed(&self) -> [(&str, (f64, f64)); 4] {
        let near = 0.95;
        let far = 0.35;
        [
            (self.top_right.as_str(), (far, near)),
            (self.bottom_right.as_str(), (far, -near + 0.1)),
            (self.bottom_left.as_str(), (-near, -near + 0.1)),
            (self.top_left.as_str(), (-near, near)),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct PlotSpec {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub width: u32,
    pub height: u32,
    pub quadrants: QuadrantLabels,
}

fn plot_error(e: impl std::fmt::Display) -> SurveyError {
    SurveyError::Plot {
        message: e.to_string(),
    }
}

pub fn render_svg(path: &Path, points: &[ScatterPoint], spec: &PlotSpec) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| SurveyError::io(format!("creating {}", parent.display()), e))?;
    }
    debug!(points = points.len(), width = spec.width, height = spec.height, "rendering scatter plot");
    let root = SVGBackend::new(path, (spec.width, spec.height)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(spec.title.as_str(), ("sans-serif", 20))
        .margin(16)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(-AXIS_LIMIT..AXIS_LIMIT, -AXIS_LIMIT..AXIS_LIMIT)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .draw()
        .map_err(plot_error)?;

    let guides = [
        vec![(-AXIS_LIMIT, 0.0), (AXIS_LIMIT, 0.0)],
        vec![(0.0, -AXIS_LIMIT), (0.0, AXIS_LIMIT)],
    ];
    chart
        .draw_series(
            guides
                .into_iter()
                .map(|line| PathElement::new(line, BLACK.mix(0.4))),
        )
        .map_err(plot_error)?;
    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![(-AXIS_LIMIT, AXIS_LIMIT), (AXIS_LIMIT, -AXIS_LIMIT)],
            RED.mix(0.35),
        )))
        .map_err(plot_error)?;

    chart
        .draw_series(spec.quadrants.placed().into_iter().map(|(text, at)| {
            Text::new(text.to_string(), at, ("sans-serif", 13).into_font().color(&BLACK.mix(0.55)))
        }))
        .map_err(plot_error)?;

    chart
        .draw_series(points.iter().map(|p| {
            EmptyElement::at((p.x, p.y))
                + Circle::new((0, 0), 4, BLUE.filled())
                + Text::new(p.label.clone(), (6, -14), ("sans-serif", 12).into_font())
        }))
        .map_err(plot_error)?;

    root.present().map_err(plot_error)?;
    info!(path = %path.display(), points = points.len(), "scatter plot written");
    Ok(())
}
