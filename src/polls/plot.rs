// Rendering of the per-mode charts.
//
// Each analysis produces four panels, laid out as a 2x2 grid: standard and
// taiko on top, catch and mania below.

use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;

use crate::polls::*;

pub const PASS_COLOR: RGBAColor = RGBAColor(100, 100, 255, 200.0 / 255.0);
pub const FAIL_COLOR: RGBAColor = RGBAColor(255, 100, 100, 200.0 / 255.0);
pub const MEAN_COLOR: RGBAColor = RGBAColor(255, 255, 0, 100.0 / 255.0);
pub const CURVE_COLOR: RGBAColor = RGBAColor(255, 255, 0, 1.0);

const FONT: &str = "sans-serif";
const POINT_SIZE: i32 = 2;

/// A series drawn on a panel. Layers are drawn in order, the last one on top.
#[derive(Debug, Clone)]
pub enum Layer {
    Line {
        points: Vec<(f64, f64)>,
        color: RGBAColor,
    },
    Scatter {
        points: Vec<(f64, f64)>,
        /// One color per point.
        colors: Vec<RGBAColor>,
    },
}

impl Layer {
    /// A scatter where every point has the same color.
    pub fn scatter(points: Vec<(f64, f64)>, color: RGBAColor) -> Layer {
        let colors = vec![color; points.len()];
        Layer::Scatter { points, colors }
    }

    fn points(&self) -> &[(f64, f64)] {
        match self {
            Layer::Line { points, .. } => points,
            Layer::Scatter { points, .. } => points,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Panel {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub layers: Vec<Layer>,
}

impl Panel {
    pub fn new(title: &str, x_label: &str, y_label: &str) -> Panel {
        Panel {
            title: title.to_string(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            layers: Vec::new(),
        }
    }

    pub fn with_layer(mut self, layer: Layer) -> Panel {
        self.layers.push(layer);
        self
    }

    pub fn has_data(&self) -> bool {
        self.layers.iter().any(|l| !l.points().is_empty())
    }

    /// The ranges of the axes, with some padding. None if there is nothing to draw.
    pub fn ranges(&self) -> Option<(std::ops::Range<f64>, std::ops::Range<f64>)> {
        let all = self
            .layers
            .iter()
            .flat_map(|l| l.points().iter())
            .filter(|(x, y)| x.is_finite() && y.is_finite());
        let mut bounds: Option<(f64, f64, f64, f64)> = None;
        for &(x, y) in all {
            bounds = Some(match bounds {
                None => (x, x, y, y),
                Some((x0, x1, y0, y1)) => (x0.min(x), x1.max(x), y0.min(y), y1.max(y)),
            });
        }
        let (x0, x1, y0, y1) = bounds?;
        Some((padded(x0, x1), padded(y0, y1)))
    }
}

fn padded(lo: f64, hi: f64) -> std::ops::Range<f64> {
    if lo == hi {
        return (lo - 0.5)..(hi + 0.5);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad)..(hi + pad)
}

/// Writes the panels to an SVG file.
pub fn render_svg(path: &str, size: (u32, u32), panels: &[Panel]) -> PollsResult<()> {
    let root = SVGBackend::new(path, size).into_drawing_area();
    draw_grid(&root, panels).map_err(|e| drawing_error(path, e))?;
    root.present().map_err(|e| drawing_error(path, e))?;
    info!("render_svg: wrote chart {}", path);
    Ok(())
}

/// Renders the panels to an in-memory SVG document.
pub fn render_svg_string(size: (u32, u32), panels: &[Panel]) -> PollsResult<String> {
    let mut out = String::new();
    {
        let root = SVGBackend::with_string(&mut out, size).into_drawing_area();
        draw_grid(&root, panels).map_err(|e| drawing_error("<memory>", e))?;
        root.present().map_err(|e| drawing_error("<memory>", e))?;
    }
    Ok(out)
}

fn drawing_error<E: std::fmt::Display>(path: &str, e: E) -> PollsError {
    PollsError::DrawingChart {
        path: path.to_string(),
        message: e.to_string(),
    }
}

fn draw_grid<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    panels: &[Panel],
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&WHITE)?;
    let areas = root.split_evenly((2, 2));
    for (area, panel) in areas.iter().zip(panels.iter()) {
        draw_panel(area, panel)?;
    }
    Ok(())
}

fn draw_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    panel: &Panel,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let (x_range, y_range) = match panel.ranges() {
        Some(r) => r,
        None => {
            debug!("draw_panel: no data for {:?}", panel.title);
            let inner = area.titled(&panel.title, (FONT, 18))?;
            let (w, h) = inner.dim_in_pixel();
            inner.draw(&Text::new(
                "no data",
                (w as i32 / 2 - 25, h as i32 / 2),
                (FONT, 16).into_font(),
            ))?;
            return Ok(());
        }
    };

    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, (FONT, 18))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(55)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc(panel.x_label.as_str())
        .y_desc(panel.y_label.as_str())
        .draw()?;

    for layer in panel.layers.iter() {
        match layer {
            Layer::Line { points, color } => {
                chart.draw_series(LineSeries::new(
                    points.iter().copied(),
                    color.stroke_width(2),
                ))?;
            }
            Layer::Scatter { points, colors } => {
                chart.draw_series(
                    points
                        .iter()
                        .zip(colors.iter())
                        .map(|(&(x, y), c)| Circle::new((x, y), POINT_SIZE, c.filled())),
                )?;
            }
        }
    }
    Ok(())
}
