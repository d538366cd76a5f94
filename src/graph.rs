#![cfg(feature = "web")]
#![cfg(not(tarpaulin_include))]
use crate::analysis::{BoxStats, ChartData, ChartSpec, LineSeries as SeriesData};
use crate::error::{DashboardError, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::error::Error;
use std::io::Cursor;

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;
type DrawResult = std::result::Result<(), Box<dyn Error>>;

const BAR_COLOR: RGBColor = RGBColor(99, 110, 250);
const BOX_COLOR: RGBColor = RGBColor(0, 204, 150);

/// Configuration options for chart rendering
///
/// Only the canvas size is configurable; titles and axis labels come from
/// the [`ChartSpec`] being drawn.
#[derive(Clone, Debug)]
pub struct GraphOptions {
    /// Width of the image in pixels
    pub width: u32,

    /// Height of the image in pixels
    pub height: u32,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
        }
    }
}

/// Renders a chart spec to PNG bytes
///
/// Bar charts are drawn horizontally with the first entry on top, box
/// plots vertically, and line charts with one coloured series per entry
/// plus a legend.
///
/// # Arguments
/// * `chart` - What to draw
/// * `options` - Canvas size
///
/// # Returns
/// * PNG image data, or a `Render` error
///
/// # Examples
/// ```no_run
/// use salary_dashboard::analysis::{ChartData, ChartSpec};
/// use salary_dashboard::graph::{GraphOptions, render_png};
///
/// let chart = ChartSpec {
///     title: "Average Salary by Department".to_string(),
///     x_label: "Average Salary ($)".to_string(),
///     y_label: "Department".to_string(),
///     data: ChartData::Bar {
///         labels: vec!["Physics".to_string(), "Other".to_string()],
///         values: vec![98000.0, 61000.0],
///     },
/// };
///
/// let png = render_png(&chart, &GraphOptions::default()).unwrap();
/// assert!(!png.is_empty());
/// ```
pub fn render_png(chart: &ChartSpec, options: &GraphOptions) -> Result<Vec<u8>> {
    let (width, height) = (options.width, options.height);
    let mut buffer = vec![0u8; width as usize * height as usize * 3];

    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        draw_chart(&root, chart).map_err(render_error)?;
        root.present().map_err(render_error)?;
    }

    encode_png(buffer, width, height)
}

fn render_error(e: impl std::fmt::Display) -> DashboardError {
    DashboardError::Render {
        details: e.to_string(),
    }
}

fn encode_png(buffer: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>> {
    let image = image::RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| render_error("pixel buffer does not match the canvas size"))?;

    let mut png = Vec::new();
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut png), image::ImageOutputFormat::Png)
        .map_err(render_error)?;
    Ok(png)
}

fn draw_chart(root: &Area, chart: &ChartSpec) -> DrawResult {
    root.fill(&WHITE)?;
    match &chart.data {
        ChartData::Bar { labels, values } => draw_bars(root, chart, labels, values),
        ChartData::Box { groups } => draw_boxes(root, chart, groups),
        ChartData::Line { series } => draw_lines(root, chart, series),
    }
}

/// "$%.2f", matching the bar annotations of the dashboard.
pub fn format_currency(value: f64) -> String {
    if value.is_finite() {
        format!("${value:.2}")
    } else {
        "n/a".to_string()
    }
}

// Rough pixel width needed for the longest category label.
fn label_area_width(labels: &[String]) -> u32 {
    let longest = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0) as u32;
    (longest * 7 + 20).clamp(60, 320)
}

fn slot_label(labels: &[String], slot: u32, reversed: bool) -> String {
    let count = labels.len() as u32;
    if slot >= count {
        return String::new();
    }
    let index = if reversed { count - 1 - slot } else { slot };
    labels[index as usize].clone()
}

fn finite_max(values: impl Iterator<Item = f64>) -> f64 {
    values.filter(|v| v.is_finite()).fold(0.0, f64::max)
}

fn draw_bars(root: &Area, chart: &ChartSpec, labels: &[String], values: &[f64]) -> DrawResult {
    let slots = labels.len().max(1) as u32;
    let max = finite_max(values.iter().copied());
    let x_max = if max > 0.0 { max * 1.2 } else { 1.0 };

    let mut ctx = ChartBuilder::on(root)
        .caption(&chart.title, ("sans-serif", 22).into_font())
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(label_area_width(labels))
        .build_cartesian_2d(0f64..x_max, (0u32..slots).into_segmented())?;

    ctx.configure_mesh()
        .disable_y_mesh()
        .x_desc(&chart.x_label)
        .y_desc(&chart.y_label)
        .y_labels(slots as usize)
        .y_label_formatter(&|segment| match segment {
            SegmentValue::CenterOf(slot) => slot_label(labels, *slot, true),
            _ => String::new(),
        })
        .draw()?;

    // First entry goes in the top slot.
    let bars: Vec<(u32, f64)> = values
        .iter()
        .enumerate()
        .filter(|(_, value)| value.is_finite())
        .map(|(i, value)| (slots - 1 - i as u32, *value))
        .collect();

    ctx.draw_series(bars.iter().map(|&(slot, value)| {
        let mut bar = Rectangle::new(
            [
                (0.0, SegmentValue::Exact(slot)),
                (value, SegmentValue::Exact(slot + 1)),
            ],
            BAR_COLOR.filled(),
        );
        bar.set_margin(4, 4, 0, 0);
        bar
    }))?;

    let annotation = TextStyle::from(("sans-serif", 14).into_font())
        .pos(Pos::new(HPos::Left, VPos::Center));
    ctx.draw_series(bars.iter().map(|&(slot, value)| {
        Text::new(
            format_currency(value),
            (value, SegmentValue::CenterOf(slot)),
            annotation.clone(),
        )
    }))?;

    Ok(())
}

fn draw_boxes(root: &Area, chart: &ChartSpec, groups: &[BoxStats]) -> DrawResult {
    let slots = groups.len().max(1) as u32;
    let labels: Vec<String> = groups.iter().map(|g| g.label.clone()).collect();

    let y_max = finite_max(
        groups
            .iter()
            .flat_map(|g| g.outliers.iter().copied().chain([g.upper_whisker])),
    );
    let y_max = if y_max > 0.0 { y_max * 1.1 } else { 1.0 };

    let mut ctx = ChartBuilder::on(root)
        .caption(&chart.title, ("sans-serif", 22).into_font())
        .margin(15)
        .x_label_area_size(60)
        .y_label_area_size(80)
        .build_cartesian_2d((0u32..slots).into_segmented(), 0f64..y_max)?;

    ctx.configure_mesh()
        .disable_x_mesh()
        .x_desc(&chart.x_label)
        .y_desc(&chart.y_label)
        .x_labels(slots as usize)
        .x_label_formatter(&|segment| match segment {
            SegmentValue::CenterOf(slot) => slot_label(&labels, *slot, false),
            _ => String::new(),
        })
        .draw()?;

    for (i, group) in groups.iter().enumerate() {
        let slot = i as u32;
        let color = BOX_COLOR;

        let mut body = Rectangle::new(
            [
                (SegmentValue::Exact(slot), group.q1),
                (SegmentValue::Exact(slot + 1), group.q3),
            ],
            color.mix(0.4).filled(),
        );
        body.set_margin(0, 0, 15, 15);
        let mut outline = Rectangle::new(
            [
                (SegmentValue::Exact(slot), group.q1),
                (SegmentValue::Exact(slot + 1), group.q3),
            ],
            color.stroke_width(2),
        );
        outline.set_margin(0, 0, 15, 15);
        let mut median = Rectangle::new(
            [
                (SegmentValue::Exact(slot), group.median),
                (SegmentValue::Exact(slot + 1), group.median),
            ],
            BLACK.stroke_width(2),
        );
        median.set_margin(0, 0, 15, 15);
        ctx.draw_series([body, outline, median])?;

        let center = SegmentValue::CenterOf(slot);
        ctx.draw_series([
            PathElement::new(
                vec![(center.clone(), group.lower_whisker), (center.clone(), group.q1)],
                &BLACK,
            ),
            PathElement::new(
                vec![(center.clone(), group.q3), (center.clone(), group.upper_whisker)],
                &BLACK,
            ),
        ])?;
        ctx.draw_series(
            group
                .outliers
                .iter()
                .map(|v| Circle::new((center.clone(), *v), 3, color.filled())),
        )?;
    }

    Ok(())
}

fn draw_lines(root: &Area, chart: &ChartSpec, series: &[SeriesData]) -> DrawResult {
    let years = series.iter().flat_map(|s| s.points.iter().map(|(year, _)| *year));
    let x_min = years.clone().min().unwrap_or(0);
    let x_max = years.max().unwrap_or(1).max(x_min + 1);
    let y_max = finite_max(series.iter().flat_map(|s| s.points.iter().map(|(_, v)| *v)));
    let y_max = if y_max > 0.0 { y_max * 1.1 } else { 1.0 };

    let mut ctx = ChartBuilder::on(root)
        .caption(&chart.title, ("sans-serif", 22).into_font())
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(80)
        .build_cartesian_2d(x_min..x_max, 0f64..y_max)?;

    ctx.configure_mesh()
        .x_desc(&chart.x_label)
        .y_desc(&chart.y_label)
        .x_labels(((x_max - x_min) as usize + 1).min(12))
        .draw()?;

    for (i, line) in series.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();
        let points: Vec<(i32, f64)> = line
            .points
            .iter()
            .copied()
            .filter(|(_, v)| v.is_finite())
            .collect();

        ctx.draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))?
            .label(line.name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
        ctx.draw_series(
            points
                .iter()
                .map(|&point| Circle::new(point, 4, color.filled())),
        )?;
    }

    if !series.is_empty() {
        ctx.configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(&BLACK)
            .position(SeriesLabelPosition::UpperLeft)
            .draw()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(30.0), "$30.00");
        assert_eq!(format_currency(1234.567), "$1234.57");
        assert_eq!(format_currency(f64::NAN), "n/a");
    }

    #[test]
    fn test_slot_labels_put_first_entry_on_top() {
        let labels = vec!["Top".to_string(), "Middle".to_string(), "Other".to_string()];
        assert_eq!(slot_label(&labels, 2, true), "Top");
        assert_eq!(slot_label(&labels, 0, true), "Other");
        assert_eq!(slot_label(&labels, 0, false), "Top");
        assert_eq!(slot_label(&labels, 3, true), "");
    }

    #[test]
    fn test_label_area_is_bounded() {
        assert_eq!(label_area_width(&[]), 60);
        assert_eq!(label_area_width(&["x".repeat(500)]), 320);
    }

    #[test]
    #[ignore = "needs a system sans-serif font"]
    fn test_render_png_produces_png() {
        let chart = ChartSpec {
            title: "Test".to_string(),
            x_label: "x".to_string(),
            y_label: "y".to_string(),
            data: ChartData::Bar {
                labels: vec!["A".to_string()],
                values: vec![1.0],
            },
        };
        let png = render_png(&chart, &GraphOptions::default()).unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }
}
