//! Gamma curve plots
//!
//! Renders measured samples and fitted `V^γ` curves using tiny-skia.
//! Layout calculation is kept separate from rendering so it can be tested
//! without touching pixels.

use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontVec, PxScale, ScaleFont, point};
use tiny_skia::{
    Color, FillRule, Paint, PathBuilder, Pixmap, PremultipliedColorU8, Rect as SkiaRect, Stroke,
    Transform,
};

use crate::domain::fit::{GammaEstimates, linspace};
use crate::domain::patches::{ChannelSamples, MeasurementSet};
use crate::domain::table::Channel;

/// Plot errors
#[derive(Debug, thiserror::Error)]
pub enum PlotError {
    #[error("Failed to create {width}x{height} pixmap for plotting")]
    PixmapCreationFailed { width: u32, height: u32 },

    #[error("Failed to read font {}: {source}", .path.display())]
    FontRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Font {} is not a usable TrueType/OpenType font", .path.display())]
    InvalidFont { path: PathBuf },

    #[error("Failed to write plot {}: {message}", .path.display())]
    EncodingFailed { path: PathBuf, message: String },
}

/// Canvas geometry for a plot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub marker_radius: f32,
    pub curve_width: f32,
    pub font_size: f32,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            margin_left: 80.0,
            margin_right: 30.0,
            margin_top: 50.0,
            margin_bottom: 70.0,
            marker_radius: 4.0,
            curve_width: 2.0,
            font_size: 16.0,
        }
    }
}

/// A straight line segment in canvas pixels
#[derive(Debug, Clone)]
pub struct Line {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub width: f32,
    pub color: Color,
}

/// Horizontal alignment of a text label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
}

/// Text drawn at a baseline position
#[derive(Debug, Clone)]
pub struct TextLabel {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub color: Color,
    pub anchor: Anchor,
}

/// Measured points and fitted curve for one data set
#[derive(Debug, Clone)]
pub struct Series {
    pub data_label: String,
    pub fit_label: Option<String>,
    pub color: Color,
    pub markers: Vec<(f32, f32)>,
    pub curve: Vec<(f32, f32)>,
}

/// Pre-calculated plot geometry
#[derive(Debug, Clone)]
pub struct PlotLayout {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub plot_area: SkiaRect,
    pub grid_lines: Vec<Line>,
    pub axes: Vec<Line>,
    pub series: Vec<Series>,
    pub labels: Vec<TextLabel>,
    pub marker_radius: f32,
    pub curve_width: f32,
    pub font_size: f32,
}

const CURVE_POINTS: usize = 101;
const GRID_DIVISIONS: usize = 5;

fn series_color(channel: Option<Channel>) -> Color {
    match channel {
        Some(Channel::Red) => Color::from_rgba8(214, 39, 40, 255),
        Some(Channel::Green) => Color::from_rgba8(44, 160, 44, 255),
        Some(Channel::Blue) => Color::from_rgba8(31, 119, 180, 255),
        None => Color::from_rgba8(0, 0, 0, 255),
    }
}

impl PlotLayout {
    /// Lays out every channel that has samples
    pub fn new(
        measurements: &MeasurementSet,
        estimates: &GammaEstimates,
        style: &PlotStyle,
    ) -> Option<Self> {
        let left = style.margin_left;
        let top = style.margin_top;
        let plot_w = style.width as f32 - style.margin_left - style.margin_right;
        let plot_h = style.height as f32 - style.margin_top - style.margin_bottom;
        let plot_area = SkiaRect::from_xywh(left, top, plot_w, plot_h)?;

        let mut layout = Self {
            canvas_width: style.width,
            canvas_height: style.height,
            plot_area,
            grid_lines: Vec::new(),
            axes: Vec::new(),
            series: Vec::new(),
            labels: Vec::new(),
            marker_radius: style.marker_radius,
            curve_width: style.curve_width,
            font_size: style.font_size,
        };

        layout.calculate_grid();
        for channel in Channel::ALL {
            let samples = match channel {
                Channel::Red => &measurements.red,
                Channel::Green => &measurements.green,
                Channel::Blue => &measurements.blue,
            };
            layout.push_series(
                &format!("{} Channel Data", channel.name()),
                channel.name(),
                Some(channel),
                samples,
                estimates.channel(channel),
            );
        }
        layout.push_series(
            "Grayscale Data",
            "Grayscale",
            None,
            &measurements.gray,
            estimates.gray,
        );
        layout.calculate_labels();

        Some(layout)
    }

    /// Maps a normalised data point into canvas pixels
    pub fn to_canvas(&self, v: f64, l: f64) -> (f32, f32) {
        let area = self.plot_area;
        (
            area.left() + v as f32 * area.width(),
            area.bottom() - l as f32 * area.height(),
        )
    }

    fn calculate_grid(&mut self) {
        let area = self.plot_area;
        let grid_color = Color::from_rgba8(0, 0, 0, 40);
        let axis_color = Color::from_rgba8(0, 0, 0, 255);

        for i in 1..GRID_DIVISIONS {
            let t = i as f32 / GRID_DIVISIONS as f32;
            let x = area.left() + t * area.width();
            let y = area.bottom() - t * area.height();
            self.grid_lines.push(Line {
                x1: x,
                y1: area.top(),
                x2: x,
                y2: area.bottom(),
                width: 1.0,
                color: grid_color,
            });
            self.grid_lines.push(Line {
                x1: area.left(),
                y1: y,
                x2: area.right(),
                y2: y,
                width: 1.0,
                color: grid_color,
            });
        }

        let corners = [
            (area.left(), area.bottom(), area.right(), area.bottom()),
            (area.left(), area.top(), area.left(), area.bottom()),
            (area.left(), area.top(), area.right(), area.top()),
            (area.right(), area.top(), area.right(), area.bottom()),
        ];
        for (x1, y1, x2, y2) in corners {
            self.axes.push(Line {
                x1,
                y1,
                x2,
                y2,
                width: 1.5,
                color: axis_color,
            });
        }
    }

    fn push_series(
        &mut self,
        data_label: &str,
        fit_name: &str,
        channel: Option<Channel>,
        samples: &ChannelSamples,
        gamma: Option<f64>,
    ) {
        let Some(normalized) = samples.normalized_luminance() else {
            return;
        };

        let markers = samples
            .levels
            .iter()
            .zip(normalized)
            .map(|(&v, l)| self.to_canvas(v.clamp(0.0, 1.0), l.clamp(0.0, 1.0)))
            .collect();

        let curve = match gamma {
            Some(gamma) => linspace(CURVE_POINTS)
                .into_iter()
                .map(|v| self.to_canvas(v, v.powf(gamma)))
                .collect(),
            None => Vec::new(),
        };

        self.series.push(Series {
            data_label: data_label.to_string(),
            fit_label: gamma.map(|g| format!("{fit_name} Fit (γ={g:.4})")),
            color: series_color(channel),
            markers,
            curve,
        });
    }

    fn calculate_labels(&mut self) {
        let area = self.plot_area;
        let size = self.font_size;
        let black = Color::from_rgba8(0, 0, 0, 255);

        self.labels.push(TextLabel {
            text: "Display Gamma Curves".to_string(),
            x: area.left() + area.width() / 2.0,
            y: area.top() - size,
            size: size * 1.25,
            color: black,
            anchor: Anchor::Middle,
        });
        self.labels.push(TextLabel {
            text: "Normalized Input (V_in)".to_string(),
            x: area.left() + area.width() / 2.0,
            y: area.bottom() + size * 3.0,
            size,
            color: black,
            anchor: Anchor::Middle,
        });
        self.labels.push(TextLabel {
            text: "Normalized Luminance (L)".to_string(),
            x: 8.0,
            y: area.top() - size * 0.25,
            size,
            color: black,
            anchor: Anchor::Start,
        });

        for i in 0..=GRID_DIVISIONS {
            let t = i as f64 / GRID_DIVISIONS as f64;
            let (x, y) = self.to_canvas(t, t);
            let tick = format!("{t:.1}");
            self.labels.push(TextLabel {
                text: tick.clone(),
                x,
                y: area.bottom() + size * 1.25,
                size: size * 0.8,
                color: black,
                anchor: Anchor::Middle,
            });
            self.labels.push(TextLabel {
                text: tick,
                x: area.left() - size * 2.25,
                y: y + size * 0.3,
                size: size * 0.8,
                color: black,
                anchor: Anchor::Start,
            });
        }

        let legend_x = area.left() + size * 2.5;
        let mut legend_y = area.top() + size * 1.5;
        let entries: Vec<(String, Color)> = self
            .series
            .iter()
            .flat_map(|s| {
                std::iter::once((s.data_label.clone(), s.color))
                    .chain(s.fit_label.clone().map(|label| (label, s.color)))
            })
            .collect();
        for (text, color) in entries {
            self.labels.push(TextLabel {
                text,
                x: legend_x,
                y: legend_y,
                size: size * 0.8,
                color,
                anchor: Anchor::Start,
            });
            legend_y += size * 1.1;
        }
    }
}

/// Plot renderer with an optional font for text
pub struct PlotRenderer {
    font: Option<FontVec>,
}

impl PlotRenderer {
    /// Renderer without text
    pub fn new() -> Self {
        Self { font: None }
    }

    /// Renderer drawing text with the font at `path`
    pub fn with_font_file(path: &Path) -> Result<Self, PlotError> {
        let data = std::fs::read(path).map_err(|source| PlotError::FontRead {
            path: path.to_path_buf(),
            source,
        })?;
        let font = FontVec::try_from_vec(data).map_err(|_| PlotError::InvalidFont {
            path: path.to_path_buf(),
        })?;
        Ok(Self { font: Some(font) })
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Render a plot layout to a pixmap
    pub fn render(&self, layout: &PlotLayout) -> Result<Pixmap, PlotError> {
        let mut pixmap = Pixmap::new(layout.canvas_width, layout.canvas_height).ok_or(
            PlotError::PixmapCreationFailed {
                width: layout.canvas_width,
                height: layout.canvas_height,
            },
        )?;
        pixmap.fill(Color::WHITE);

        render_lines(&mut pixmap, &layout.grid_lines);
        render_lines(&mut pixmap, &layout.axes);

        for series in &layout.series {
            render_curve(&mut pixmap, &series.curve, series.color, layout.curve_width);
            render_markers(&mut pixmap, &series.markers, series.color, layout.marker_radius);
        }

        if let Some(font) = &self.font {
            for label in &layout.labels {
                draw_text(&mut pixmap, font, label);
            }
        }

        Ok(pixmap)
    }

    /// Renders the layout and writes it as PNG
    pub fn save_png(&self, layout: &PlotLayout, path: &Path) -> Result<(), PlotError> {
        let pixmap = self.render(layout)?;
        pixmap
            .save_png(path)
            .map_err(|err| PlotError::EncodingFailed {
                path: path.to_path_buf(),
                message: err.to_string(),
            })
    }
}

impl Default for PlotRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn render_lines(pixmap: &mut Pixmap, lines: &[Line]) {
    for line in lines {
        let mut path_builder = PathBuilder::new();
        path_builder.move_to(line.x1, line.y1);
        path_builder.line_to(line.x2, line.y2);

        if let Some(path) = path_builder.finish() {
            let mut paint = Paint::default();
            paint.set_color(line.color);

            let stroke = Stroke {
                width: line.width,
                ..Stroke::default()
            };

            pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }
    }
}

fn render_curve(pixmap: &mut Pixmap, points: &[(f32, f32)], color: Color, width: f32) {
    let Some((&(x0, y0), rest)) = points.split_first() else {
        return;
    };

    let mut path_builder = PathBuilder::new();
    path_builder.move_to(x0, y0);
    for &(x, y) in rest {
        path_builder.line_to(x, y);
    }

    if let Some(path) = path_builder.finish() {
        let mut paint = Paint::default();
        paint.set_color(color);
        paint.anti_alias = true;

        let stroke = Stroke {
            width,
            ..Stroke::default()
        };
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }
}

fn render_markers(pixmap: &mut Pixmap, points: &[(f32, f32)], color: Color, radius: f32) {
    let mut paint = Paint::default();
    paint.set_color(color);
    paint.anti_alias = true;

    for &(x, y) in points {
        if let Some(circle) = PathBuilder::from_circle(x, y, radius) {
            pixmap.fill_path(&circle, &paint, FillRule::Winding, Transform::identity(), None);
        }
    }
}

/// Rasterises a label with ab_glyph and blends it onto the pixmap
fn draw_text(pixmap: &mut Pixmap, font: &FontVec, label: &TextLabel) {
    let scale = PxScale::from(label.size);
    let scaled = font.as_scaled(scale);

    let width: f32 = label
        .text
        .chars()
        .map(|c| scaled.h_advance(scaled.glyph_id(c)))
        .sum();
    let mut caret = match label.anchor {
        Anchor::Start => label.x,
        Anchor::Middle => label.x - width / 2.0,
    };

    let (canvas_w, canvas_h) = (pixmap.width() as i32, pixmap.height() as i32);
    let color = label.color.to_color_u8();
    let pixels = pixmap.pixels_mut();

    for c in label.text.chars() {
        let id = scaled.glyph_id(c);
        let glyph = id.with_scale_and_position(scale, point(caret, label.y));
        caret += scaled.h_advance(id);

        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        outlined.draw(|gx, gy, coverage| {
            let px = bounds.min.x as i32 + gx as i32;
            let py = bounds.min.y as i32 + gy as i32;
            if px < 0 || py < 0 || px >= canvas_w || py >= canvas_h {
                return;
            }

            let index = (py * canvas_w + px) as usize;
            let dst = pixels[index];
            let alpha = coverage.clamp(0.0, 1.0) * (color.alpha() as f32 / 255.0);
            let blend =
                |src: u8, dst: u8| (src as f32 * alpha + dst as f32 * (1.0 - alpha)).round() as u8;

            let out_alpha = blend(255, dst.alpha());
            let blended = PremultipliedColorU8::from_rgba(
                blend(color.red(), dst.red()).min(out_alpha),
                blend(color.green(), dst.green()).min(out_alpha),
                blend(color.blue(), dst.blue()).min(out_alpha),
                out_alpha,
            );
            if let Some(blended) = blended {
                pixels[index] = blended;
            }
        });
    }
}
