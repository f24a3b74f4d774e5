//! Bitmap rendition of a [Chart] for PNG and JPEG exports. Geometry mirrors the SVG output, so
//! both formats show the same picture. Text needs a TrueType font; without one the chart is
//! drawn unlabelled.

use std::{
    f64::consts::PI,
    io::Cursor,
    path::{Path, PathBuf},
};

use ab_glyph::{point, Font, FontVec, PxScale, ScaleFont};
use image::{codecs::jpeg::JpegEncoder, ImageFormat, Rgb, RgbImage};
use tracing::{debug, warn};

use crate::{
    error::{TrackerError, TrackerResult},
    utils::percentage::Percentage,
};

use super::chart::{format_value, Chart, ChartKind, CHART_HEIGHT, CHART_WIDTH, PALETTE};

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const JPEG_QUALITY: u8 = 90;

/// Fonts tried, in order, when no font is configured.
const SYSTEM_FONTS: [&str; 6] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// File format of an exported chart, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartFormat {
    Png,
    Jpeg,
    Svg,
}

impl ChartFormat {
    pub fn from_path(path: &Path) -> TrackerResult<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("png") => Ok(ChartFormat::Png),
            Some("jpg" | "jpeg") => Ok(ChartFormat::Jpeg),
            Some("svg") => Ok(ChartFormat::Svg),
            _ => Err(TrackerError::Render(format!(
                "can't tell the image format of {}, use .png, .jpg or .svg",
                path.display()
            ))),
        }
    }
}

pub struct ChartFont(FontVec);

impl ChartFont {
    pub fn load(path: &Path) -> TrackerResult<Self> {
        let data = std::fs::read(path).map_err(|source| TrackerError::Export {
            path: path.to_path_buf(),
            source,
        })?;
        FontVec::try_from_vec(data)
            .map(ChartFont)
            .map_err(|e| TrackerError::Render(format!("{}: {e}", path.display())))
    }

    /// The configured font if it loads, otherwise the first system font found.
    pub fn find(configured: Option<&Path>) -> Option<Self> {
        let candidates = configured
            .map(Path::to_path_buf)
            .into_iter()
            .chain(SYSTEM_FONTS.iter().map(PathBuf::from));
        for path in candidates {
            if !path.exists() {
                continue;
            }
            match Self::load(&path) {
                Ok(font) => {
                    debug!("Chart font {path:?}");
                    return Some(font);
                }
                Err(e) => warn!("Skipping chart font: {e}"),
            }
        }
        warn!("No usable font found, chart labels are left out");
        None
    }
}

#[derive(Clone, Copy)]
enum Anchor {
    Start,
    Middle,
    End,
}

fn palette_colour(i: usize) -> Rgb<u8> {
    let hex = PALETTE[i % PALETTE.len()].trim_start_matches('#');
    let channel = |at: usize| u8::from_str_radix(&hex[at..at + 2], 16).unwrap_or(0);
    Rgb([channel(0), channel(2), channel(4)])
}

fn fill_rect(image: &mut RgbImage, x0: f64, y0: f64, x1: f64, y1: f64, colour: Rgb<u8>) {
    let clamp_x = |v: f64| v.round().clamp(0., image.width() as f64) as u32;
    let clamp_y = |v: f64| v.round().clamp(0., image.height() as f64) as u32;
    let (x0, x1, y0, y1) = (clamp_x(x0), clamp_x(x1), clamp_y(y0), clamp_y(y1));
    for y in y0..y1 {
        for x in x0..x1 {
            image.put_pixel(x, y, colour);
        }
    }
}

fn draw_text(
    image: &mut RgbImage,
    font: &ChartFont,
    text: &str,
    x: f64,
    baseline: f64,
    size: f32,
    anchor: Anchor,
) {
    let scaled = font.0.as_scaled(PxScale::from(size));
    let width: f32 = text
        .chars()
        .map(|c| scaled.h_advance(scaled.glyph_id(c)))
        .sum();
    let mut caret = match anchor {
        Anchor::Start => x as f32,
        Anchor::Middle => x as f32 - width / 2.,
        Anchor::End => x as f32 - width,
    };

    for c in text.chars() {
        let mut glyph = scaled.scaled_glyph(c);
        glyph.position = point(caret, baseline as f32);
        caret += scaled.h_advance(glyph.id);

        let Some(outlined) = font.0.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        outlined.draw(|gx, gy, coverage| {
            let px = bounds.min.x as i64 + gx as i64;
            let py = bounds.min.y as i64 + gy as i64;
            if px < 0 || py < 0 || px >= image.width() as i64 || py >= image.height() as i64 {
                return;
            }
            let pixel = image.get_pixel_mut(px as u32, py as u32);
            let coverage = coverage.clamp(0., 1.);
            for channel in pixel.0.iter_mut() {
                *channel = (*channel as f32 * (1. - coverage)).round() as u8;
            }
        });
    }
}

/// Draws the chart on a white canvas the size of the SVG.
pub fn rasterize(chart: &Chart, font: Option<&ChartFont>) -> RgbImage {
    let mut image = RgbImage::from_pixel(CHART_WIDTH as u32, CHART_HEIGHT as u32, WHITE);
    match chart.kind {
        ChartKind::Pie => draw_pie(&mut image, chart, font),
        ChartKind::Bar => draw_bars(&mut image, chart, font),
    }
    if let Some(font) = font {
        draw_text(&mut image, font, &chart.title, CHART_WIDTH / 2., 30., 18., Anchor::Middle);
    }
    image
}

fn draw_pie(image: &mut RgbImage, chart: &Chart, font: Option<&ChartFont>) {
    let (cx, cy, r) = (220., 225., 160.);
    let total = chart.total();
    if total <= 0. {
        return;
    }

    // Upper bound of every slice as a fraction of the full turn.
    let mut bounds = Vec::with_capacity(chart.points.len());
    let mut running = 0.;
    for point in &chart.points {
        running += point.value / total;
        bounds.push(running);
    }

    for y in (cy - r) as u32..(cy + r) as u32 {
        for x in (cx - r) as u32..(cx + r) as u32 {
            let dx = x as f64 + 0.5 - cx;
            let dy = cy - (y as f64 + 0.5);
            if dx * dx + dy * dy > r * r {
                continue;
            }
            // Counterclockwise from 12 o'clock, like the SVG slices.
            let turn = (dy.atan2(dx) - PI / 2.).rem_euclid(2. * PI) / (2. * PI);
            let slice = bounds
                .iter()
                .position(|b| turn < *b)
                .unwrap_or(bounds.len() - 1);
            image.put_pixel(x, y, palette_colour(slice));
        }
    }

    let Some(font) = font else {
        return;
    };
    let mut angle = PI / 2.;
    for point in &chart.points {
        let sweep = point.value / total * 2. * PI;
        let mid = angle + sweep / 2.;
        if let Some(share) = Percentage::share(point.value, total) {
            let (lx, ly) = (cx + r * 0.6 * mid.cos(), cy - r * 0.6 * mid.sin());
            draw_text(image, font, &share.to_string(), lx, ly, 12., Anchor::Middle);
        }
        let (tx, ty) = (cx + r * 1.12 * mid.cos(), cy - r * 1.12 * mid.sin());
        let anchor = if mid.cos() < 0. { Anchor::End } else { Anchor::Start };
        draw_text(image, font, &point.label, tx, ty, 12., anchor);
        angle += sweep;
    }
}

fn draw_bars(image: &mut RgbImage, chart: &Chart, font: Option<&ChartFont>) {
    let (left, right, top, bottom) = (60., CHART_WIDTH - 20., 60., CHART_HEIGHT - 60.);
    fill_rect(image, left, bottom, right, bottom + 1., BLACK);
    fill_rect(image, left, top, left + 1., bottom, BLACK);

    let max = chart.max();
    if chart.points.is_empty() || max <= 0. {
        return;
    }
    let slot = (right - left) / chart.points.len() as f64;
    let width = slot * 0.7;
    for (i, point) in chart.points.iter().enumerate() {
        let height = point.value / max * (bottom - top);
        let x = left + slot * i as f64 + (slot - width) / 2.;
        let y = bottom - height;
        fill_rect(image, x, y, x + width, bottom, palette_colour(i));
        if let Some(font) = font {
            let centre = x + width / 2.;
            draw_text(image, font, &format_value(point.value), centre, y - 4., 11., Anchor::Middle);
            draw_text(image, font, &point.label, centre, bottom + 16., 11., Anchor::Middle);
        }
    }
}

/// Encodes a rasterized chart. JPEG has no alpha, which the white canvas never needs.
pub fn encode(image: &RgbImage, format: ImageFormat) -> TrackerResult<Vec<u8>> {
    let mut bytes = Vec::new();
    let result = match format {
        ImageFormat::Jpeg => {
            JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY).encode_image(image)
        }
        format => image.write_to(&mut Cursor::new(&mut bytes), format),
    };
    result.map_err(|e| TrackerError::Render(e.to_string()))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use image::ImageFormat;

    use crate::report::{
        chart::{Chart, ChartKind, ChartPoint},
        raster::{encode, palette_colour, rasterize, ChartFont, ChartFormat, WHITE},
    };

    fn chart(kind: ChartKind, values: &[(&str, f64)]) -> Chart {
        Chart {
            kind,
            title: "Mood Distribution".into(),
            points: values
                .iter()
                .map(|(label, value)| ChartPoint {
                    label: label.to_string(),
                    value: *value,
                })
                .collect(),
        }
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ChartFormat::from_path(Path::new("a/mood.png")).unwrap(), ChartFormat::Png);
        assert_eq!(ChartFormat::from_path(Path::new("mood.JPG")).unwrap(), ChartFormat::Jpeg);
        assert_eq!(ChartFormat::from_path(Path::new("mood.jpeg")).unwrap(), ChartFormat::Jpeg);
        assert_eq!(ChartFormat::from_path(Path::new("mood.svg")).unwrap(), ChartFormat::Svg);
        assert!(ChartFormat::from_path(Path::new("mood.gif")).is_err());
        assert!(ChartFormat::from_path(Path::new("mood")).is_err());
    }

    #[test]
    fn test_pie_slices_run_counterclockwise_from_top() {
        let image = rasterize(&chart(ChartKind::Pie, &[("Happy", 1.), ("Sad", 1.)]), None);
        assert_eq!((image.width(), image.height()), (640, 420));
        // The first half turn from 12 o'clock covers the left side.
        assert_eq!(*image.get_pixel(140, 225), palette_colour(0));
        assert_eq!(*image.get_pixel(300, 225), palette_colour(1));
        assert_eq!(*image.get_pixel(5, 5), WHITE);
    }

    #[test]
    fn test_bars_scale_to_largest_value() {
        let image = rasterize(&chart(ChartKind::Bar, &[("a", 2.), ("b", 4.)]), None);
        // Bars sit on the axis at y = 360. The larger one reaches the top of the plot.
        assert_eq!(*image.get_pixel(200, 300), palette_colour(0));
        assert_eq!(*image.get_pixel(200, 100), WHITE);
        assert_eq!(*image.get_pixel(480, 70), palette_colour(1));
    }

    #[test]
    fn test_encode_formats() -> anyhow::Result<()> {
        let image = rasterize(&chart(ChartKind::Pie, &[("Happy", 3.)]), None);
        assert!(encode(&image, ImageFormat::Png)?.starts_with(b"\x89PNG"));
        assert!(encode(&image, ImageFormat::Jpeg)?.starts_with(&[0xFF, 0xD8]));
        Ok(())
    }

    #[test]
    fn test_labels_drawn_with_font() {
        let Some(font) = ChartFont::find(None) else {
            return;
        };
        let points = &[("Happy", 1.)];
        let plain = rasterize(&chart(ChartKind::Pie, points), None);
        let labelled = rasterize(&chart(ChartKind::Pie, points), Some(&font));
        // The title band is blank without a font.
        let dark = |image: &image::RgbImage| {
            (200..440)
                .flat_map(|x| (10..35).map(move |y| (x, y)))
                .filter(|(x, y)| image.get_pixel(*x, *y).0[0] < 128)
                .count()
        };
        assert_eq!(dark(&plain), 0);
        assert!(dark(&labelled) > 0);
    }

    #[test]
    fn test_missing_font_file() {
        assert!(ChartFont::load(Path::new("/nonexistent/font.ttf")).is_err());
    }
}
