//! Minimal PDF writer for reports: US-letter pages, the two standard Helvetica faces and an
//! optional image drawn under the text of every page.
//!
//! Layout follows a single vertical cursor. The title sits 50pt below the top edge, the first
//! line 100pt below it, and every line moves the cursor down by [LINE_HEIGHT]. Once the cursor
//! drops below [BOTTOM_MARGIN] the next line starts a new page at 50pt below the top.

use std::path::Path;

use image::{codecs::jpeg::JpegEncoder, Rgb, RgbImage};
use tracing::debug;

use crate::error::{TrackerError, TrackerResult};

pub const PAGE_WIDTH: f32 = 612.;
pub const PAGE_HEIGHT: f32 = 792.;
pub const LEFT_MARGIN: f32 = 50.;
pub const TOP_MARGIN: f32 = 50.;
pub const FIRST_LINE_OFFSET: f32 = 100.;
pub const BOTTOM_MARGIN: f32 = 50.;
pub const LINE_HEIGHT: f32 = 20.;

const TITLE_SIZE: f32 = 14.;
const BODY_SIZE: f32 = 12.;
const BACKGROUND_QUALITY: u8 = 85;
/// Helvetica averages about half an em per glyph, which gives roughly 85 characters in the
/// printable width at 12pt.
const MAX_LINE_CHARS: usize = ((PAGE_WIDTH - 2. * LEFT_MARGIN) / (BODY_SIZE * 0.5)) as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfFont {
    Regular,
    Bold,
}

impl PdfFont {
    fn resource(self) -> &'static str {
        match self {
            PdfFont::Regular => "F1",
            PdfFont::Bold => "F2",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedText {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font: PdfFont,
    pub size: f32,
}

/// Text placed on pages, before serialization.
#[derive(Debug, Clone, Default)]
pub struct PageLayout {
    pub pages: Vec<Vec<PlacedText>>,
}

impl PageLayout {
    /// Page index of the `n`-th body line (the title is not counted).
    pub fn page_of_line(&self, n: usize) -> Option<usize> {
        let mut seen = 0;
        for (page_index, page) in self.pages.iter().enumerate() {
            let body = page.iter().filter(|t| t.font == PdfFont::Regular).count();
            if n < seen + body {
                return Some(page_index);
            }
            seen += body;
        }
        None
    }
}

/// Splits a report line into pieces that fit the printable width. Embedded newlines always
/// break; long lines break on whitespace, and words longer than a line are cut.
pub fn wrap_line(line: &str) -> Vec<String> {
    let mut wrapped = Vec::new();
    for paragraph in line.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word = word;
            loop {
                let current_len = current.chars().count();
                let word_len = word.chars().count();
                let needed = if current.is_empty() { word_len } else { current_len + 1 + word_len };
                if needed <= MAX_LINE_CHARS {
                    if !current.is_empty() {
                        current.push(' ');
                    }
                    current.push_str(word);
                    break;
                }
                if !current.is_empty() {
                    wrapped.push(std::mem::take(&mut current));
                    continue;
                }
                let split = word
                    .char_indices()
                    .nth(MAX_LINE_CHARS)
                    .map(|(i, _)| i)
                    .unwrap_or(word.len());
                wrapped.push(word[..split].to_string());
                word = &word[split..];
                if word.is_empty() {
                    break;
                }
            }
        }
        wrapped.push(current);
    }
    wrapped
}

/// Places the title and every line, starting new pages as the cursor passes the bottom margin.
pub fn layout(title: &str, lines: &[String]) -> PageLayout {
    let mut pages = vec![vec![PlacedText {
        text: title.to_string(),
        x: LEFT_MARGIN,
        y: PAGE_HEIGHT - TOP_MARGIN,
        font: PdfFont::Bold,
        size: TITLE_SIZE,
    }]];

    let mut y = PAGE_HEIGHT - FIRST_LINE_OFFSET;
    for line in lines.iter().flat_map(|l| wrap_line(l)) {
        if let Some(page) = pages.last_mut() {
            page.push(PlacedText {
                text: line,
                x: LEFT_MARGIN,
                y,
                font: PdfFont::Regular,
                size: BODY_SIZE,
            });
        }
        y -= LINE_HEIGHT;
        if y < BOTTOM_MARGIN {
            pages.push(Vec::new());
            y = PAGE_HEIGHT - TOP_MARGIN;
        }
    }

    // A page break right after the last line leaves nothing to print on the new page.
    if pages.len() > 1 && pages.last().is_some_and(|p| p.is_empty()) {
        pages.pop();
    }
    PageLayout { pages }
}

/// Image drawn under the text. Any PNG or JPEG is accepted; it is flattened onto white and
/// stored as an RGB JPEG, which PDF embeds with `DCTDecode`.
#[derive(Debug, Clone)]
pub struct BackgroundImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl BackgroundImage {
    pub fn load(path: &Path) -> TrackerResult<Self> {
        let data = std::fs::read(path).map_err(|source| TrackerError::Export {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&data)
    }

    pub fn from_bytes(data: &[u8]) -> TrackerResult<Self> {
        let decoded = image::load_from_memory(data)
            .map_err(|e| TrackerError::Render(format!("unreadable background image: {e}")))?;
        let rgba = decoded.to_rgba8();
        let flattened = RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
            let [r, g, b, a] = rgba.get_pixel(x, y).0;
            let alpha = a as u16;
            let over_white = |c: u8| ((c as u16 * alpha + 255 * (255 - alpha)) / 255) as u8;
            Rgb([over_white(r), over_white(g), over_white(b)])
        });

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, BACKGROUND_QUALITY)
            .encode_image(&flattened)
            .map_err(|e| TrackerError::Render(e.to_string()))?;
        debug!(
            width = flattened.width(),
            height = flattened.height(),
            "Loaded background image"
        );
        Ok(Self {
            width: flattened.width(),
            height: flattened.height(),
            data: jpeg,
        })
    }
}

/// Escapes a string for a PDF literal. Characters outside Latin-1 have no glyph in the standard
/// fonts and become `?`.
fn escape_pdf_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '(' => escaped.push_str("\\("),
            ')' => escaped.push_str("\\)"),
            c if c.is_ascii_control() => escaped.push(' '),
            c if c.is_ascii() => escaped.push(c),
            c if (c as u32) >= 0xA0 && (c as u32) <= 0xFF => {
                escaped.push_str(&format!("\\{:03o}", c as u32))
            }
            _ => escaped.push('?'),
        }
    }
    escaped
}

fn page_content(page: &[PlacedText], background: bool) -> Vec<u8> {
    let mut content = String::new();
    if background {
        content.push_str(&format!("q {PAGE_WIDTH} 0 0 {PAGE_HEIGHT} 0 0 cm /Bg Do Q\n"));
    }
    for text in page {
        content.push_str(&format!(
            "BT /{} {} Tf {} {} Td ({}) Tj ET\n",
            text.font.resource(),
            text.size,
            text.x,
            text.y,
            escape_pdf_text(&text.text)
        ));
    }
    content.into_bytes()
}

/// Collects objects and their byte offsets while the file is written.
struct PdfWriter {
    buffer: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfWriter {
    fn new() -> Self {
        Self {
            buffer: b"%PDF-1.4\n".to_vec(),
            offsets: Vec::new(),
        }
    }

    fn object(&mut self, id: usize, body: &str) {
        self.begin(id);
        self.buffer.extend_from_slice(body.as_bytes());
        self.buffer.extend_from_slice(b"\nendobj\n");
    }

    fn stream(&mut self, id: usize, dictionary: &str, data: &[u8]) {
        self.begin(id);
        self.buffer.extend_from_slice(
            format!("<< {dictionary} /Length {} >>\nstream\n", data.len()).as_bytes(),
        );
        self.buffer.extend_from_slice(data);
        self.buffer.extend_from_slice(b"\nendstream\nendobj\n");
    }

    fn begin(&mut self, id: usize) {
        if self.offsets.len() < id {
            self.offsets.resize(id, 0);
        }
        self.offsets[id - 1] = self.buffer.len();
        self.buffer
            .extend_from_slice(format!("{id} 0 obj\n").as_bytes());
    }

    fn finish(mut self, root: usize) -> Vec<u8> {
        let xref = self.buffer.len();
        let size = self.offsets.len() + 1;
        let mut table = format!("xref\n0 {size}\n0000000000 65535 f \n");
        for offset in &self.offsets {
            table.push_str(&format!("{offset:010} 00000 n \n"));
        }
        table.push_str(&format!(
            "trailer\n<< /Size {size} /Root {root} 0 R >>\nstartxref\n{xref}\n%%EOF\n"
        ));
        self.buffer.extend_from_slice(table.as_bytes());
        self.buffer
    }
}

/// Serializes a report into PDF bytes.
pub fn render_pdf(title: &str, lines: &[String], background: Option<&BackgroundImage>) -> Vec<u8> {
    let layout = layout(title, lines);
    debug!(pages = layout.pages.len(), lines = lines.len(), "Rendering PDF");

    const CATALOG: usize = 1;
    const PAGES: usize = 2;
    const REGULAR: usize = 3;
    const BOLD: usize = 4;
    const IMAGE: usize = 5;
    let first_page = if background.is_some() { IMAGE + 1 } else { IMAGE };

    // Each page takes two objects: the page and its content stream.
    let page_ids = (0..layout.pages.len())
        .map(|i| first_page + i * 2)
        .collect::<Vec<_>>();

    let mut writer = PdfWriter::new();
    writer.object(CATALOG, &format!("<< /Type /Catalog /Pages {PAGES} 0 R >>"));
    let kids = page_ids
        .iter()
        .map(|id| format!("{id} 0 R"))
        .collect::<Vec<_>>()
        .join(" ");
    writer.object(
        PAGES,
        &format!(
            "<< /Type /Pages /Kids [{kids}] /Count {} >>",
            page_ids.len()
        ),
    );
    writer.object(
        REGULAR,
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>",
    );
    writer.object(
        BOLD,
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>",
    );

    let mut resources = format!("<< /Font << /F1 {REGULAR} 0 R /F2 {BOLD} 0 R >>");
    if let Some(image) = background {
        writer.stream(
            IMAGE,
            &format!(
                "/Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /DCTDecode",
                image.width, image.height
            ),
            &image.data,
        );
        resources.push_str(&format!(" /XObject << /Bg {IMAGE} 0 R >>"));
    }
    resources.push_str(" >>");

    for (page, id) in layout.pages.iter().zip(&page_ids) {
        let contents = id + 1;
        writer.object(
            *id,
            &format!(
                "<< /Type /Page /Parent {PAGES} 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] /Resources {resources} /Contents {contents} 0 R >>"
            ),
        );
        writer.stream(contents, "", &page_content(page, background.is_some()));
    }

    writer.finish(CATALOG)
}
