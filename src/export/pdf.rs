//! Paginated A4 PDF output for print documents.
//!
//! Text is set in the standard Helvetica faces with WinAnsi encoding, so no
//! fonts are embedded. A logo is embedded when it is a JPEG or an 8-bit,
//! non-interlaced grayscale or RGB PNG; both are passed through without
//! re-encoding.

use super::template::PrintDocument;
use super::Logo;
use std::io::Write;

const PAGE_WIDTH: f64 = 595.28;
const PAGE_HEIGHT: f64 = 841.89;
const MARGIN: f64 = 50.0;
const CONTENT_WIDTH: f64 = PAGE_WIDTH - 2.0 * MARGIN;
const LABEL_WIDTH: f64 = 130.0;
const LINE_FACTOR: f64 = 1.4;
// Average Helvetica advance as a fraction of the font size, rounded up
const CHAR_WIDTH_FACTOR: f64 = 0.55;
const LOGO_MAX_WIDTH: f64 = 140.0;
const LOGO_MAX_HEIGHT: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(&self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

/// Encode text as a PDF literal string body in WinAnsiEncoding.
fn encode_text(text: &str, out: &mut Vec<u8>) {
    for c in text.chars() {
        let byte = match c {
            '(' | ')' | '\\' => {
                out.push(b'\\');
                c as u8
            }
            '\u{20ac}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201c}' => 0x93,
            '\u{201d}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            c if c.is_control() => b' ',
            c if (c as u32) < 0x80 || (0xa0..=0xff).contains(&(c as u32)) => c as u32 as u8,
            _ => b'?',
        };
        out.push(byte);
    }
}

fn text_width(text: &str, size: f64) -> f64 {
    text.chars().count() as f64 * size * CHAR_WIDTH_FACTOR
}

/// Greedy word wrap to at most `max_chars` per line. Words longer than a
/// line are split.
fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if line_len > 0 {
                lines.push(std::mem::take(&mut line));
                line_len = 0;
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let needed = if line_len == 0 { word.len() } else { line_len + 1 + word.len() };
        if needed > max_chars && line_len > 0 {
            lines.push(std::mem::take(&mut line));
            line_len = 0;
        }
        if line_len > 0 {
            line.push(' ');
            line_len += 1;
        }
        line.extend(word.iter());
        line_len += word.len();
    }
    if line_len > 0 || lines.is_empty() {
        lines.push(line);
    }
    lines
}

/// Image ready to embed as an XObject.
#[derive(Debug, Clone, PartialEq)]
struct PdfImage {
    width: u32,
    height: u32,
    /// Dictionary entries other than size and length
    dict: String,
    data: Vec<u8>,
}

fn be16(bytes: &[u8], at: usize) -> Option<u32> {
    Some(u32::from(u16::from_be_bytes([*bytes.get(at)?, *bytes.get(at + 1)?])))
}

fn be32(bytes: &[u8], at: usize) -> Option<u32> {
    Some(u32::from_be_bytes(bytes.get(at..at + 4)?.try_into().ok()?))
}

fn jpeg_image(bytes: &[u8]) -> Option<PdfImage> {
    if !bytes.starts_with(&[0xff, 0xd8]) {
        return None;
    }
    let mut i = 2;
    while i + 4 <= bytes.len() {
        if bytes[i] != 0xff {
            return None;
        }
        let marker = bytes[i + 1];
        if marker == 0xff {
            i += 1;
            continue;
        }
        if marker == 0x01 || (0xd0..=0xd9).contains(&marker) {
            i += 2;
            continue;
        }
        let segment_len = be16(bytes, i + 2)? as usize;
        let is_frame = (0xc0..=0xcf).contains(&marker) && ![0xc4, 0xc8, 0xcc].contains(&marker);
        if is_frame {
            let bits = *bytes.get(i + 4)?;
            let height = be16(bytes, i + 5)?;
            let width = be16(bytes, i + 7)?;
            let color_space = match bytes.get(i + 9)? {
                1 => "/DeviceGray",
                3 => "/DeviceRGB",
                4 => "/DeviceCMYK",
                _ => return None,
            };
            return Some(PdfImage {
                width,
                height,
                dict: format!(
                    "/ColorSpace {} /BitsPerComponent {} /Filter /DCTDecode",
                    color_space, bits
                ),
                data: bytes.to_vec(),
            });
        }
        i += 2 + segment_len;
    }
    None
}

fn png_image(bytes: &[u8]) -> Option<PdfImage> {
    const SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
    if !bytes.starts_with(SIGNATURE) {
        return None;
    }

    let mut i = SIGNATURE.len();
    let mut header = None;
    let mut data = Vec::new();
    while i + 8 <= bytes.len() {
        let len = be32(bytes, i)? as usize;
        let kind = bytes.get(i + 4..i + 8)?;
        let body = bytes.get(i + 8..i + 8 + len)?;
        match kind {
            b"IHDR" => {
                let width = be32(body, 0)?;
                let height = be32(body, 4)?;
                let (depth, color, interlace) = (*body.get(8)?, *body.get(9)?, *body.get(12)?);
                header = Some((width, height, depth, color, interlace));
            }
            b"IDAT" => data.extend_from_slice(body),
            b"IEND" => break,
            _ => {}
        }
        i += 12 + len;
    }

    let (width, height, depth, color, interlace) = header?;
    let (colors, color_space) = match color {
        0 => (1, "/DeviceGray"),
        2 => (3, "/DeviceRGB"),
        _ => return None,
    };
    if depth != 8 || interlace != 0 || data.is_empty() {
        return None;
    }

    Some(PdfImage {
        width,
        height,
        dict: format!(
            "/ColorSpace {} /BitsPerComponent 8 /Filter /FlateDecode \
             /DecodeParms << /Predictor 15 /Colors {} /BitsPerComponent 8 /Columns {} >>",
            color_space, colors, width
        ),
        data,
    })
}

fn pdf_image(logo: &Logo) -> Option<PdfImage> {
    let image = jpeg_image(&logo.bytes).or_else(|| png_image(&logo.bytes));
    if image.is_none() {
        tracing::debug!(mime = logo.mime, "logo format cannot be embedded in PDF, skipping");
    }
    image
}

/// Page-by-page content stream builder.
struct Layout {
    pages: Vec<Vec<u8>>,
    current: Vec<u8>,
    y: f64,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Vec::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn new_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.current));
        self.y = PAGE_HEIGHT - MARGIN;
    }

    /// Move down by `height`, breaking the page first if it does not fit.
    fn advance(&mut self, height: f64) {
        if self.y - height < MARGIN {
            self.new_page();
        }
        self.y -= height;
    }

    fn text_at(&mut self, font: Font, size: f64, x: f64, y: f64, text: &str) {
        let _ = write!(self.current, "BT /{} {} Tf {:.2} {:.2} Td (", font.resource(), size, x, y);
        encode_text(text, &mut self.current);
        self.current.extend_from_slice(b") Tj ET\n");
    }

    fn paragraph(&mut self, font: Font, size: f64, x: f64, width: f64, text: &str) {
        let max_chars = (width / (size * CHAR_WIDTH_FACTOR)).floor() as usize;
        for line in wrap(text, max_chars) {
            self.advance(size * LINE_FACTOR);
            let y = self.y;
            self.text_at(font, size, x, y, &line);
        }
    }

    /// Label in bold on the left, wrapped value on the right.
    fn row(&mut self, label: &str, value: &str) {
        let size = 10.0;
        let max_chars = ((CONTENT_WIDTH - LABEL_WIDTH) / (size * CHAR_WIDTH_FACTOR)).floor() as usize;
        let lines = wrap(value, max_chars);
        for (index, line) in lines.iter().enumerate() {
            self.advance(size * LINE_FACTOR);
            let y = self.y;
            if index == 0 {
                self.text_at(Font::Bold, size, MARGIN, y, label);
            }
            self.text_at(Font::Regular, size, MARGIN + LABEL_WIDTH, y, line);
        }
    }

    fn rule(&mut self) {
        self.advance(8.0);
        let _ = writeln!(
            self.current,
            "0.6 w {:.2} {:.2} m {:.2} {:.2} l S",
            MARGIN,
            self.y,
            PAGE_WIDTH - MARGIN,
            self.y
        );
    }

    fn gap(&mut self, height: f64) {
        self.advance(height);
    }

    fn finish(mut self) -> Vec<Vec<u8>> {
        self.pages.push(self.current);
        self.pages
    }
}

fn layout(doc: &PrintDocument, logo: Option<&PdfImage>) -> Vec<Vec<u8>> {
    let mut layout = Layout::new();

    // Header: logo on the left, project name on the right
    let mut header_height: f64 = 14.0;
    if let Some(image) = logo {
        let scale = (LOGO_MAX_WIDTH / f64::from(image.width))
            .min(LOGO_MAX_HEIGHT / f64::from(image.height))
            .min(1.0);
        let (w, h) = (f64::from(image.width) * scale, f64::from(image.height) * scale);
        let _ = writeln!(
            layout.current,
            "q {:.2} 0 0 {:.2} {:.2} {:.2} cm /Im1 Do Q",
            w,
            h,
            MARGIN,
            PAGE_HEIGHT - MARGIN - h
        );
        header_height = header_height.max(h);
    }
    let name_x = (PAGE_WIDTH - MARGIN - text_width(&doc.project_name, 12.0)).max(MARGIN + LOGO_MAX_WIDTH + 10.0);
    layout.text_at(Font::Bold, 12.0, name_x, PAGE_HEIGHT - MARGIN - 12.0, &doc.project_name);
    layout.y -= header_height;
    layout.rule();

    layout.gap(6.0);
    layout.paragraph(Font::Bold, 16.0, MARGIN, CONTENT_WIDTH, &doc.title);
    layout.gap(6.0);

    for field in &doc.fields {
        layout.row(field.label, &field.value);
    }

    if !doc.data.is_empty() {
        layout.gap(10.0);
        layout.paragraph(Font::Bold, 12.0, MARGIN, CONTENT_WIDTH, "Data");
        for (key, value) in &doc.data {
            layout.row(key, value);
        }
    }

    layout.gap(10.0);
    layout.paragraph(Font::Bold, 12.0, MARGIN, CONTENT_WIDTH, "Description");
    for line in doc.description_lines() {
        layout.paragraph(Font::Regular, 10.0, MARGIN, CONTENT_WIDTH, &line);
    }

    layout.finish()
}

/// Serialize pages into a PDF file.
fn write_pdf(title: &str, pages: Vec<Vec<u8>>, logo: Option<&PdfImage>) -> Vec<u8> {
    const CATALOG: usize = 1;
    const PAGES: usize = 2;
    const FONT_REGULAR: usize = 3;
    const FONT_BOLD: usize = 4;
    const INFO: usize = 5;
    const IMAGE: usize = 6;

    let first_page = if logo.is_some() { IMAGE + 1 } else { IMAGE };
    let page_count = pages.len();
    let object_count = first_page + 2 * page_count;

    let mut out: Vec<u8> = Vec::new();
    let mut offsets = vec![0usize; object_count];

    out.extend_from_slice(b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n");

    let mut object = |out: &mut Vec<u8>, id: usize, body: &[u8]| {
        offsets[id] = out.len();
        let _ = write!(out, "{} 0 obj\n", id);
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    };

    object(&mut out, CATALOG, b"<< /Type /Catalog /Pages 2 0 R >>");

    let kids: Vec<String> = (0..page_count)
        .map(|i| format!("{} 0 R", first_page + 2 * i))
        .collect();
    object(
        &mut out,
        PAGES,
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), page_count).as_bytes(),
    );
    object(
        &mut out,
        FONT_REGULAR,
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>",
    );
    object(
        &mut out,
        FONT_BOLD,
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>",
    );

    let mut info = b"<< /Producer (testdoc) /Title (".to_vec();
    encode_text(title, &mut info);
    info.extend_from_slice(b") >>");
    object(&mut out, INFO, &info);

    if let Some(image) = logo {
        let mut body = format!(
            "<< /Type /XObject /Subtype /Image /Width {} /Height {} {} /Length {} >>\nstream\n",
            image.width,
            image.height,
            image.dict,
            image.data.len()
        )
        .into_bytes();
        body.extend_from_slice(&image.data);
        body.extend_from_slice(b"\nendstream");
        object(&mut out, IMAGE, &body);
    }

    let xobjects = if logo.is_some() {
        format!(" /XObject << /Im1 {} 0 R >>", IMAGE)
    } else {
        String::new()
    };

    for (index, mut content) in pages.into_iter().enumerate() {
        let page_id = first_page + 2 * index;
        let content_id = page_id + 1;

        let footer = format!("Page {} / {}", index + 1, page_count);
        let footer_x = PAGE_WIDTH - MARGIN - text_width(&footer, 8.0);
        let _ = writeln!(
            content,
            "BT /F1 8 Tf {:.2} {:.2} Td ({}) Tj ET",
            footer_x,
            MARGIN / 2.0,
            footer
        );

        object(
            &mut out,
            page_id,
            format!(
                "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] \
                 /Resources << /Font << /F1 {} 0 R /F2 {} 0 R >>{} >> /Contents {} 0 R >>",
                PAGES, PAGE_WIDTH, PAGE_HEIGHT, FONT_REGULAR, FONT_BOLD, xobjects, content_id
            )
            .as_bytes(),
        );

        let mut body = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
        body.extend_from_slice(&content);
        body.extend_from_slice(b"\nendstream");
        object(&mut out, content_id, &body);
    }

    let xref_offset = out.len();
    let _ = write!(out, "xref\n0 {}\n0000000000 65535 f \n", object_count);
    for offset in offsets.iter().skip(1) {
        let _ = write!(out, "{:010} 00000 n \n", offset);
    }
    let _ = write!(
        out,
        "trailer\n<< /Size {} /Root {} 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
        object_count, CATALOG, INFO, xref_offset
    );
    out
}

/// Render a print document as PDF bytes.
pub fn render_pdf(doc: &PrintDocument) -> Vec<u8> {
    let image = doc.logo.as_ref().and_then(pdf_image);
    let pages = layout(doc, image.as_ref());
    write_pdf(&doc.title, pages, image.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::PrintJob;
    use crate::models::TestRecord;

    fn print_doc(description: &str, logo: Option<&Logo>) -> PrintDocument {
        let mut record = TestRecord::new("t1".into(), "Alta cliente".into(), "QA".into());
        record.description = description.to_string();
        PrintDocument::build(&PrintJob {
            record: &record,
            project_name: "Banca (móvil)",
            logo,
        })
    }

    fn count(haystack: &[u8], needle: &[u8]) -> usize {
        haystack.windows(needle.len()).filter(|w| *w == needle).count()
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("one two three", 7), vec!["one two", "three"]);
        assert_eq!(wrap("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap("", 10), vec![""]);
        assert_eq!(wrap("a   b", 10), vec!["a b"]);
    }

    #[test]
    fn test_encode_text_escapes_and_maps() {
        let mut out = Vec::new();
        encode_text("(á) \\ € 漢", &mut out);
        assert_eq!(out, b"\\(\xe1\\) \\\\ \x80 ?".to_vec());
    }

    #[test]
    fn test_single_page_structure() {
        let pdf = render_pdf(&print_doc("<p>short</p>", None));
        assert!(pdf.starts_with(b"%PDF-1.4\n"));
        assert!(pdf.ends_with(b"%%EOF\n"));
        assert_eq!(count(&pdf, b"/Type /Page "), 1);
        assert!(find(&pdf, b"/Count 1").is_some());
        assert!(find(&pdf, b"(Page 1 / 1)").is_some());
        assert!(find(&pdf, b"Banca \\(m\xf3vil\\)").is_some());
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let pdf = render_pdf(&print_doc("<p>x</p>", None));
        let start = find(&pdf, b"startxref\n").unwrap() + b"startxref\n".len();
        let end = start + pdf[start..].iter().position(|b| *b == b'\n').unwrap();
        let xref: usize = std::str::from_utf8(&pdf[start..end]).unwrap().parse().unwrap();
        assert!(pdf[xref..].starts_with(b"xref\n"));

        let table = std::str::from_utf8(&pdf[xref..]).unwrap();
        for (id, line) in table.lines().skip(3).take_while(|l| l.ends_with(" n")).enumerate() {
            let offset: usize = line[..10].parse().unwrap();
            let expected = format!("{} 0 obj", id + 1);
            assert!(pdf[offset..].starts_with(expected.as_bytes()), "object {}", id + 1);
        }
    }

    #[test]
    fn test_long_description_paginates() {
        let paragraph = format!("<p>{}</p>", "evidence ".repeat(40));
        let pdf = render_pdf(&print_doc(&paragraph.repeat(30), None));
        let pages = count(&pdf, b"/Type /Page ");
        assert!(pages >= 2, "expected several pages, got {}", pages);
        assert!(find(&pdf, format!("/Count {}", pages).as_bytes()).is_some());
        assert!(find(&pdf, format!("(Page {} / {})", pages, pages).as_bytes()).is_some());
    }

    #[test]
    fn test_jpeg_logo_is_embedded() {
        let mut jpeg = vec![0xff, 0xd8, 0xff, 0xe0, 0x00, 0x04, 0x00, 0x00];
        jpeg.extend_from_slice(&[0xff, 0xc0, 0x00, 0x11, 0x08, 0x00, 0x10, 0x00, 0x20, 0x03]);
        jpeg.extend_from_slice(&[0u8; 9]);
        jpeg.extend_from_slice(&[0xff, 0xd9]);

        let image = jpeg_image(&jpeg).unwrap();
        assert_eq!((image.width, image.height), (32, 16));

        let logo = Logo::from_bytes(jpeg);
        let pdf = render_pdf(&print_doc("<p>x</p>", Some(&logo)));
        assert!(find(&pdf, b"/Filter /DCTDecode").is_some());
        assert!(find(&pdf, b"/Im1 Do").is_some());
    }

    #[test]
    fn test_png_header_parsing() {
        let mut png = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
        let mut ihdr = Vec::new();
        ihdr.extend_from_slice(&4u32.to_be_bytes());
        ihdr.extend_from_slice(&2u32.to_be_bytes());
        ihdr.extend_from_slice(&[8, 2, 0, 0, 0]);
        for (kind, body) in [(&b"IHDR"[..], ihdr.as_slice()), (&b"IDAT"[..], &[1u8, 2, 3][..]), (&b"IEND"[..], &[][..])] {
            png.extend_from_slice(&(body.len() as u32).to_be_bytes());
            png.extend_from_slice(kind);
            png.extend_from_slice(body);
            png.extend_from_slice(&[0, 0, 0, 0]);
        }

        let image = png_image(&png).unwrap();
        assert_eq!((image.width, image.height), (4, 2));
        assert_eq!(image.data, vec![1, 2, 3]);
        assert!(image.dict.contains("/Colors 3"));

        // RGBA is not passed through
        let rgba_at = 8 + 8 + 9;
        png[rgba_at] = 6;
        assert!(png_image(&png).is_none());
    }

    #[test]
    fn test_unsupported_logo_is_skipped() {
        let logo = Logo::from_bytes(b"GIF89a....".to_vec());
        let pdf = render_pdf(&print_doc("<p>x</p>", Some(&logo)));
        assert!(find(&pdf, b"/XObject").is_none());
    }
}
