//! XFDF (ISO 19444-1) encoding of ink strokes
//!
//! One `<ink>` annotation per stroke, in ascending page order and paint order
//! within a page. Decoding is lenient: malformed attributes fall back to
//! defaults, malformed gesture points are skipped, and an XML syntax error
//! ends the scan while keeping the strokes already decoded.

use chrono::NaiveDateTime;
use ink_core::{BrushKind, Color, PageAnnotations, PagePoint, Stroke};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::{Cursor, Write};
use uuid::Uuid;

pub const XFDF_NAMESPACE: &str = "http://ns.adobe.com/xfdf/";
pub const XFDF_TRANSITION_NAMESPACE: &str = "http://ns.adobe.com/xfdf-transition/";

/// Generator name written to `<pdf-info>`
pub const APP_NAME: &str = "pdf-ink";

/// Format of the `creationdate` attribute
pub const PDF_DATE_FORMAT: &str = "D:%Y%m%d%H%M%S";

pub(crate) const DEFAULT_WIDTH: f32 = 2.0;
const DEFAULT_OPACITY: f32 = 1.0;

#[derive(Debug, thiserror::Error)]
pub enum XfdfError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encoded document is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("document has no <xfdf> root element")]
    MissingRoot,
    #[error("document ends inside an open element")]
    Truncated,
}

/// Encode `annotations` with freshly generated `ink-<uuid>` names
pub fn encode(annotations: &PageAnnotations, timestamp: NaiveDateTime) -> Result<String, XfdfError> {
    encode_with_names(annotations, timestamp, &mut || format!("ink-{}", Uuid::new_v4()))
}

/// Encode `annotations`, taking each annotation name from `next_name`
pub fn encode_with_names(
    annotations: &PageAnnotations,
    timestamp: NaiveDateTime,
    next_name: &mut impl FnMut() -> String,
) -> Result<String, XfdfError> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("xfdf");
    root.push_attribute(("xmlns", XFDF_NAMESPACE));
    root.push_attribute(("xml:space", "preserve"));
    writer.write_event(Event::Start(root))?;

    write_pdf_info(&mut writer)?;

    let creation_date = timestamp.format(PDF_DATE_FORMAT).to_string();
    writer.write_event(Event::Start(BytesStart::new("annots")))?;
    for stroke in annotations.strokes() {
        write_ink(&mut writer, stroke, &creation_date, &next_name())?;
    }
    writer.write_event(Event::End(BytesEnd::new("annots")))?;

    writer.write_event(Event::End(BytesEnd::new("xfdf")))?;

    let bytes = writer.into_inner().into_inner();
    Ok(String::from_utf8(bytes)?)
}

fn write_pdf_info<W: Write>(writer: &mut Writer<W>) -> Result<(), XfdfError> {
    let mut info = BytesStart::new("pdf-info");
    info.push_attribute(("xmlns", XFDF_TRANSITION_NAMESPACE));
    writer.write_event(Event::Start(info))?;
    write_simple_element(writer, "VersionID", "1")?;
    write_simple_element(writer, "AppName", APP_NAME)?;
    write_simple_element(writer, "AppVersion", env!("CARGO_PKG_VERSION"))?;
    writer.write_event(Event::End(BytesEnd::new("pdf-info")))?;
    Ok(())
}

fn write_simple_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    value: &str,
) -> Result<(), XfdfError> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_ink<W: Write>(
    writer: &mut Writer<W>,
    stroke: &Stroke,
    creation_date: &str,
    name: &str,
) -> Result<(), XfdfError> {
    let bounds = stroke.bounds();
    let rect = format!(
        "{:.2},{:.2},{:.2},{:.2}",
        bounds.min_x, bounds.min_y, bounds.max_x, bounds.max_y
    );
    let brush = stroke.brush();

    let mut ink = BytesStart::new("ink");
    ink.push_attribute(("page", stroke.page_index().to_string().as_str()));
    ink.push_attribute(("rect", rect.as_str()));
    ink.push_attribute(("color", stroke.color().to_hex().as_str()));
    ink.push_attribute(("width", format!("{:.1}", stroke.width()).as_str()));
    ink.push_attribute(("opacity", format!("{:.1}", brush.opacity()).as_str()));
    ink.push_attribute(("subject", brush.subject()));
    ink.push_attribute(("creationdate", creation_date));
    ink.push_attribute(("name", name));
    writer.write_event(Event::Start(ink))?;

    writer.write_event(Event::Start(BytesStart::new("inklist")))?;
    write_simple_element(writer, "gesture", &format_gesture(stroke.points()))?;
    writer.write_event(Event::End(BytesEnd::new("inklist")))?;

    writer.write_event(Event::Empty(BytesStart::new("popup")))?;
    writer.write_event(Event::End(BytesEnd::new("ink")))?;
    Ok(())
}

fn format_gesture(points: &[PagePoint]) -> String {
    points
        .iter()
        .map(|p| format!("{:.2},{:.2}", p.x, p.y))
        .collect::<Vec<_>>()
        .join(";")
}

/// Decode every `<ink>` element of `text`, never failing
pub fn decode(text: &str) -> PageAnnotations {
    scan(text, false).unwrap_or_default()
}

/// Decode `text`, rejecting XML syntax errors, truncated documents and
/// documents without an `<xfdf>` root
///
/// Individual malformed annotations are still recovered as in [`decode`].
pub fn validate(text: &str) -> Result<PageAnnotations, XfdfError> {
    scan(text, true)
}

/// Ink annotation being decoded
struct InkBuilder {
    page_index: u32,
    color: Color,
    width: f32,
    brush: BrushKind,
    points: Vec<PagePoint>,
}

impl InkBuilder {
    fn from_element(element: &BytesStart<'_>) -> Self {
        let mut page_index = 0;
        let mut color = Color::BLACK;
        let mut width = DEFAULT_WIDTH;
        let mut subject = None;
        let mut opacity = DEFAULT_OPACITY;

        for attribute in element.attributes() {
            let attribute = match attribute {
                Ok(attribute) => attribute,
                Err(err) => {
                    tracing::warn!(%err, "skipping malformed ink attribute");
                    continue;
                }
            };
            let value = match attribute.unescape_value() {
                Ok(value) => value,
                Err(err) => {
                    tracing::warn!(%err, "skipping undecodable ink attribute");
                    continue;
                }
            };

            match attribute.key.local_name().as_ref() {
                b"page" => page_index = parse_or(&value, "page", 0),
                b"color" => {
                    color = Color::from_hex(&value).unwrap_or_else(|| {
                        tracing::warn!(value = %value, "invalid ink color, using black");
                        Color::BLACK
                    })
                }
                b"width" => width = parse_width(&value),
                b"subject" => subject = BrushKind::from_subject(value.trim()),
                b"opacity" => opacity = parse_or(&value, "opacity", DEFAULT_OPACITY),
                _ => {}
            }
        }

        Self {
            page_index,
            color,
            width,
            brush: subject.unwrap_or_else(|| BrushKind::from_opacity(opacity)),
            points: Vec::new(),
        }
    }

    fn finish(self) -> Option<Stroke> {
        let stroke = Stroke::new(self.page_index, self.color, self.width, self.brush, &self.points);
        if stroke.is_none() {
            tracing::debug!(
                page = self.page_index,
                points = self.points.len(),
                "dropping ink annotation with fewer than two points"
            );
        }
        stroke
    }
}

fn parse_or<T: std::str::FromStr>(value: &str, attribute: &str, default: T) -> T {
    value.trim().parse().unwrap_or_else(|_| {
        tracing::warn!(attribute, value, "invalid ink attribute, using default");
        default
    })
}

/// Stroke widths must be finite and positive
pub(crate) fn positive_width(width: f32) -> Option<f32> {
    (width.is_finite() && width > 0.0).then_some(width)
}

fn parse_width(value: &str) -> f32 {
    value.trim().parse().ok().and_then(positive_width).unwrap_or_else(|| {
        tracing::warn!(value, "invalid ink width, using default");
        DEFAULT_WIDTH
    })
}

/// Parse `x1,y1;x2,y2;...`, skipping malformed pairs
fn parse_gesture(text: &str) -> Vec<PagePoint> {
    text.split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let point = parse_point(pair);
            if point.is_none() {
                tracing::warn!(pair, "skipping malformed gesture point");
            }
            point
        })
        .collect()
}

fn parse_point(pair: &str) -> Option<PagePoint> {
    let mut coords = pair.split(',');
    let (x, y) = (coords.next()?, coords.next()?);
    let x: f32 = x.trim().parse().ok()?;
    let y: f32 = y.trim().parse().ok()?;
    (x.is_finite() && y.is_finite()).then(|| PagePoint::new(x, y))
}

fn scan(text: &str, strict: bool) -> Result<PageAnnotations, XfdfError> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);

    let mut strokes = Vec::new();
    let mut current: Option<InkBuilder> = None;
    let mut gesture: Option<String> = None;
    let mut root: Option<bool> = None;
    let mut depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => {
                depth += 1;
                let name = element.local_name();
                root.get_or_insert(name.as_ref() == b"xfdf");
                match name.as_ref() {
                    b"ink" => current = Some(InkBuilder::from_element(&element)),
                    b"gesture" if current.is_some() => gesture = Some(String::new()),
                    _ => {}
                }
            }
            Ok(Event::Empty(element)) => {
                let name = element.local_name();
                root.get_or_insert(name.as_ref() == b"xfdf");
                if name.as_ref() == b"ink" {
                    tracing::debug!("dropping ink annotation without gestures");
                }
            }
            Ok(Event::Text(content)) => {
                if let Some(buffer) = gesture.as_mut() {
                    match content.unescape() {
                        Ok(content) => buffer.push_str(&content),
                        Err(err) => tracing::warn!(%err, "skipping undecodable gesture text"),
                    }
                }
            }
            Ok(Event::End(element)) => {
                depth = depth.saturating_sub(1);
                match element.local_name().as_ref() {
                    b"gesture" => {
                        if let (Some(buffer), Some(ink)) = (gesture.take(), current.as_mut()) {
                            ink.points.extend(parse_gesture(&buffer));
                        }
                    }
                    b"ink" => {
                        gesture = None;
                        if let Some(stroke) = current.take().and_then(InkBuilder::finish) {
                            strokes.push(stroke);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                if strict {
                    return Err(err.into());
                }
                tracing::warn!(
                    position = reader.buffer_position(),
                    %err,
                    recovered = strokes.len(),
                    "XFDF syntax error, keeping strokes decoded so far"
                );
                break;
            }
        }
    }

    if strict && root != Some(true) {
        return Err(XfdfError::MissingRoot);
    }
    if strict && depth > 0 {
        return Err(XfdfError::Truncated);
    }
    Ok(PageAnnotations::from_strokes(strokes))
}
