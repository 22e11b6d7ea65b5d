//! PDF manipulation port and its lopdf implementation.
//!
//! The pipeline only talks to [`PdfToolkit`], [`PdfDocument`] and
//! [`PageCanvas`]; tests substitute recording fakes.

use std::collections::HashSet;
use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use thiserror::Error;

use crate::features::fields::ImageFormat;
use crate::features::projection::{PageGeometry, Point, PointBox};

/// Used when neither the page nor its ancestors carry a MediaBox.
pub const FALLBACK_PAGE: PageGeometry = PageGeometry::new(595.0, 842.0);

const FONT_RESOURCE: &str = "SignetHelv";
// Cubic Bézier control distance for a quarter circle.
const KAPPA: f64 = 0.552_284_749_8;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("pdf parse failed: {0}")]
    Parse(String),

    #[error("image decode failed: {0}")]
    Decode(String),

    #[error("page {0} out of range")]
    PageOutOfRange(usize),

    #[error("pdf operation failed: {0}")]
    Operation(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);

    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleStyle {
    pub fill: Option<Rgb>,
    pub border: Option<Rgb>,
    pub border_width: f64,
}

impl CircleStyle {
    pub const fn outline(color: Rgb, width: f64) -> Self {
        Self {
            fill: None,
            border: Some(color),
            border_width: width,
        }
    }

    pub const fn filled(color: Rgb) -> Self {
        Self {
            fill: Some(color),
            border: None,
            border_width: 0.0,
        }
    }
}

/// An image already embedded in the document, addressable by resource name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHandle {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

/// Drawing primitives on one page. Coordinates are PDF points, bottom-left
/// origin.
pub trait PageCanvas {
    fn embed_raster_image(
        &mut self,
        bytes: &[u8],
        format: ImageFormat,
    ) -> Result<ImageHandle, PdfError>;

    fn draw_image(&mut self, image: &ImageHandle, bbox: PointBox) -> Result<(), PdfError>;

    fn draw_text(
        &mut self,
        text: &str,
        origin: Point,
        font_size: f64,
        color: Rgb,
    ) -> Result<(), PdfError>;

    fn draw_circle(&mut self, center: Point, radius: f64, style: CircleStyle)
        -> Result<(), PdfError>;
}

pub trait PdfDocument {
    fn page_count(&self) -> usize;

    /// Zero-based page index.
    fn page_geometry(&self, index: usize) -> Result<PageGeometry, PdfError>;

    fn canvas<'a>(&'a mut self, index: usize) -> Result<Box<dyn PageCanvas + 'a>, PdfError>;

    fn serialize(&mut self) -> Result<Vec<u8>, PdfError>;
}

pub trait PdfToolkit: Send + Sync {
    fn load(&self, bytes: &[u8]) -> Result<Box<dyn PdfDocument>, PdfError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfToolkit;

impl PdfToolkit for LopdfToolkit {
    fn load(&self, bytes: &[u8]) -> Result<Box<dyn PdfDocument>, PdfError> {
        Ok(Box::new(LopdfDocument::load(bytes)?))
    }
}

pub struct LopdfDocument {
    doc: Document,
    pages: Vec<ObjectId>,
    isolated: HashSet<ObjectId>,
    font_id: Option<ObjectId>,
}

impl LopdfDocument {
    pub fn load(bytes: &[u8]) -> Result<Self, PdfError> {
        let doc = Document::load_mem(bytes).map_err(|e| PdfError::Parse(e.to_string()))?;
        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        if pages.is_empty() {
            return Err(PdfError::Parse("document has no pages".into()));
        }
        Ok(Self {
            doc,
            pages,
            isolated: HashSet::new(),
            font_id: None,
        })
    }

    fn page_id(&self, index: usize) -> Result<ObjectId, PdfError> {
        self.pages
            .get(index)
            .copied()
            .ok_or(PdfError::PageOutOfRange(index))
    }
}

impl PdfDocument for LopdfDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_geometry(&self, index: usize) -> Result<PageGeometry, PdfError> {
        page_dimensions(&self.doc, self.page_id(index)?)
    }

    fn canvas<'a>(&'a mut self, index: usize) -> Result<Box<dyn PageCanvas + 'a>, PdfError> {
        let page_id = self.page_id(index)?;
        Ok(Box::new(LopdfCanvas {
            doc: &mut self.doc,
            page_id,
            isolated: &mut self.isolated,
            font_id: &mut self.font_id,
        }))
    }

    fn serialize(&mut self) -> Result<Vec<u8>, PdfError> {
        let mut out = Vec::new();
        self.doc
            .save_to(&mut out)
            .map_err(|e| PdfError::Operation(format!("pdf_save_failed:{e}")))?;
        Ok(out)
    }
}

struct LopdfCanvas<'a> {
    doc: &'a mut Document,
    page_id: ObjectId,
    /// Pages whose original content is already wrapped in `q … Q`.
    isolated: &'a mut HashSet<ObjectId>,
    font_id: &'a mut Option<ObjectId>,
}

impl LopdfCanvas<'_> {
    /// The first draw on a page isolates its existing content, so a canvas
    /// that never draws leaves the page stream untouched.
    fn append(&mut self, operations: Vec<Operation>) -> Result<(), PdfError> {
        if !self.isolated.contains(&self.page_id) {
            isolate_existing_content(self.doc, self.page_id)?;
            self.isolated.insert(self.page_id);
        }
        let content = Content { operations }
            .encode()
            .map_err(|e| PdfError::Operation(format!("content_encode_failed:{e}")))?;
        self.doc
            .add_page_contents(self.page_id, content)
            .map_err(|e| PdfError::Operation(format!("add_content_failed:{e}")))
    }

    fn ensure_font(&mut self) -> Result<(), PdfError> {
        let font_id = match *self.font_id {
            Some(id) => id,
            None => {
                let id = self.doc.add_object(dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => "Helvetica",
                    "Encoding" => "WinAnsiEncoding",
                });
                *self.font_id = Some(id);
                id
            }
        };
        register_resource(
            self.doc,
            self.page_id,
            b"Font",
            FONT_RESOURCE,
            Object::Reference(font_id),
        )
    }
}

impl PageCanvas for LopdfCanvas<'_> {
    fn embed_raster_image(
        &mut self,
        bytes: &[u8],
        format: ImageFormat,
    ) -> Result<ImageHandle, PdfError> {
        let decoder_format = match format {
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
        };
        let img = image::load_from_memory_with_format(bytes, decoder_format)
            .map_err(|e| PdfError::Decode(e.to_string()))?
            .to_rgba8();
        let (img_w, img_h) = img.dimensions();
        if img_w == 0 || img_h == 0 {
            return Err(PdfError::Decode("image has no pixels".into()));
        }

        let mut rgb = Vec::with_capacity((img_w * img_h * 3) as usize);
        let mut alpha = Vec::with_capacity((img_w * img_h) as usize);
        for pixel in img.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel[3]);
        }

        let mut image_dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => img_w as i64,
            "Height" => img_h as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        };
        if alpha.iter().any(|a| *a != u8::MAX) {
            let smask_id = self.doc.add_object(compressed_stream(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => img_w as i64,
                    "Height" => img_h as i64,
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                },
                alpha,
            ));
            image_dict.set("SMask", smask_id);
        }
        let image_id = self.doc.add_object(compressed_stream(image_dict, rgb));

        let name = format!("SignetIm{}", image_id.0);
        register_resource(
            self.doc,
            self.page_id,
            b"XObject",
            &name,
            Object::Reference(image_id),
        )?;
        Ok(ImageHandle {
            name,
            width: img_w,
            height: img_h,
        })
    }

    fn draw_image(&mut self, image: &ImageHandle, bbox: PointBox) -> Result<(), PdfError> {
        self.append(vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    real(bbox.width),
                    real(0.0),
                    real(0.0),
                    real(bbox.height),
                    real(bbox.x),
                    real(bbox.y),
                ],
            ),
            Operation::new("Do", vec![Object::Name(image.name.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ])
    }

    fn draw_text(
        &mut self,
        text: &str,
        origin: Point,
        font_size: f64,
        color: Rgb,
    ) -> Result<(), PdfError> {
        self.ensure_font()?;
        self.append(vec![
            Operation::new("q", vec![]),
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![
                    Object::Name(FONT_RESOURCE.as_bytes().to_vec()),
                    real(font_size),
                ],
            ),
            Operation::new("rg", rgb_operands(color)),
            Operation::new("Td", vec![real(origin.x), real(origin.y)]),
            Operation::new(
                "Tj",
                vec![Object::String(win_ansi_bytes(text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ])
    }

    fn draw_circle(
        &mut self,
        center: Point,
        radius: f64,
        style: CircleStyle,
    ) -> Result<(), PdfError> {
        let mut ops = vec![Operation::new("q", vec![])];
        if let Some(fill) = style.fill {
            ops.push(Operation::new("rg", rgb_operands(fill)));
        }
        if let Some(border) = style.border {
            ops.push(Operation::new("RG", rgb_operands(border)));
            ops.push(Operation::new("w", vec![real(style.border_width)]));
        }
        ops.extend(circle_path(center, radius));
        let paint = match (style.fill.is_some(), style.border.is_some()) {
            (true, true) => "B",
            (true, false) => "f",
            (false, true) => "S",
            (false, false) => "n",
        };
        ops.push(Operation::new(paint, vec![]));
        ops.push(Operation::new("Q", vec![]));
        self.append(ops)
    }
}

fn real(value: f64) -> Object {
    Object::Real(value as _)
}

fn rgb_operands(color: Rgb) -> Vec<Object> {
    vec![real(color.r), real(color.g), real(color.b)]
}

fn deflate(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

fn compressed_stream(mut dict: Dictionary, content: Vec<u8>) -> Stream {
    match deflate(&content) {
        Ok(deflated) => {
            dict.set("Filter", "FlateDecode");
            Stream::new(dict, deflated)
        }
        Err(e) => {
            log::debug!("leaving image stream uncompressed: {e}");
            Stream::new(dict, content)
        }
    }
}

/// Four Bézier quarter arcs, counter-clockwise from the rightmost point.
fn circle_path(center: Point, radius: f64) -> Vec<Operation> {
    let (cx, cy, r) = (center.x, center.y, radius);
    let k = r * KAPPA;
    let curve = |x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64| {
        Operation::new(
            "c",
            vec![real(x1), real(y1), real(x2), real(y2), real(x3), real(y3)],
        )
    };
    vec![
        Operation::new("m", vec![real(cx + r), real(cy)]),
        curve(cx + r, cy + k, cx + k, cy + r, cx, cy + r),
        curve(cx - k, cy + r, cx - r, cy + k, cx - r, cy),
        curve(cx - r, cy - k, cx - k, cy - r, cx, cy - r),
        curve(cx + k, cy - r, cx + r, cy - k, cx + r, cy),
        Operation::new("h", vec![]),
    ]
}

/// Helvetica with WinAnsiEncoding covers Latin-1; anything else becomes `?`.
fn win_ansi_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            code @ 0x20..=0x7e | code @ 0xa0..=0xff => code as u8,
            _ => b'?',
        })
        .collect()
}

/// Wrap the page's current content in `q … Q` so a dangling transform in the
/// original stream cannot displace the overlay.
fn isolate_existing_content(doc: &mut Document, page_id: ObjectId) -> Result<(), PdfError> {
    let existing = {
        let page_dict = doc
            .get_object(page_id)
            .and_then(|o| o.as_dict())
            .map_err(|_| PdfError::Operation("page_missing_dict".into()))?;
        match page_dict.get(b"Contents") {
            Ok(Object::Reference(id)) => vec![Object::Reference(*id)],
            Ok(Object::Array(items)) => items.clone(),
            Ok(_) => return Err(PdfError::Operation("page_contents_invalid".into())),
            Err(_) => Vec::new(),
        }
    };
    if existing.is_empty() {
        return Ok(());
    }

    let open = doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
    let close = doc.add_object(Stream::new(dictionary! {}, b"\nQ\n".to_vec()));
    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(open));
    contents.extend(existing);
    contents.push(Object::Reference(close));

    let page_dict = doc
        .get_object_mut(page_id)
        .and_then(|o| o.as_dict_mut())
        .map_err(|_| PdfError::Operation("page_missing_dict".into()))?;
    page_dict.set("Contents", Object::Array(contents));
    Ok(())
}

/// Add `name → target` under `category` (Font, XObject) of the page's
/// resources. The page ends up with its own inline resource dictionary, so
/// shared or inherited dictionaries are never modified.
fn register_resource(
    doc: &mut Document,
    page_id: ObjectId,
    category: &[u8],
    name: &str,
    target: Object,
) -> Result<(), PdfError> {
    let mut resources = effective_resources(doc, page_id)?;
    let mut entries = match resources.get(category) {
        Ok(Object::Dictionary(dict)) => dict.clone(),
        Ok(Object::Reference(id)) => doc
            .get_dictionary(*id)
            .cloned()
            .unwrap_or_else(|_| Dictionary::new()),
        Ok(_) => return Err(PdfError::Operation("resource_category_invalid".into())),
        Err(_) => Dictionary::new(),
    };
    entries.set(name, target);
    resources.set(category, Object::Dictionary(entries));

    let page_dict = doc
        .get_object_mut(page_id)
        .and_then(|o| o.as_dict_mut())
        .map_err(|_| PdfError::Operation("page_missing_dict".into()))?;
    page_dict.set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// The page dictionary followed by each ancestor up the `/Parent` chain.
/// A chain that revisits a node is a malformed page tree.
fn page_ancestry(doc: &Document, page_id: ObjectId) -> Result<Vec<&Dictionary>, PdfError> {
    let mut chain = Vec::new();
    let mut visited = HashSet::new();
    let mut current = Some(page_id);
    while let Some(id) = current {
        if !visited.insert(id) {
            return Err(PdfError::Parse(format!(
                "page tree has a /Parent cycle at {} {} R",
                id.0, id.1
            )));
        }
        let dict = doc
            .get_object(id)
            .and_then(|o| o.as_dict())
            .map_err(|_| PdfError::Operation("page_missing_dict".into()))?;
        current = dict.get(b"Parent").and_then(|p| p.as_reference()).ok();
        chain.push(dict);
    }
    Ok(chain)
}

/// The resources that currently apply to the page: its own, or the nearest
/// ancestor's, resolved through references.
fn effective_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary, PdfError> {
    for dict in page_ancestry(doc, page_id)? {
        match dict.get(b"Resources") {
            Ok(Object::Dictionary(res)) => return Ok(res.clone()),
            Ok(Object::Reference(res_id)) => {
                return doc
                    .get_dictionary(*res_id)
                    .cloned()
                    .map_err(|_| PdfError::Operation("resources_missing_dict".into()));
            }
            Ok(_) => return Err(PdfError::Operation("resources_invalid".into())),
            Err(_) => {}
        }
    }
    Ok(Dictionary::new())
}

/// Walks up the page tree until a MediaBox is found.
pub fn page_dimensions(doc: &Document, page_id: ObjectId) -> Result<PageGeometry, PdfError> {
    for dict in page_ancestry(doc, page_id)? {
        if let Some((w, h)) = extract_media_box(doc, dict) {
            return Ok(PageGeometry::new(w, h));
        }
    }
    Ok(FALLBACK_PAGE)
}

fn extract_media_box(doc: &Document, dict: &Dictionary) -> Option<(f64, f64)> {
    let raw = dict.get(b"MediaBox").ok()?;
    let resolved = match raw {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let arr = resolved.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let llx = obj_to_f64(&arr[0])?;
    let lly = obj_to_f64(&arr[1])?;
    let urx = obj_to_f64(&arr[2])?;
    let ury = obj_to_f64(&arr[3])?;
    Some(((urx - llx).abs(), (ury - lly).abs()))
}

pub(crate) fn obj_to_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some((*f).into()),
        _ => None,
    }
}
