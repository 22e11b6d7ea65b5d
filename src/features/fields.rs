//! Field descriptors: the wire form sent by callers and the closed,
//! validated form the renderer consumes.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{SignError, SignResult};
use crate::features::coordinates::{clamp_coordinates, validate_coordinates, NormalizedRect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Signature,
    Image,
    Date,
    SingleChoice,
}

impl FieldKind {
    pub fn wire_tag(self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Signature => "signature",
            FieldKind::Image => "image",
            FieldKind::Date => "date",
            FieldKind::SingleChoice => "radio",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    /// PNG unless the media type explicitly says JPEG.
    pub fn from_media_type(media_type: Option<&str>) -> Self {
        match media_type.map(|m| m.trim().to_ascii_lowercase()) {
            Some(m) if m == "image/jpeg" || m == "image/jpg" => ImageFormat::Jpeg,
            _ => ImageFormat::Png,
        }
    }

    pub fn media_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChoiceState {
    Selected,
    Unselected,
}

impl ChoiceState {
    pub fn from_wire(content: &str) -> Self {
        if content == "selected" {
            ChoiceState::Selected
        } else {
            ChoiceState::Unselected
        }
    }
}

/// A still-encoded raster payload. Decoding happens at render time so a bad
/// payload only costs its own field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub encoded: String,
    pub format: ImageFormat,
}

impl ImagePayload {
    /// Accepts a `data:<media>;base64,<data>` URL or bare base64.
    pub fn from_content(content: &str) -> Self {
        let trimmed = content.trim();
        match trimmed.strip_prefix("data:").and_then(|rest| rest.split_once(',')) {
            Some((header, data)) => {
                let media_type = header.split(';').next().filter(|m| !m.is_empty());
                Self {
                    encoded: data.to_string(),
                    format: ImageFormat::from_media_type(media_type),
                }
            }
            None => Self {
                encoded: trimmed.to_string(),
                format: ImageFormat::Png,
            },
        }
    }

    pub fn from_bytes(bytes: &[u8], format: ImageFormat) -> Self {
        Self {
            encoded: B64.encode(bytes),
            format,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.encoded.trim().is_empty()
    }

    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        let compact: String = self
            .encoded
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        B64.decode(compact.as_bytes())
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.format.media_type(), self.encoded)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldContent {
    Text(String),
    Date(String),
    Signature(ImagePayload),
    Image(ImagePayload),
    SingleChoice(ChoiceState),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub content: FieldContent,
    pub rect: NormalizedRect,
}

impl FieldDescriptor {
    pub fn new(content: FieldContent, rect: NormalizedRect) -> Self {
        Self { content, rect }
    }

    pub fn kind(&self) -> FieldKind {
        match self.content {
            FieldContent::Text(_) => FieldKind::Text,
            FieldContent::Date(_) => FieldKind::Date,
            FieldContent::Signature(_) => FieldKind::Signature,
            FieldContent::Image(_) => FieldKind::Image,
            FieldContent::SingleChoice(_) => FieldKind::SingleChoice,
        }
    }

    fn is_filled_signature(&self) -> bool {
        matches!(&self.content, FieldContent::Signature(payload) if !payload.is_empty())
    }

    pub fn from_wire(wire: &WireField) -> SignResult<Self> {
        let rect = wire
            .coordinates
            .ok_or_else(|| SignError::Validation(format!("{} field has no coordinates", wire.kind)))
            .and_then(normalize_rect)?;

        let content = match wire.kind.as_str() {
            "text" => FieldContent::Text(wire.content.clone()),
            "date" => FieldContent::Date(wire.content.clone()),
            "signature" => FieldContent::Signature(ImagePayload::from_content(&wire.content)),
            "image" => FieldContent::Image(ImagePayload::from_content(&wire.content)),
            "radio" => FieldContent::SingleChoice(ChoiceState::from_wire(&wire.content)),
            other => return Err(SignError::UnsupportedKind(other.to_string())),
        };
        Ok(Self { content, rect })
    }

    pub fn to_wire(&self) -> WireField {
        let content = match &self.content {
            FieldContent::Text(text) | FieldContent::Date(text) => text.clone(),
            FieldContent::Signature(payload) | FieldContent::Image(payload) => {
                payload.to_data_url()
            }
            FieldContent::SingleChoice(ChoiceState::Selected) => "selected".into(),
            FieldContent::SingleChoice(ChoiceState::Unselected) => "unselected".into(),
        };
        WireField {
            kind: self.kind().wire_tag().to_string(),
            content,
            coordinates: Some(self.rect),
        }
    }
}

/// Out-of-range rects are clamped; rects that are non-finite or collapse to
/// zero size are rejected.
fn normalize_rect(rect: NormalizedRect) -> SignResult<NormalizedRect> {
    if validate_coordinates(&rect) {
        return Ok(rect);
    }
    if ![rect.x, rect.y, rect.width, rect.height]
        .iter()
        .all(|v| v.is_finite())
    {
        return Err(SignError::Validation(
            "coordinates must be finite numbers".into(),
        ));
    }
    let clamped = clamp_coordinates(&rect);
    if !validate_coordinates(&clamped) {
        return Err(SignError::Validation(
            "field width and height must be positive".into(),
        ));
    }
    log::debug!("clamped out-of-range coordinates {rect:?} to {clamped:?}");
    Ok(clamped)
}

/// One field as it arrives on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireField {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub coordinates: Option<NormalizedRect>,
}

/// An ordered, non-empty field list carrying at least one filled signature.
#[derive(Debug, Clone, PartialEq)]
pub struct SigningRequest {
    fields: Vec<FieldDescriptor>,
}

impl SigningRequest {
    /// Every rect goes through the same clamp-then-validate step as wire
    /// input, so hand-built descriptors cannot carry NaN or zero-size boxes.
    pub fn new(fields: Vec<FieldDescriptor>) -> SignResult<Self> {
        if fields.is_empty() {
            return Err(SignError::Validation("Fields array is required".into()));
        }
        if !fields.iter().any(FieldDescriptor::is_filled_signature) {
            return Err(SignError::Validation(
                "At least one filled signature field is required".into(),
            ));
        }
        let fields = fields
            .into_iter()
            .map(|mut field| {
                field.rect = normalize_rect(field.rect)?;
                Ok(field)
            })
            .collect::<SignResult<Vec<_>>>()?;
        Ok(Self { fields })
    }

    pub fn from_wire(wire: &[WireField]) -> SignResult<Self> {
        let fields = wire
            .iter()
            .map(FieldDescriptor::from_wire)
            .collect::<SignResult<Vec<_>>>()?;
        Self::new(fields)
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
