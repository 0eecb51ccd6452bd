use std::sync::Arc;

use crate::foundation::error::{CampaignError, CampaignResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color carried through Parley layouts.
pub struct TextBrushRgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Overlay font parsed once and shared by every text overlay of a run.
///
/// Holds the Parley blob used for layout and the `vello_cpu` font data used for glyph
/// drawing. Clones share the underlying bytes.
#[derive(Clone)]
pub struct OverlayFont {
    blob: parley::fontique::Blob<u8>,
    data: vello_cpu::peniko::FontData,
    family_name: Arc<str>,
}

impl std::fmt::Debug for OverlayFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayFont")
            .field("family_name", &self.family_name)
            .field("bytes_len", &self.blob.data().len())
            .finish()
    }
}

impl OverlayFont {
    /// Parse `bytes` and resolve the family name. Fails for empty or unparseable fonts.
    pub fn from_bytes(bytes: Vec<u8>) -> CampaignResult<Self> {
        if bytes.is_empty() {
            return Err(CampaignError::text("font file is empty"));
        }
        let data =
            vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(bytes.clone()), 0);
        let blob = parley::fontique::Blob::from(bytes);

        let mut font_ctx = parley::FontContext::default();
        let family_name = register(&mut font_ctx, &blob)?;
        Ok(Self {
            blob,
            data,
            family_name: Arc::from(family_name),
        })
    }

    pub fn load(path: &std::path::Path) -> CampaignResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| CampaignError::io(path, e))?;
        Self::from_bytes(bytes)
    }

    pub fn family_name(&self) -> &str {
        &self.family_name
    }

    pub(crate) fn font_data(&self) -> &vello_cpu::peniko::FontData {
        &self.data
    }
}

/// Register `blob` in `font_ctx` and return the name of its first family.
fn register(
    font_ctx: &mut parley::FontContext,
    blob: &parley::fontique::Blob<u8>,
) -> CampaignResult<String> {
    let families = font_ctx.collection.register_fonts(blob.clone(), None);
    let family_id = families
        .first()
        .map(|(id, _)| *id)
        .ok_or_else(|| CampaignError::text("no font families registered from font bytes"))?;
    font_ctx
        .collection
        .family_name(family_id)
        .map(str::to_string)
        .ok_or_else(|| CampaignError::text("registered font family has no name"))
}

/// Parley contexts for laying out overlay text in a single font.
pub struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    family_name: Arc<str>,
}

impl TextLayoutEngine {
    /// Contexts with `font` registered. The font bytes are shared, not copied.
    pub fn new(font: &OverlayFont) -> Self {
        let mut font_ctx = parley::FontContext::default();
        font_ctx.collection.register_fonts(font.blob.clone(), None);
        Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family_name: font.family_name.clone(),
        }
    }

    /// Shape and lay out a single unwrapped line of text.
    pub fn layout_line(
        &mut self,
        text: &str,
        size_px: f32,
    ) -> CampaignResult<parley::Layout<TextBrushRgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(CampaignError::text("font size must be finite and > 0"));
        }

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(
                self.family_name.to_string(),
            )),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(TextBrushRgba8::default()));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }
}
