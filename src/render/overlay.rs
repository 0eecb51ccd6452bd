use std::borrow::Cow;

use image::RgbaImage;

use crate::{
    foundation::error::{CampaignError, CampaignResult},
    render::{
        composite::{DestRect, draw_image_over, over_in_place},
        compositor::{Canvas, premultiplied},
        text::{OverlayFont, TextBrushRgba8, TextLayoutEngine},
    },
};

/// Logo width as a fraction of canvas width.
pub const LOGO_WIDTH_FRACTION: f64 = 0.15;
/// Smallest logo width in pixels.
pub const LOGO_MIN_WIDTH: u32 = 50;
/// Gap between the logo and the top/right canvas edges, as a fraction of canvas width.
pub const LOGO_PADDING_FRACTION: f64 = 0.05;

/// Drop-shadow displacement of the text outline, in pixels (right, down).
pub const SHADOW_OFFSET: (i64, i64) = (2, 2);
pub const SHADOW_COLOR: TextBrushRgba8 = TextBrushRgba8 {
    r: 0,
    g: 0,
    b: 0,
    a: 255,
};
pub const TEXT_COLOR: TextBrushRgba8 = TextBrushRgba8 {
    r: 255,
    g: 255,
    b: 255,
    a: 255,
};

/// Result of the logo step. A missing logo is not an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogoOutcome {
    Skipped,
    Drawn(DestRect),
}

/// Where the promotional text was laid out.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextPlacement {
    pub font_size: f32,
    pub text_width: i64,
    /// Left edge of the white glyph run.
    pub x: i64,
    /// Baseline of the white glyph run.
    pub baseline_y: i64,
}

/// Top-right logo rectangle for a `logo_width x logo_height` logo on a canvas
/// `canvas_width` wide. `None` for a degenerate logo.
pub fn logo_rect(canvas_width: u32, logo_width: u32, logo_height: u32) -> Option<DestRect> {
    if logo_width == 0 || logo_height == 0 {
        return None;
    }
    let cw = f64::from(canvas_width);
    let width = ((cw * LOGO_WIDTH_FRACTION) as u32).max(LOGO_MIN_WIDTH);
    let aspect = f64::from(logo_height) / f64::from(logo_width);
    let height = (f64::from(width) * aspect) as u32;
    let padding = (cw * LOGO_PADDING_FRACTION) as i64;

    Some(DestRect {
        x: i64::from(canvas_width) - i64::from(width) - padding,
        y: padding,
        width,
        height,
    })
}

/// Font size for the promotional text on a canvas `canvas_width` wide.
pub fn text_font_size(canvas_width: u32) -> f32 {
    (canvas_width / 20) as f32
}

/// Draws the brand logo and the outlined campaign message onto finished canvases.
#[derive(Clone, Debug)]
pub struct OverlayRenderer {
    font: Option<OverlayFont>,
}

impl OverlayRenderer {
    pub fn new(font: OverlayFont) -> Self {
        Self { font: Some(font) }
    }

    /// A renderer that can only draw logos and empty messages.
    pub fn without_font() -> Self {
        Self { font: None }
    }

    /// Draw `logo` in the top-right corner. Never fails: an absent or degenerate logo is
    /// skipped with a log line.
    pub fn apply_logo(&self, canvas: &mut Canvas, logo: Option<&RgbaImage>) -> LogoOutcome {
        let Some(logo) = logo else {
            tracing::debug!("no logo available, skipping logo overlay");
            return LogoOutcome::Skipped;
        };
        let Some(rect) = logo_rect(canvas.width(), logo.width(), logo.height()) else {
            tracing::warn!(
                width = logo.width(),
                height = logo.height(),
                "logo has zero size, skipping logo overlay"
            );
            return LogoOutcome::Skipped;
        };

        match draw_image_over(canvas.pixels_mut(), &premultiplied(logo), rect) {
            Ok(()) => LogoOutcome::Drawn(rect),
            Err(e) => {
                tracing::warn!(error = %e, "could not draw logo overlay");
                LogoOutcome::Skipped
            }
        }
    }

    /// Draw `text` centred near the bottom edge: a black copy offset by
    /// [`SHADOW_OFFSET`], then a white copy on top at the true position.
    ///
    /// Line breaks in `text` are drawn as spaces. Returns `None` for empty text.
    pub fn apply_text(&self, canvas: &mut Canvas, text: &str) -> CampaignResult<Option<TextPlacement>> {
        if text.is_empty() {
            return Ok(None);
        }
        let font = self
            .font
            .as_ref()
            .ok_or_else(|| CampaignError::text("no overlay font configured"))?;

        let (w, h) = (canvas.width(), canvas.height());
        let font_size = text_font_size(w);
        let mut engine = TextLayoutEngine::new(font);
        let layout = engine.layout_line(&single_line(text), font_size)?;

        let first_baseline = layout
            .lines()
            .next()
            .map(|line| line.metrics().baseline)
            .ok_or_else(|| CampaignError::text("text layout produced no lines"))?;
        let text_width = layout.width().round() as i64;

        let placement = TextPlacement {
            font_size,
            text_width,
            x: (i64::from(w) - text_width) / 2,
            baseline_y: i64::from(h) - i64::from(h / 10),
        };
        tracing::debug!(?placement, "placing campaign text");

        let layer = rasterize_outlined(
            &layout,
            font,
            (w, h),
            placement.x as f64,
            placement.baseline_y as f64 - f64::from(first_baseline),
        )?;
        let dst: &mut [u8] = canvas.pixels_mut();
        over_in_place(dst, &layer, 1.0)?;
        Ok(Some(placement))
    }
}

/// `text` with every hard line break replaced by a space, so the message stays on one line.
pub(crate) fn single_line(text: &str) -> Cow<'_, str> {
    if !text.contains(is_line_break) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.replace("\r\n", " ").replace(is_line_break, " "))
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{0b}' | '\u{0c}' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Rasterize the shadow and foreground glyph runs into a transparent premultiplied layer.
fn rasterize_outlined(
    layout: &parley::Layout<TextBrushRgba8>,
    font: &OverlayFont,
    (width, height): (u32, u32),
    origin_x: f64,
    origin_y: f64,
) -> CampaignResult<Vec<u8>> {
    let w: u16 = width
        .try_into()
        .map_err(|_| CampaignError::text("canvas width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| CampaignError::text("canvas height exceeds u16"))?;

    let font_data = font.font_data();
    let mut ctx = vello_cpu::RenderContext::new(w, h);

    let passes = [
        (SHADOW_COLOR, SHADOW_OFFSET),
        (TEXT_COLOR, (0, 0)),
    ];
    for (color, (dx, dy)) in passes {
        ctx.set_transform(vello_cpu::kurbo::Affine::translate((
            origin_x + dx as f64,
            origin_y + dy as f64,
        )));
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
            color.r, color.g, color.b, color.a,
        ));
        fill_glyph_runs(&mut ctx, layout, font_data);
    }

    ctx.flush();
    let mut pixmap = vello_cpu::Pixmap::new(w, h);
    ctx.render_to_pixmap(&mut pixmap);
    Ok(pixmap.data_as_u8_slice().to_vec())
}

fn fill_glyph_runs(
    ctx: &mut vello_cpu::RenderContext,
    layout: &parley::Layout<TextBrushRgba8>,
    font: &vello_cpu::peniko::FontData,
) {
    for line in layout.lines() {
        for item in line.items() {
            let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                continue;
            };
            let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                id: g.id,
                x: g.x,
                y: g.y,
            });
            ctx.glyph_run(font)
                .font_size(run.run().font_size())
                .fill_glyphs(glyphs);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/overlay.rs"]
mod tests;
