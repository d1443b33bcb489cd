use std::io::BufWriter;

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference};

use super::layout::{Align, ReceiptLayout, ReceiptLine, TextStyle, TITLE};
use crate::errors::Error;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_LEFT_MM: f32 = 10.0;
const MARGIN_TOP_MM: f32 = 10.0;
const MARGIN_BOTTOM_MM: f32 = 15.0;
const LINE_HEIGHT_MM: f32 = 10.0;
const PT_TO_MM: f32 = 0.3528;
// Rough Helvetica advance width as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.5;

#[derive(Debug)]
pub(crate) struct PlacedLine<'a> {
    pub line: &'a ReceiptLine,
    pub x: f32,
    pub baseline: f32,
}

/// Positions every line on A4 pages, starting a new page when the next line
/// would cross the bottom margin.
pub(crate) fn paginate(layout: &ReceiptLayout) -> Vec<Vec<PlacedLine<'_>>> {
    let top = PAGE_HEIGHT_MM - MARGIN_TOP_MM;
    let mut pages = vec![Vec::new()];
    let mut cursor = top;

    for line in layout.lines() {
        cursor -= line.space_before;
        if cursor - LINE_HEIGHT_MM < MARGIN_BOTTOM_MM {
            pages.push(Vec::new());
            cursor = top;
        }

        let x = match line.align {
            Align::Left => MARGIN_LEFT_MM,
            Align::Center => {
                let width = line.text.chars().count() as f32 * line.size * AVG_GLYPH_WIDTH * PT_TO_MM;
                ((PAGE_WIDTH_MM - width) / 2.0).max(MARGIN_LEFT_MM)
            }
        };
        // Baseline sits in the lower part of the line box.
        let baseline = cursor - LINE_HEIGHT_MM * 0.7;

        if let Some(page) = pages.last_mut() {
            page.push(PlacedLine { line, x, baseline });
        }
        cursor -= LINE_HEIGHT_MM;
    }

    pages
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
}

impl Fonts {
    fn load(doc: &PdfDocumentReference) -> Result<Self, Error> {
        let font = |builtin| {
            doc.add_builtin_font(builtin)
                .map_err(|e| Error::rendering(format!("PDF font error: {e}")))
        };
        Ok(Self {
            regular: font(BuiltinFont::Helvetica)?,
            bold: font(BuiltinFont::HelveticaBold)?,
            italic: font(BuiltinFont::HelveticaOblique)?,
        })
    }

    fn for_style(&self, style: TextStyle) -> &IndirectFontRef {
        match style {
            TextStyle::Regular => &self.regular,
            TextStyle::Bold => &self.bold,
            TextStyle::Italic => &self.italic,
        }
    }
}

/// Renders the layout to PDF bytes.
pub fn render_pdf(layout: &ReceiptLayout) -> Result<Vec<u8>, Error> {
    let pages = paginate(layout);

    let (doc, first_page, first_layer) =
        PdfDocument::new(TITLE, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
    let fonts = Fonts::load(&doc)?;

    let mut targets = vec![(first_page, first_layer)];
    for index in 1..pages.len() {
        targets.push(doc.add_page(
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            format!("Layer {}", index + 1),
        ));
    }

    for ((page, layer), placed) in targets.into_iter().zip(&pages) {
        let layer = doc.get_page(page).get_layer(layer);
        for p in placed {
            layer.use_text(
                p.line.text.clone(),
                p.line.size,
                Mm(p.x),
                Mm(p.baseline),
                fonts.for_style(p.line.style),
            );
        }
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| Error::rendering(format!("PDF save error: {e}")))?;
    buf.into_inner()
        .map_err(|e| Error::rendering(format!("PDF buffer error: {e}")))
}
