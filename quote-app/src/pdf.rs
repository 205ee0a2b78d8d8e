//! Quote documents.
//!
//! [`QuoteDocument`] holds everything printed on a quote, already priced and
//! worded, so it can be checked without opening a PDF. [`render_to_file`]
//! lays it out on A4 pages with printpdf's built-in Helvetica.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use printpdf::*;
use quote_core::calculations::common::round_half_up;
use quote_core::calculations::{
    FamilyDiscounts, FlatDiscount, NoDiscount, PricingEngine, QuoteTotals, VAT_RATE,
    line_breakdowns,
};
use quote_core::{
    BITONO_EXTRA_ID, Catalog, ItemSpec, QuoteState, RAL_EXTRA_ID, SavedQuote, User,
};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;

// ============================================================================
// Layout constants
// ============================================================================

/// A4 in mm
const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;

const MARGIN_MM: f32 = 18.0;

/// Space taken by the issuer/customer block on the first page
const HEADER_HEIGHT_MM: f32 = 58.0;
/// Space taken by the running header on continuation pages
const CONTINUATION_HEADER_MM: f32 = 14.0;
const TABLE_HEADER_MM: f32 = 9.0;
const FOOTER_MM: f32 = 10.0;

const ROW_HEIGHT_MM: f32 = 7.0;
const TOTALS_HEIGHT_MM: f32 = 46.0;

const TITLE_FONT_SIZE: f32 = 16.0;
const HEADER_FONT_SIZE: f32 = 10.0;
const NORMAL_FONT_SIZE: f32 = 9.0;
const SMALL_FONT_SIZE: f32 = 7.5;

/// Column x offsets from the left margin
const COL_DESCRIPTION_MM: f32 = 0.0;
const COL_QUANTITY_MM: f32 = 104.0;
const COL_UNIT_PRICE_MM: f32 = 118.0;
const COL_DISCOUNT_MM: f32 = 140.0;
const COL_TOTAL_MM: f32 = 154.0;

const MAX_DESCRIPTION_CHARS: usize = 58;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to create PDF: {0}")]
    Pdf(String),

    #[error("Failed to write PDF: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Document model
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Sales office copy with one discount over the whole quote.
    Internal,
    /// Customer copy with a discount per product line.
    Customer,
}

/// Who the quote comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issuer {
    pub company: String,
    pub prepared_by: String,
    pub email: String,
}

impl Issuer {
    /// The user's commercial name, else `default_company`, else their name.
    pub fn for_user(
        user: &User,
        default_company: Option<&str>,
    ) -> Self {
        let has_own = user
            .commercial_name
            .as_deref()
            .is_some_and(|name| !name.trim().is_empty());
        let company = match default_company {
            Some(company) if !has_own => company.to_string(),
            _ => user.issuer_name().to_string(),
        };
        Self {
            company,
            prepared_by: user.prepared_by.clone().unwrap_or_else(|| user.name.clone()),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRow {
    pub description: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    /// Only set on customer documents.
    pub discount_percentage: Option<Decimal>,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotalsLine {
    pub label: String,
    pub amount: Decimal,
    pub emphasis: bool,
}

impl TotalsLine {
    fn new(
        label: impl Into<String>,
        amount: Decimal,
    ) -> Self {
        Self {
            label: label.into(),
            amount,
            emphasis: false,
        }
    }

    fn emphasized(mut self) -> Self {
        self.emphasis = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteDocument {
    pub kind: DocumentKind,
    pub title: String,
    pub issuer: Issuer,
    pub quote_number: String,
    /// `dd/mm/yyyy`
    pub date: String,
    pub ordered_on: Option<String>,
    pub customer_name: Option<String>,
    pub project_reference: Option<String>,
    pub rows: Vec<DocumentRow>,
    pub totals: Vec<TotalsLine>,
}

impl QuoteDocument {
    /// Sales office copy: catalog prices per line and `discount` taken off
    /// the pre-VAT total.
    pub fn internal(
        quote: &SavedQuote,
        issuer: Issuer,
        catalog: &Catalog,
        discount: FlatDiscount,
    ) -> Self {
        let engine = PricingEngine::new(catalog);
        let rows = line_breakdowns(&engine, &quote.quote_items, &NoDiscount)
            .into_iter()
            .zip(&quote.quote_items)
            .map(|(line, item)| DocumentRow {
                description: describe_item(&item.state, catalog),
                quantity: line.quantity,
                unit_price: line.unit_price,
                discount_percentage: None,
                total: line.original,
            })
            .collect();

        let totals = QuoteTotals::with_flat_discount(&engine, &quote.quote_items, discount);
        let discount_label = format!("Descuento {}", format_percentage(discount.rate.percentage()));

        Self::new(
            DocumentKind::Internal,
            "Presupuesto interno",
            quote,
            issuer,
            rows,
            totals_block(&totals, &discount_label),
        )
    }

    /// Customer copy: each line discounted by its product line's percentage.
    pub fn customer(
        quote: &SavedQuote,
        issuer: Issuer,
        catalog: &Catalog,
        discounts: &FamilyDiscounts,
    ) -> Self {
        let engine = PricingEngine::new(catalog);
        let rows = line_breakdowns(&engine, &quote.quote_items, discounts)
            .into_iter()
            .zip(&quote.quote_items)
            .map(|(line, item)| DocumentRow {
                description: describe_item(&item.state, catalog),
                quantity: line.quantity,
                unit_price: line.unit_price,
                discount_percentage: Some(line.discount_percentage),
                total: line.discounted,
            })
            .collect();

        let totals = QuoteTotals::with_policy(&engine, &quote.quote_items, discounts);
        let discount_label =
            format!("Descuento ({})", format_percentage(totals.discount_percentage));

        Self::new(
            DocumentKind::Customer,
            "Presupuesto",
            quote,
            issuer,
            rows,
            totals_block(&totals, &discount_label),
        )
    }

    fn new(
        kind: DocumentKind,
        title: &str,
        quote: &SavedQuote,
        issuer: Issuer,
        rows: Vec<DocumentRow>,
        totals: Vec<TotalsLine>,
    ) -> Self {
        Self {
            kind,
            title: title.to_string(),
            issuer,
            quote_number: quote.quote_number(),
            date: quote.timestamp.format("%d/%m/%Y").to_string(),
            ordered_on: quote
                .ordered_timestamp
                .map(|at| at.format("%d/%m/%Y").to_string()),
            customer_name: quote.customer_name.clone(),
            project_reference: quote.project_reference.clone(),
            rows,
            totals,
        }
    }

    /// `P240305-100000-cliente.pdf` and the like.
    pub fn file_name(&self) -> String {
        let suffix = match self.kind {
            DocumentKind::Internal => "interno",
            DocumentKind::Customer => "cliente",
        };
        format!("{}-{}.pdf", self.quote_number, suffix)
    }

    /// Rounded total due, the last line of the totals block.
    pub fn total_due(&self) -> Decimal {
        self.totals
            .last()
            .map_or(Decimal::ZERO, |line| round_half_up(line.amount))
    }
}

fn totals_block(
    totals: &QuoteTotals,
    discount_label: &str,
) -> Vec<TotalsLine> {
    let mut lines = vec![TotalsLine::new("Total PVP", totals.subtotal)];
    if totals.has_discount() {
        lines.push(TotalsLine::new(discount_label, -totals.discount));
    }
    lines.push(TotalsLine::new("Base imponible", totals.taxable_base));
    lines.push(TotalsLine::new(
        format!("IVA {}", format_percentage(VAT_RATE * Decimal::ONE_HUNDRED)),
        totals.vat,
    ));
    lines.push(TotalsLine::new("Total", totals.total).emphasized());
    lines
}

/// One-line description of a configured item.
pub fn describe_item(
    state: &QuoteState,
    catalog: &Catalog,
) -> String {
    let line = state.product_line.as_deref().and_then(|id| catalog.line(id));
    let mut parts = vec![match (line, &state.product_line) {
        (Some(line), _) => line.name.clone(),
        (None, Some(id)) => id.clone(),
        (None, None) => "Producto".to_string(),
    }];

    match &state.spec {
        ItemSpec::Kit { kit } => {
            if let Some(kit) = kit {
                parts.push(kit.name.clone());
            }
        }
        spec => {
            if let Some((width, length)) = spec.dimensions() {
                parts.push(format!("{}x{} cm", width, length));
            }
            if let Some(frames) = spec.struct_frames() {
                parts.push(format!("{} bastidores", frames));
            }
        }
    }

    if let Some(model) = &state.model {
        parts.push(model.name.clone());
    }
    if let Some(color) = &state.color {
        parts.push(color.name.clone());
    } else if state.uses_ral() && !state.ral_code.is_empty() {
        parts.push(state.ral_code.clone());
    }

    for extra in state.extras.iter().filter(|extra| extra.id != RAL_EXTRA_ID) {
        if state.uses_bitono() && extra.id == BITONO_EXTRA_ID {
            let second = state
                .bitono_color
                .as_ref()
                .map(|color| color.name.clone())
                .unwrap_or_else(|| state.bitono_ral_code.clone());
            parts.push(format!("{} {}", extra.name, second).trim_end().to_string());
        } else {
            parts.push(extra.name.clone());
        }
    }

    if let Some(reference) = &state.invoice_reference {
        parts.push(format!("Ref. {}", reference));
    }

    parts.join(", ")
}

/// `1.234,56 €`, rounded half-up to cents.
pub fn format_eur(amount: Decimal) -> String {
    let rounded = round_half_up(amount);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let text = format!("{:.2}", rounded.abs());
    let (units, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    format!("{}{},{} €", sign, group_thousands(units), cents)
}

/// `6,67 %`, `10 %`.
pub fn format_percentage(percentage: Decimal) -> String {
    let text = round_half_up(percentage).normalize().to_string();
    format!("{} %", text.replace('.', ","))
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    grouped
}

// ============================================================================
// Pagination
// ============================================================================

/// Vertical space available to table rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub first_page_mm: f32,
    pub continuation_page_mm: f32,
    pub row_height_mm: f32,
    pub totals_height_mm: f32,
}

impl Default for PageLayout {
    fn default() -> Self {
        let body = PAGE_HEIGHT_MM - 2.0 * MARGIN_MM - FOOTER_MM - TABLE_HEADER_MM;
        Self {
            first_page_mm: body - HEADER_HEIGHT_MM,
            continuation_page_mm: body - CONTINUATION_HEADER_MM,
            row_height_mm: ROW_HEIGHT_MM,
            totals_height_mm: TOTALS_HEIGHT_MM,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page<'a> {
    pub rows: &'a [DocumentRow],
    /// The totals block goes at the bottom of this page.
    pub totals: bool,
}

/// Splits `rows` into pages, starting a new page whenever the next row no
/// longer fits. The totals block follows the last row, on a page of its own
/// when the last row page has no room left for it.
pub fn paginate<'a>(
    rows: &'a [DocumentRow],
    layout: &PageLayout,
) -> Vec<Page<'a>> {
    let mut pages = Vec::new();
    let mut remaining = rows;
    let mut available = layout.first_page_mm;

    loop {
        let capacity = ((available / layout.row_height_mm).floor() as usize).max(1);
        if remaining.len() <= capacity {
            let left = available - remaining.len() as f32 * layout.row_height_mm;
            if left >= layout.totals_height_mm {
                pages.push(Page {
                    rows: remaining,
                    totals: true,
                });
            } else {
                pages.push(Page {
                    rows: remaining,
                    totals: false,
                });
                pages.push(Page {
                    rows: &[],
                    totals: true,
                });
            }
            return pages;
        }

        let (page, rest) = remaining.split_at(capacity);
        pages.push(Page {
            rows: page,
            totals: false,
        });
        remaining = rest;
        available = layout.continuation_page_mm;
    }
}

// ============================================================================
// Rendering
// ============================================================================

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// Writes `document` as an A4 PDF at `path`.
pub fn render_to_file(
    document: &QuoteDocument,
    path: &Path,
) -> Result<(), RenderError> {
    let (doc, first_page, first_layer) = PdfDocument::new(
        format!("{} {}", document.title, document.quote_number),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );

    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| RenderError::Pdf(e.to_string()))?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| RenderError::Pdf(e.to_string()))?,
    };

    let pages = paginate(&document.rows, &PageLayout::default());
    let page_count = pages.len();

    for (index, page) in pages.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_index, layer_index) =
                doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            doc.get_page(page_index).get_layer(layer_index)
        };

        let mut y = PAGE_HEIGHT_MM - MARGIN_MM;
        y = if index == 0 {
            draw_header(&layer, &fonts, document, y)
        } else {
            draw_continuation_header(&layer, &fonts, document, y)
        };

        if !page.rows.is_empty() || index == 0 {
            y = draw_table_header(&layer, &fonts, document.kind, y);
            for row in page.rows {
                y = draw_row(&layer, &fonts, document.kind, row, y);
            }
        }

        if page.totals {
            draw_totals(&layer, &fonts, &document.totals, y - 6.0);
        }

        draw_footer(&layer, &fonts, index + 1, page_count);
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    doc.save(&mut writer)
        .map_err(|e| RenderError::Pdf(e.to_string()))?;

    info!(path = %path.display(), pages = page_count, "quote document written");
    Ok(())
}

fn draw_header(
    layer: &PdfLayerReference,
    fonts: &Fonts,
    document: &QuoteDocument,
    start_y: f32,
) -> f32 {
    let left = MARGIN_MM;
    let right = PAGE_WIDTH_MM / 2.0 + 10.0;
    let mut y = start_y - 6.0;

    layer.use_text(&document.issuer.company, TITLE_FONT_SIZE, Mm(left), Mm(y), &fonts.bold);
    layer.use_text(&document.title, TITLE_FONT_SIZE, Mm(right), Mm(y), &fonts.bold);

    y -= 8.0;
    layer.use_text(
        format!("Preparado por: {}", document.issuer.prepared_by),
        NORMAL_FONT_SIZE,
        Mm(left),
        Mm(y),
        &fonts.regular,
    );
    layer.use_text(
        format!("N.º {}", document.quote_number),
        HEADER_FONT_SIZE,
        Mm(right),
        Mm(y),
        &fonts.bold,
    );

    y -= 5.0;
    layer.use_text(&document.issuer.email, NORMAL_FONT_SIZE, Mm(left), Mm(y), &fonts.regular);
    layer.use_text(
        format!("Fecha: {}", document.date),
        NORMAL_FONT_SIZE,
        Mm(right),
        Mm(y),
        &fonts.regular,
    );

    if let Some(ordered_on) = &document.ordered_on {
        y -= 5.0;
        layer.use_text(
            format!("Pedido el {}", ordered_on),
            NORMAL_FONT_SIZE,
            Mm(right),
            Mm(y),
            &fonts.bold,
        );
    }

    y -= 12.0;
    layer.use_text("Cliente", HEADER_FONT_SIZE, Mm(left), Mm(y), &fonts.bold);
    y -= 5.0;
    layer.use_text(
        document.customer_name.as_deref().unwrap_or("-"),
        NORMAL_FONT_SIZE,
        Mm(left),
        Mm(y),
        &fonts.regular,
    );
    if let Some(project) = &document.project_reference {
        y -= 5.0;
        layer.use_text(
            format!("Obra: {}", project),
            NORMAL_FONT_SIZE,
            Mm(left),
            Mm(y),
            &fonts.regular,
        );
    }

    start_y - HEADER_HEIGHT_MM
}

fn draw_continuation_header(
    layer: &PdfLayerReference,
    fonts: &Fonts,
    document: &QuoteDocument,
    start_y: f32,
) -> f32 {
    layer.use_text(
        format!("{} N.º {} (continuación)", document.title, document.quote_number),
        HEADER_FONT_SIZE,
        Mm(MARGIN_MM),
        Mm(start_y - 6.0),
        &fonts.bold,
    );
    start_y - CONTINUATION_HEADER_MM
}

fn draw_table_header(
    layer: &PdfLayerReference,
    fonts: &Fonts,
    kind: DocumentKind,
    y: f32,
) -> f32 {
    let text_y = y - TABLE_HEADER_MM + 3.0;
    let columns: &[(&str, f32)] = match kind {
        DocumentKind::Internal => &[
            ("Descripción", COL_DESCRIPTION_MM),
            ("Cant.", COL_QUANTITY_MM),
            ("Precio ud.", COL_UNIT_PRICE_MM),
            ("Importe", COL_TOTAL_MM),
        ],
        DocumentKind::Customer => &[
            ("Descripción", COL_DESCRIPTION_MM),
            ("Cant.", COL_QUANTITY_MM),
            ("Precio ud.", COL_UNIT_PRICE_MM),
            ("Dto.", COL_DISCOUNT_MM),
            ("Importe", COL_TOTAL_MM),
        ],
    };
    for (label, x) in columns {
        layer.use_text(*label, NORMAL_FONT_SIZE, Mm(MARGIN_MM + x), Mm(text_y), &fonts.bold);
    }

    layer.set_outline_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
    layer.set_outline_thickness(0.5);
    let bottom = y - TABLE_HEADER_MM;
    draw_line(layer, MARGIN_MM, bottom, PAGE_WIDTH_MM - MARGIN_MM, bottom);
    bottom
}

fn draw_row(
    layer: &PdfLayerReference,
    fonts: &Fonts,
    kind: DocumentKind,
    row: &DocumentRow,
    y: f32,
) -> f32 {
    let text_y = y - ROW_HEIGHT_MM + 2.0;
    let x = |offset: f32| Mm(MARGIN_MM + offset);

    layer.use_text(
        fit(&row.description, MAX_DESCRIPTION_CHARS),
        SMALL_FONT_SIZE,
        x(COL_DESCRIPTION_MM),
        Mm(text_y),
        &fonts.regular,
    );
    layer.use_text(
        row.quantity.to_string(),
        NORMAL_FONT_SIZE,
        x(COL_QUANTITY_MM),
        Mm(text_y),
        &fonts.regular,
    );
    layer.use_text(
        format_eur(row.unit_price),
        NORMAL_FONT_SIZE,
        x(COL_UNIT_PRICE_MM),
        Mm(text_y),
        &fonts.regular,
    );
    if let (DocumentKind::Customer, Some(percentage)) = (kind, row.discount_percentage) {
        layer.use_text(
            format_percentage(percentage),
            NORMAL_FONT_SIZE,
            x(COL_DISCOUNT_MM),
            Mm(text_y),
            &fonts.regular,
        );
    }
    layer.use_text(
        format_eur(row.total),
        NORMAL_FONT_SIZE,
        x(COL_TOTAL_MM),
        Mm(text_y),
        &fonts.regular,
    );

    layer.set_outline_color(Color::Rgb(Rgb::new(0.8, 0.8, 0.8, None)));
    layer.set_outline_thickness(0.3);
    let bottom = y - ROW_HEIGHT_MM;
    draw_line(layer, MARGIN_MM, bottom, PAGE_WIDTH_MM - MARGIN_MM, bottom);
    bottom
}

fn draw_totals(
    layer: &PdfLayerReference,
    fonts: &Fonts,
    totals: &[TotalsLine],
    start_y: f32,
) {
    let label_x = MARGIN_MM + COL_UNIT_PRICE_MM - 10.0;
    let amount_x = MARGIN_MM + COL_TOTAL_MM;
    let mut y = start_y;

    for line in totals {
        y -= 7.0;
        if line.emphasis {
            layer.set_outline_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
            layer.set_outline_thickness(0.5);
            draw_line(layer, label_x, y + 5.0, PAGE_WIDTH_MM - MARGIN_MM, y + 5.0);
        }
        let font = if line.emphasis { &fonts.bold } else { &fonts.regular };
        layer.use_text(&line.label, HEADER_FONT_SIZE, Mm(label_x), Mm(y), font);
        layer.use_text(format_eur(line.amount), HEADER_FONT_SIZE, Mm(amount_x), Mm(y), font);
    }
}

fn draw_footer(
    layer: &PdfLayerReference,
    fonts: &Fonts,
    page: usize,
    page_count: usize,
) {
    layer.use_text(
        format!("Página {} de {}", page, page_count),
        SMALL_FONT_SIZE,
        Mm(PAGE_WIDTH_MM - MARGIN_MM - 22.0),
        Mm(MARGIN_MM - 6.0),
        &fonts.regular,
    );
}

fn draw_line(
    layer: &PdfLayerReference,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
) {
    let points = vec![
        (Point::new(Mm(x1), Mm(y1)), false),
        (Point::new(Mm(x2), Mm(y2)), false),
    ];
    layer.add_line(Line {
        points,
        is_closed: false,
    });
}

fn fit(
    text: &str,
    max_chars: usize,
) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}
