//! Estimate document rendering.
//!
//! A fixed-column table layout with automatic page breaks, kept behind a
//! single function so the rest of the system treats document rendering as a
//! collaborator.

use crate::errors::ServiceError;
use crate::services::estimates::EstimateResponse;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const TOP_MM: f32 = 277.0;
const BOTTOM_MARGIN_MM: f32 = 20.0;
const LINE_HEIGHT_MM: f32 = 6.0;

// Table column x positions
const COL_ITEM: f32 = 15.0;
const COL_DESCRIPTION: f32 = 62.0;
const COL_QTY: f32 = 118.0;
const COL_UNIT: f32 = 136.0;
const COL_PRICE: f32 = 156.0;
const COL_TOTAL: f32 = 180.0;

struct Page {
    layer: PdfLayerReference,
    y: f32,
}

/// Renders the hydrated estimate into PDF bytes.
pub fn render_estimate(estimate: &EstimateResponse) -> Result<Vec<u8>, ServiceError> {
    let (doc, page_idx, layer_idx) = PdfDocument::new(
        format!("Estimate {}", estimate.id),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ServiceError::InternalError(format!("pdf font setup failed: {e}")))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ServiceError::InternalError(format!("pdf font setup failed: {e}")))?;

    let mut page = Page {
        layer: doc.get_page(page_idx).get_layer(layer_idx),
        y: TOP_MM,
    };

    // Header
    centered(&page, &bold, 20.0, "EffiBuild", page.y);
    page.y -= 10.0;
    centered(&page, &font, 16.0, "Estimate", page.y);
    page.y -= 12.0;

    text(&page, &font, 11.0, COL_ITEM, page.y, &format!("Estimate #: {}", estimate.id));
    page.y -= LINE_HEIGHT_MM;
    text(
        &page,
        &font,
        11.0,
        COL_ITEM,
        page.y,
        &format!("Date: {}", estimate.created_at.format("%Y-%m-%d")),
    );
    page.y -= LINE_HEIGHT_MM;
    if let Some(project_name) = &estimate.project_name {
        text(&page, &font, 11.0, COL_ITEM, page.y, &format!("Project: {project_name}"));
        page.y -= LINE_HEIGHT_MM;
    }
    page.y -= LINE_HEIGHT_MM;

    // Customer block
    text(&page, &bold, 11.0, COL_ITEM, page.y, "Customer Information:");
    page.y -= LINE_HEIGHT_MM;
    if let Some(name) = &estimate.customer_name {
        text(&page, &font, 11.0, COL_ITEM, page.y, &format!("Name: {name}"));
        page.y -= LINE_HEIGHT_MM;
    }
    if let Some(email) = &estimate.customer_email {
        text(&page, &font, 11.0, COL_ITEM, page.y, &format!("Email: {email}"));
        page.y -= LINE_HEIGHT_MM;
    }
    if let Some(phone) = &estimate.customer_phone {
        text(&page, &font, 11.0, COL_ITEM, page.y, &format!("Phone: {phone}"));
        page.y -= LINE_HEIGHT_MM;
    }
    page.y -= LINE_HEIGHT_MM;

    // Materials table
    text(&page, &bold, 11.0, COL_ITEM, page.y, "Materials:");
    page.y -= LINE_HEIGHT_MM + 2.0;
    table_header(&page, &bold, page.y);
    page.y -= LINE_HEIGHT_MM;

    for material in &estimate.materials {
        if page.y < BOTTOM_MARGIN_MM {
            let (next_page, next_layer) = doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            page = Page {
                layer: doc.get_page(next_page).get_layer(next_layer),
                y: TOP_MM,
            };
            table_header(&page, &bold, page.y);
            page.y -= LINE_HEIGHT_MM;
        }

        text(&page, &font, 10.0, COL_ITEM, page.y, &truncate(&material.name, 28));
        let description = material.description.as_deref().unwrap_or("-");
        text(&page, &font, 10.0, COL_DESCRIPTION, page.y, &truncate(description, 32));
        text(&page, &font, 10.0, COL_QTY, page.y, &material.quantity.to_string());
        text(&page, &font, 10.0, COL_UNIT, page.y, &truncate(&material.unit, 10));
        text(&page, &font, 10.0, COL_PRICE, page.y, &format!("{:.2}", material.unit_price));
        text(&page, &font, 10.0, COL_TOTAL, page.y, &format!("{:.2}", material.total_price));
        page.y -= LINE_HEIGHT_MM;
    }

    page.y -= LINE_HEIGHT_MM;
    if page.y < BOTTOM_MARGIN_MM {
        let (next_page, next_layer) = doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        page = Page {
            layer: doc.get_page(next_page).get_layer(next_layer),
            y: TOP_MM,
        };
    }
    text(
        &page,
        &bold,
        12.0,
        COL_PRICE,
        page.y,
        &format!("Total: {:.2}", estimate.total_cost),
    );
    page.y -= LINE_HEIGHT_MM * 2.0;

    if let Some(notes) = &estimate.notes {
        text(&page, &bold, 11.0, COL_ITEM, page.y, "Notes:");
        page.y -= LINE_HEIGHT_MM;
        text(&page, &font, 10.0, COL_ITEM, page.y, &truncate(notes, 100));
    }

    doc.save_to_bytes()
        .map_err(|e| ServiceError::InternalError(format!("pdf rendering failed: {e}")))
}

fn text(page: &Page, font: &IndirectFontRef, size: f32, x: f32, y: f32, content: &str) {
    page.layer.use_text(content, size, Mm(x), Mm(y), font);
}

fn centered(page: &Page, font: &IndirectFontRef, size: f32, content: &str, y: f32) {
    // Rough centering for the builtin font; exact metrics aren't worth the
    // dependency for a two-line header.
    let approx_width = content.len() as f32 * size * 0.18;
    let x = (PAGE_WIDTH_MM - approx_width) / 2.0;
    page.layer.use_text(content, size, Mm(x.max(10.0)), Mm(y), font);
}

fn table_header(page: &Page, bold: &IndirectFontRef, y: f32) {
    text(page, bold, 10.0, COL_ITEM, y, "Item");
    text(page, bold, 10.0, COL_DESCRIPTION, y, "Description");
    text(page, bold, 10.0, COL_QTY, y, "Qty");
    text(page, bold, 10.0, COL_UNIT, y, "Unit");
    text(page, bold, 10.0, COL_PRICE, y, "Price");
    text(page, bold, 10.0, COL_TOTAL, y, "Total");
}

fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        value.to_string()
    } else {
        let truncated: String = value.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{truncated}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::estimates::EstimateMaterialResponse;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn sample_estimate(material_count: usize) -> EstimateResponse {
        let materials = (0..material_count)
            .map(|i| EstimateMaterialResponse {
                id: Uuid::new_v4(),
                name: format!("Material {i}"),
                description: Some("A description".to_string()),
                quantity: dec!(2),
                unit_price: dec!(9.99),
                unit: "piece".to_string(),
                total_price: dec!(19.98),
                ai_recommended: false,
            })
            .collect();

        EstimateResponse {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            blueprint_id: None,
            status: "draft".to_string(),
            notes: Some("Deliver before March".to_string()),
            total_cost: dec!(19.98) * Decimal::from(material_count as u32),
            customer_name: Some("Jordan Fields".to_string()),
            customer_email: Some("jordan@example.com".to_string()),
            customer_phone: Some("555-0100".to_string()),
            project_name: Some("Garage extension".to_string()),
            materials,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn renders_valid_pdf_bytes() {
        let bytes = render_estimate(&sample_estimate(3)).expect("render should succeed");
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn long_estimates_paginate() {
        // Enough rows to force at least one page break
        let bytes = render_estimate(&sample_estimate(80)).expect("render should succeed");
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 2_000);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        let long = "a very long material description that exceeds the column";
        assert!(truncate(long, 20).chars().count() <= 20);
    }
}
