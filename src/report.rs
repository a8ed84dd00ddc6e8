use crate::emotions::{hex_to_rgb, metadata_for};
use crate::error::{AppError, Result};
use crate::history::HistoryRecord;
use printpdf::{BuiltinFont, Color, Line, Mm, PdfDocument, Point, Rgb};

const PAGE_WIDTH: f32 = 215.9; // letter
const PAGE_HEIGHT: f32 = 279.4;
const LEFT: f32 = 25.0;

/// Compose the PDF summary for one history record. Pure transformation: the
/// document is returned as bytes, nothing is written to disk.
pub fn render(record: &HistoryRecord, visualization_ref: Option<&str>) -> Result<Vec<u8>> {
    let (doc, page, layer) = PdfDocument::new(
        "SentiSound - Audio Emotion Analysis Report",
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        "content",
    );
    let layer = doc.get_page(page).get_layer(layer);

    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| AppError::Report(e.to_string()))?;
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| AppError::Report(e.to_string()))?;

    let black = Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None));
    let mut y = PAGE_HEIGHT - 30.0;

    // Title block
    layer.set_fill_color(black.clone());
    layer.use_text(
        "SentiSound - Audio Emotion Analysis Report",
        20.0,
        Mm(LEFT),
        Mm(y),
        &bold,
    );
    y -= 16.0;

    layer.use_text(
        format!("Audio File: {}", record.filename),
        11.0,
        Mm(LEFT),
        Mm(y),
        &regular,
    );
    y -= 7.0;
    let generated = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S");
    layer.use_text(
        format!("Analysis Date: {}", generated),
        11.0,
        Mm(LEFT),
        Mm(y),
        &regular,
    );
    y -= 7.0;
    layer.use_text(
        format!("Recorded Result: {}", record.timestamp),
        11.0,
        Mm(LEFT),
        Mm(y),
        &regular,
    );
    if let Some(viz) = visualization_ref {
        y -= 7.0;
        layer.use_text(
            format!("Visualization: {}", viz),
            11.0,
            Mm(LEFT),
            Mm(y),
            &regular,
        );
    }
    y -= 16.0;

    // Winning label, tinted with its display color
    let meta = metadata_for(&record.predicted_emotion);
    let (r, g, b) = hex_to_rgb(meta.color);
    layer.set_fill_color(Color::Rgb(Rgb::new(r, g, b, None)));
    layer.use_text(
        format!("Detected Emotion: {}", title_case(&record.predicted_emotion)),
        16.0,
        Mm(LEFT),
        Mm(y),
        &bold,
    );
    y -= 14.0;

    // Probability table, descending
    layer.set_fill_color(black);
    layer.use_text("Emotion Probabilities:", 13.0, Mm(LEFT), Mm(y), &bold);
    y -= 9.0;
    layer.use_text("Emotion", 11.0, Mm(LEFT), Mm(y), &bold);
    layer.use_text("Probability (%)", 11.0, Mm(LEFT + 55.0), Mm(y), &bold);
    y -= 2.5;
    rule(&layer, y);
    y -= 6.0;

    let mut rows = record.top_3_probabilities.clone();
    rows.sort_by(|a, b| b.1.total_cmp(&a.1));
    for (label, probability) in rows {
        layer.use_text(title_case(&label), 11.0, Mm(LEFT), Mm(y), &regular);
        layer.use_text(
            format!("{:.1}%", probability * 100.0),
            11.0,
            Mm(LEFT + 55.0),
            Mm(y),
            &regular,
        );
        y -= 6.5;
    }

    doc.save_to_bytes()
        .map_err(|e| AppError::Report(e.to_string()))
}

fn rule(layer: &printpdf::PdfLayerReference, y: f32) {
    let line = Line {
        points: vec![
            (Point::new(Mm(LEFT), Mm(y)), false),
            (Point::new(Mm(PAGE_WIDTH - LEFT), Mm(y)), false),
        ],
        is_closed: false,
    };
    layer.set_outline_color(Color::Rgb(Rgb::new(0.3, 0.3, 0.3, None)));
    layer.add_line(line);
}

fn title_case(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
