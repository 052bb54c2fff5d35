//! SVG output

use crate::layout::{CompositionLayout, MarkerKind};

const TOP_PAD: f64 = 22.0;
const BOTTOM_PAD: f64 = 18.0;

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Render a layout as a complete, self-contained SVG document
pub fn render_svg(layout: &CompositionLayout) -> String {
    let bar_top = TOP_PAD;
    let bar_bottom = bar_top + layout.height;
    let doc_height = bar_bottom + BOTTOM_PAD;

    let mut svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w:.2}\" height=\"{h:.2}\" \
         viewBox=\"0 0 {w:.2} {h:.2}\" role=\"img\" font-family=\"sans-serif\" font-size=\"12\">\n",
        w = layout.width,
        h = doc_height,
    );

    if let Some(bracket) = &layout.bracket {
        let y = bar_top - 6.0;
        let x1 = bracket.x;
        let x2 = bracket.x + bracket.width;
        svg.push_str(&format!(
            "  <path class=\"bracket\" \
             d=\"M{x1:.2},{bt:.2} L{x1:.2},{y:.2} L{x2:.2},{y:.2} L{x2:.2},{bt:.2}\" \
             fill=\"none\" stroke=\"#1a202c\" stroke-width=\"1.5\"/>\n",
            bt = bar_top - 1.0,
        ));
        if let Some(label) = &bracket.label {
            svg.push_str(&format!(
                "  <text class=\"bracket-label\" x=\"{:.2}\" y=\"{:.2}\" \
                 text-anchor=\"middle\">{}</text>\n",
                x1 + bracket.width / 2.0,
                y - 4.0,
                escape(label),
            ));
        }
    }

    for segment in &layout.segments {
        svg.push_str(&format!(
            "  <rect class=\"segment\" x=\"{:.2}\" y=\"{bar_top:.2}\" \
             width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\"><title>{}: {}</title></rect>\n",
            segment.x,
            segment.width,
            layout.height,
            escape(&segment.color),
            escape(&segment.label),
            segment.seats,
        ));
        if segment.show_label {
            svg.push_str(&format!(
                "  <text class=\"segment-label\" x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" \
                 dominant-baseline=\"middle\" fill=\"#ffffff\">{}</text>\n",
                segment.x + segment.width / 2.0,
                bar_top + layout.height / 2.0,
                segment.seats,
            ));
        }
    }

    for marker in &layout.markers {
        let (class, dash) = match marker.kind {
            MarkerKind::Majority => ("majority", ""),
            MarkerKind::Supermajority => ("supermajority", " stroke-dasharray=\"4 3\""),
        };
        svg.push_str(&format!(
            "  <line class=\"marker {class}\" \
             x1=\"{x:.2}\" y1=\"{:.2}\" x2=\"{x:.2}\" y2=\"{:.2}\" \
             stroke=\"#1a202c\" stroke-width=\"2\"{dash}/>\n",
            bar_top - 3.0,
            bar_bottom + 3.0,
            x = marker.x,
        ));
        svg.push_str(&format!(
            "  <text class=\"marker-label {class}\" x=\"{x:.2}\" y=\"{:.2}\" \
             text-anchor=\"middle\">{}</text>\n",
            bar_bottom + 14.0,
            marker.seats,
            x = marker.x,
        ));
    }

    svg.push_str("</svg>\n");
    svg
}
