use std::env;
use std::fs;
use std::path::Path;

use flowmap_core::summary::{Summary, TableRow, table_rows};
use flowmap_core::{ViewerConfig, Viewport, ZoomTransform, build_scene, parse_payload, summarize};
use flowmap_svg::{encode_rgba_to_png_bytes, render_standalone_svg};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str =
    "Usage: flowmap-snapshot <payload.json> <output.(svg|png)> [width] [height] [config.json]";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("{USAGE}");
        std::process::exit(2);
    }
    let input = &args[1];
    let output = &args[2];
    let defaults = Viewport::default();
    let viewport = Viewport {
        width: args.get(3).and_then(|s| s.parse().ok()).unwrap_or(defaults.width),
        height: args.get(4).and_then(|s| s.parse().ok()).unwrap_or(defaults.height),
    };
    let config = match args.get(5) {
        Some(path) => ViewerConfig::from_json(&fs::read_to_string(path)?)?,
        None => ViewerConfig::default(),
    };

    let payload = parse_payload(&fs::read_to_string(input)?)?;
    let scene = build_scene(&payload, viewport, &config);
    let skipped = payload.edges.len() - scene.edges.len();
    if skipped > 0 {
        warn!(skipped, "edges left out of the diagram (self-edges or unknown departments)");
    }
    print_summary(&summarize(&payload, config.department_total), &table_rows(&payload));

    let svg = render_standalone_svg(&scene, ZoomTransform::IDENTITY);
    let is_svg = Path::new(output)
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"));
    if is_svg {
        fs::write(output, &svg)?;
    } else {
        rasterize(&svg, viewport, output)?;
    }
    info!(%output, "snapshot written");
    Ok(())
}

fn print_summary(summary: &Summary, rows: &[TableRow]) {
    println!("Total transportations: {}", summary.total_trips);
    println!("Total items transported: {}", summary.total_items);
    println!("Dummy count: {}", summary.dummy_count);
    println!("Departments involved: {}", summary.involved_label);
    println!("Date range: {}", summary.date_range_label);
    println!("Omitted self-edges: {}", summary.self_edge_weight);
    println!();
    println!("source\ttrips\tquantity\tdistance\tduration\tdestination");
    for r in rows {
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            r.source,
            r.trips,
            r.quantity,
            r.distance_label(),
            r.duration_label(),
            r.destination
        );
    }
}

/// Families tried, in order, for the generic `sans-serif` fallback.
const SANS_FAMILIES: &[&str] = &[
    "Lato",
    "DejaVu Sans",
    "Liberation Sans",
    "Noto Sans",
    "Arial",
    "Helvetica",
];

fn sans_family(fontdb: &usvg::fontdb::Database) -> Option<String> {
    SANS_FAMILIES
        .iter()
        .find(|want| {
            fontdb
                .faces()
                .any(|face| face.families.iter().any(|(n, _)| n == *want))
        })
        .map(|n| n.to_string())
}

fn rasterize(svg: &str, viewport: Viewport, path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut opt = usvg::Options::default();
    let mut fontdb = usvg::fontdb::Database::new();
    fontdb.load_system_fonts();
    if fontdb.is_empty() {
        warn!("no system fonts found, labels will not be drawn");
    }
    if let Some(name) = sans_family(&fontdb) {
        fontdb.set_sans_serif_family(name);
    }
    opt.fontdb = std::sync::Arc::new(fontdb);
    let tree = usvg::Tree::from_str(svg, &opt).map_err(|e| format!("SVG parse error: {e:?}"))?;
    let w_px = viewport.width.ceil().max(1.0) as u32;
    let h_px = viewport.height.ceil().max(1.0) as u32;
    let mut pixmap = tiny_skia::Pixmap::new(w_px, h_px).ok_or("pixmap alloc failed")?;
    let mut pm = pixmap.as_mut();
    resvg::render(&tree, tiny_skia::Transform::identity(), &mut pm);
    let bytes = encode_rgba_to_png_bytes(pixmap.width(), pixmap.height(), pixmap.data())?;
    fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_font_database_keeps_default_sans() {
        assert_eq!(sans_family(&usvg::fontdb::Database::new()), None);
    }
}
