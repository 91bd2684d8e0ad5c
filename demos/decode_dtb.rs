// ABOUTME: Example decoding a DTB file against a JSON schema index
// ABOUTME: Prints header details, a tree summary, diagnostics and optionally the JSON tree

use dtb_unflatten::{Decoded, Fdt, Node, SchemaIndex, unflatten};
use std::env;
use std::fs;
use std::process;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("usage: {} <file.dtb> [types.json] [--json]", args[0]);
        process::exit(2);
    }

    let dtb_path = &args[1];
    let schema_path = args.get(2).filter(|a| !a.starts_with("--"));
    let dump_json = args.iter().any(|a| a == "--json");

    println!("🌳 DTB Unflatten Example");
    println!("========================");
    println!("Decoding DTB file: {}", dtb_path);
    println!();

    if let Err(e) = decode_dtb_file(dtb_path, schema_path.map(String::as_str), dump_json) {
        eprintln!("❌ Error decoding DTB: {}", e);
        process::exit(1);
    }
    println!("✅ DTB decoding completed successfully!");
}

fn decode_dtb_file(
    path: &str,
    schema_path: Option<&str>,
    dump_json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let dtb_data =
        fs::read(path).map_err(|e| format!("Failed to read DTB file '{}': {}", path, e))?;
    println!("📄 File size: {} bytes", dtb_data.len());

    let schema = match schema_path {
        Some(schema_path) => {
            let json = fs::read_to_string(schema_path)
                .map_err(|e| format!("Failed to read schema '{}': {}", schema_path, e))?;
            SchemaIndex::from_json(&json)?
        }
        None => {
            println!("⚠️  No schema given; types are inferred from the data");
            SchemaIndex::new()
        }
    };

    let fdt = Fdt::new(&dtb_data)?;
    let header = fdt.header();
    println!("Version:         {}", header.version);
    println!("Struct size:     {} bytes", header.size_dt_struct);
    println!("Strings size:    {} bytes", header.size_dt_strings);
    println!();

    let decoded = unflatten(&fdt, &schema);
    show_summary(&decoded);
    show_devices(&decoded.root);
    show_diagnostics(&decoded);

    if dump_json {
        println!("{}", serde_json::to_string_pretty(&decoded.root)?);
    }
    Ok(())
}

fn show_summary(decoded: &Decoded) {
    println!("📋 Tree Summary");
    println!("───────────────");

    let root = &decoded.root;
    if let Some(model) = root.prop_string("model") {
        println!("  Model: {}", model);
    }
    let node_count = root.iter_nodes().count();
    let total_properties: usize = root.iter_nodes().map(|n| n.properties.len()).sum();
    println!("  Total nodes: {}", node_count);
    println!("  Total properties: {}", total_properties);
    println!("  Phandles: {}", decoded.phandles.len());
    if !decoded.fixups.is_empty() {
        println!("  Overlay fixups: {}", decoded.fixups.len());
    }
    println!();
}

fn show_devices(root: &Node) {
    println!("🔧 Devices With Registers");
    println!("─────────────────────────");

    for node in root.iter_nodes().filter(|n| n.has_property("reg")).take(10) {
        let reg = node
            .property("reg")
            .and_then(|v| v.raw_rows())
            .unwrap_or_default();
        let interrupts = node
            .property("interrupts")
            .and_then(|v| v.raw_rows())
            .unwrap_or_default();
        println!(
            "  {}: {} reg entr{}, {} interrupt{}",
            node.name,
            reg.len(),
            if reg.len() == 1 { "y" } else { "ies" },
            interrupts.len(),
            if interrupts.len() == 1 { "" } else { "s" }
        );
    }
    println!();
}

fn show_diagnostics(decoded: &Decoded) {
    if decoded.diagnostics.is_empty() {
        println!("✅ No diagnostics");
        return;
    }
    println!("⚠️  {} diagnostic(s):", decoded.diagnostics.len());
    for diagnostic in &decoded.diagnostics {
        println!("  {}", diagnostic);
    }
    println!();
}
