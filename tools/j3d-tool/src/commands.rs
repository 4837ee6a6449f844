//! Subcommand implementations

use anyhow::{Context, Result, bail};
use j3d_scenegraph::{
    ByteCodeOp, ByteReader, ByteWriter, DecodeStats, Decoder, Encoder, Hierarchy, RECORD_SIZE,
    SceneGraphConfig, TableBounds, bytecode, disassemble, parse_listing, render_listing,
    required_bounds,
};
use std::fmt::Write as _;
use std::path::Path;

pub fn disasm(input: &Path, output: Option<&Path>, config: &SceneGraphConfig) -> Result<()> {
    let data = read_input(input, config)?;
    let mut reader = ByteReader::at_offset(&data, config.offset, config.endian);
    let listed = disassemble(&mut reader)
        .with_context(|| format!("Failed to disassemble {:?}", input))?;
    write_text(output, &render_listing(&listed))
}

pub fn tree(input: &Path, config: &SceneGraphConfig) -> Result<()> {
    let data = read_input(input, config)?;
    let (hierarchy, stats, _) = decode_stream(input, &data, config)?;

    let mut out = String::new();
    for (depth, joint) in hierarchy.depth_first() {
        let indent = "  ".repeat(depth);
        writeln!(out, "{indent}joint {}", joint.id)?;
        for display in &joint.displays {
            writeln!(
                out,
                "{indent}  material {} shape {}",
                display.material, display.shape
            )?;
        }
    }
    print!("{out}");

    tracing::info!(
        "{} joints, {} commands ({} bytes)",
        hierarchy.len(),
        stats.commands,
        stats.bytes
    );
    Ok(())
}

pub fn decode(input: &Path, output: Option<&Path>, config: &SceneGraphConfig) -> Result<()> {
    let data = read_input(input, config)?;
    let (hierarchy, _, _) = decode_stream(input, &data, config)?;
    let mut json = serde_json::to_string_pretty(&hierarchy)?;
    json.push('\n');
    write_text(output, &json)
}

pub fn encode(input: &Path, output: &Path, config: &SceneGraphConfig) -> Result<()> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {:?}", input))?;
    let hierarchy: Hierarchy = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse hierarchy {:?}", input))?;

    let bounds = fill_bounds(config.tables, hierarchy.required_bounds());
    hierarchy
        .validate(&bounds)
        .with_context(|| format!("Invalid hierarchy in {:?}", input))?;

    let bytes = Encoder::new(&hierarchy, bounds)?.encode(config.endian)?;
    std::fs::write(output, &bytes).with_context(|| format!("Failed to write {:?}", output))?;
    tracing::info!("Wrote {} bytes", bytes.len());
    Ok(())
}

pub fn assemble(input: &Path, output: &Path, config: &SceneGraphConfig) -> Result<()> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {:?}", input))?;
    let commands = parse_listing(&text).with_context(|| format!("Failed to parse {:?}", input))?;

    if commands.last().map(|c| c.op) != Some(ByteCodeOp::Terminate) {
        tracing::warn!("Listing does not end with TERMINATE");
    }

    let mut writer = ByteWriter::new(config.endian);
    bytecode::write_commands(&mut writer, &commands);
    let bytes = writer.into_bytes();
    std::fs::write(output, &bytes).with_context(|| format!("Failed to write {:?}", output))?;
    tracing::info!("Wrote {} commands ({} bytes)", commands.len(), bytes.len());
    Ok(())
}

pub fn verify(input: &Path, config: &SceneGraphConfig) -> Result<()> {
    let data = read_input(input, config)?;
    let (hierarchy, stats, bounds) = decode_stream(input, &data, config)?;

    let reencoded = Encoder::new(&hierarchy, bounds)
        .and_then(|encoder| encoder.encode(config.endian))
        .with_context(|| format!("Failed to re-encode {:?}", input))?;
    let original = &data[config.offset..config.offset + stats.bytes];

    if let Some(at) = first_difference(original, &reencoded) {
        bail!(
            "Re-encoded stream differs from {:?} at offset {:#x} ({} bytes in, {} bytes out)",
            input,
            config.offset + at / RECORD_SIZE * RECORD_SIZE,
            original.len(),
            reencoded.len()
        );
    }

    tracing::info!(
        "{:?}: round trip matches ({} commands, {} joints)",
        input,
        stats.commands,
        hierarchy.len()
    );
    Ok(())
}

fn read_input(input: &Path, config: &SceneGraphConfig) -> Result<Vec<u8>> {
    let data = std::fs::read(input).with_context(|| format!("Failed to read {:?}", input))?;
    if config.offset > data.len() {
        bail!(
            "Offset {:#x} is past the end of {:?} ({} bytes)",
            config.offset,
            input,
            data.len()
        );
    }
    Ok(data)
}

/// Decode with the configured table sizes, inferring any left unset
fn decode_stream(
    input: &Path,
    data: &[u8],
    config: &SceneGraphConfig,
) -> Result<(Hierarchy, DecodeStats, TableBounds)> {
    let mut reader = ByteReader::at_offset(data, config.offset, config.endian);
    let listed = disassemble(&mut reader)
        .with_context(|| format!("Failed to read commands from {:?}", input))?;
    let bounds = fill_bounds(config.tables, required_bounds(&listed));

    let mut reader = ByteReader::at_offset(data, config.offset, config.endian);
    let (hierarchy, stats) = Decoder::new(bounds, config.decode)
        .decode_with_stats(&mut reader)
        .with_context(|| format!("Failed to decode {:?}", input))?;
    Ok((hierarchy, stats, bounds))
}

/// Configured table sizes, with unset (zero) entries taken from `inferred`
fn fill_bounds(configured: TableBounds, inferred: TableBounds) -> TableBounds {
    let pick = |configured: usize, inferred: usize, table: &str| {
        if configured == 0 {
            tracing::debug!("Inferred {} table size {}", table, inferred);
            inferred
        } else {
            configured
        }
    };
    TableBounds::new(
        pick(configured.joints, inferred.joints, "joint"),
        pick(configured.materials, inferred.materials, "material"),
        pick(configured.shapes, inferred.shapes, "shape"),
    )
}

fn first_difference(a: &[u8], b: &[u8]) -> Option<usize> {
    a.iter()
        .zip(b)
        .position(|(x, y)| x != y)
        .or_else(|| (a.len() != b.len()).then_some(a.len().min(b.len())))
}

fn write_text(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("Failed to write {:?}", path))?;
            tracing::info!("Wrote {:?}", path);
        }
        None => print!("{text}"),
    }
    Ok(())
}
