use crate::error::Result;
use crate::index::reader::IndexReader;
use crate::index::types::*;
use crate::utils::{format_size, index_file};
use std::path::Path;

/// Display the project metadata of an index
pub fn show_stats(index_name: &Path) -> Result<()> {
    let project = IndexReader::read_project(index_name)?;

    println!("Index Statistics");
    println!("================");
    println!();
    println!("Index name:       {}", index_name.display());
    println!("Index version:    {}", project.version);
    println!("Build id:         {:016x}", project.build_id);
    println!("Alphabet:         {} ({} characters)", project.alphabet.name, project.alphabet.groups.len());
    println!("Satellite:        {}", project.satellite);
    println!("Direction:        {}", project.direction);
    println!("Sequences:        {}", project.num_sequences);
    println!("Residues:         {}", project.num_residues);
    println!("Total length:     {}", project.total_length);
    if let Some(len) = project.equal_length {
        println!("Sequence length:  {} (all equal)", len);
    }
    println!("Wildcards:        {}", project.wildcards);
    println!("Special ranges:   {}", project.special_ranges);
    println!("Prefix length:    {}", project.prefix_length);
    println!("Strategy:         {} ({} parts)", project.strategy, project.parts);

    println!();
    println!("Character distribution:");
    for (group, count) in project.alphabet.groups.iter().zip(&project.character_distribution) {
        let symbol = group.chars().next().unwrap_or('?');
        let share = if project.num_residues > 0 {
            100.0 * *count as f64 / project.num_residues as f64
        } else {
            0.0
        };
        println!("  {}  {:12} {:6.2}%", symbol, count, share);
    }

    println!();
    println!("Input files:");
    for file in &project.files {
        println!(
            "  {} ({:?}, {} sequences, {} residues)",
            file.path.display(),
            file.format,
            file.sequences,
            file.residues
        );
    }

    println!();
    println!("Tables:");
    let mut total = 0;
    for kind in project.tables.iter() {
        let size = std::fs::metadata(index_file(index_name, kind.ext()))
            .map(|m| m.len())
            .unwrap_or(0);
        total += size;
        println!("  {:4} {}", kind.ext(), format_size(size));
    }
    println!("Index size:       {}", format_size(total));

    println!();
    println!("Created:          {}", format_timestamp(project.created_at));

    Ok(())
}

/// Format unix timestamp
fn format_timestamp(ts: u64) -> String {
    use std::time::{Duration, UNIX_EPOCH};
    let datetime = UNIX_EPOCH + Duration::from_secs(ts);
    format!("{:?}", datetime)
}
