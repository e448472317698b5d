use std::io::Write;

use crate::models::{EpisodeRecord, InstructionSource};

pub const MISSING_INSTRUCTION: &str = "N/A";
pub const RULE_WIDTH: usize = 80;

pub fn rule(ch: char) -> String {
    ch.to_string().repeat(RULE_WIDTH)
}

/// Writes the header block of one selected episode.
pub fn write_episode(
    out: &mut dyn Write,
    index: usize,
    total: usize,
    episode: &EpisodeRecord,
) -> std::io::Result<()> {
    writeln!(out, "\n{}", rule('='))?;
    writeln!(out, "Episode #{}/{}", index, total)?;
    writeln!(out, "{}", rule('='))?;
    writeln!(out, "Episode ID: {}", episode.episode_id)?;
    writeln!(out, "Scene ID: {}", episode.scene_id)?;

    match episode.extract_instruction() {
        Some(extracted) if extracted.source == InstructionSource::Goals => {
            writeln!(out, "Goals: {}", extracted.text)?
        }
        Some(extracted) => writeln!(out, "Instruction: {}", extracted.text)?,
        None => writeln!(out, "Instruction: {}", MISSING_INSTRUCTION)?,
    }

    if let Some(ref position) = episode.start_position {
        writeln!(out, "Start Position: {}", format_vector(position))?;
    }
    if let Some(ref rotation) = episode.start_rotation {
        writeln!(out, "Start Rotation: {}", format_vector(rotation))?;
    }
    Ok(())
}

fn format_vector(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(", "))
}
