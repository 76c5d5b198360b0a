//! Markdown rendering of registry responses

use skillshelf_skills::{SkillMetadata, SkillResponse, SkillSummary};
use std::fmt::Write;
use std::path::PathBuf;

/// Human-readable message for a response
///
/// `sources` are the searched roots, named when a listing comes back empty.
pub fn render_message(response: &SkillResponse, sources: &[PathBuf]) -> String {
    match response {
        SkillResponse::List { skills } if skills.is_empty() => {
            let sources: Vec<String> = sources.iter().map(|s| s.display().to_string()).collect();
            format!("No skills found in {}", sources.join(", "))
        }
        SkillResponse::List { skills } => summaries("Available Skills:", skills),
        SkillResponse::Search { term, matches } if matches.is_empty() => {
            format!("No skills matching '{term}'")
        }
        SkillResponse::Search { term, matches } => {
            summaries(&format!("Skills matching '{term}':"), matches)
        }
        SkillResponse::Info(skill) => render_info(skill),
        SkillResponse::Load(skill) => {
            let mut out = format!("# {}\n\n{}", skill.name, skill.content);
            if !skill.reference_files.is_empty() {
                let _ = write!(
                    out,
                    "\n\n---\nReference files in {}:\n",
                    skill.directory.display()
                );
                for file in &skill.reference_files {
                    let _ = writeln!(out, "- {}", file.display());
                }
            }
            out
        }
    }
}

fn summaries(title: &str, skills: &[SkillSummary]) -> String {
    let mut lines = vec![title.to_string(), String::new()];
    lines.extend(
        skills
            .iter()
            .map(|s| format!("**{}**: {}", s.name, s.description)),
    );
    lines.join("\n")
}

fn render_info(skill: &SkillMetadata) -> String {
    let mut out = format!(
        "**{}** (version {})\n\n{}\n\n",
        skill.name, skill.version, skill.description
    );
    if let Some(license) = &skill.license {
        let _ = writeln!(out, "License: {license}");
    }
    let _ = writeln!(out, "Directory: {}", skill.directory.display());
    let _ = write!(out, "Source: {}", skill.source.display());

    if !skill.extra.is_empty() {
        out.push_str("\n\nMetadata:");
        for (key, value) in &skill.extra {
            let _ = write!(out, "\n- {key}: {value}");
        }
    }
    out
}
