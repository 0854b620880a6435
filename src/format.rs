//! Output formatting for resolution plans.

use crate::fields::Origin;
use crate::resolver::{Decision, Resolution};
use crate::writer::PlannedTarget;
use anyhow::Result;

/// Output format for `plan`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Markdown,
    /// The exact file contents, separated by path headers.
    Raw,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "markdown" | "md" => Some(OutputFormat::Markdown),
            "raw" | "xml" => Some(OutputFormat::Raw),
            _ => None,
        }
    }
}

fn decision_label(decision: Decision) -> &'static str {
    match decision {
        Decision::Create => "create",
        Decision::ForceOverwrite => "force overwrite",
        Decision::Regenerate => "regenerate",
        Decision::Preserve => "keep existing",
    }
}

fn origin_label(origin: &Origin) -> String {
    match origin {
        Origin::Env(name) => format!("`{}`", name),
        Origin::GatedDefault => "version default".to_string(),
        Origin::StaticDefault => "default".to_string(),
        Origin::Fixed => "fixed".to_string(),
        Origin::Derived => "derived".to_string(),
    }
}

/// Format a plan as markdown: one section per target with a value table.
pub fn format_plan_markdown(plan: &[PlannedTarget]) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Configuration plan ({} targets)\n\n", plan.len()));

    for target in plan {
        md.push_str(&format!("## {}\n", target.kind));
        md.push_str(&format!("- **path**: `{}`\n", target.path.display()));
        md.push_str(&format!(
            "- **action**: {}\n",
            decision_label(target.resolution.decision())
        ));

        if let Resolution::Fresh { generated, .. } = &target.resolution
            && !generated.trace.is_empty()
        {
            md.push_str("\n| field | value | from |\n|---|---|---|\n");
            for entry in &generated.trace {
                md.push_str(&format!(
                    "| {} | `{}` | {} |\n",
                    entry.field,
                    entry.value,
                    origin_label(&entry.origin)
                ));
            }
        }
        md.push('\n');
    }

    md
}

/// Format a plan as pretty JSON.
pub fn format_plan_json(plan: &[PlannedTarget]) -> Result<String> {
    Ok(serde_json::to_string_pretty(plan)?)
}

/// Format a plan as the files it would leave on disk. Kept files that are
/// not UTF-8 are shown lossily.
pub fn format_plan_raw(plan: &[PlannedTarget]) -> String {
    let mut out = String::new();
    for target in plan {
        out.push_str(&format!("==> {} <==\n", target.path.display()));
        out.push_str(&String::from_utf8_lossy(&target.resolution.content()));
        out.push('\n');
    }
    out
}

pub fn format_plan(plan: &[PlannedTarget], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => format_plan_json(plan),
        OutputFormat::Markdown => Ok(format_plan_markdown(plan)),
        OutputFormat::Raw => Ok(format_plan_raw(plan)),
    }
}
