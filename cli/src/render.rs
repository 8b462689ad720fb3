//! Plain-text rendering of design documents.

use std::fmt::{self, Display, Formatter};

use serde_json::{Map, Value};
use shared::DesignDocument;

const SUMMARY_LIMIT: usize = 100;

/// Full view of one document. Sections the backend left out are skipped.
pub fn document(doc: &DesignDocument) -> String {
    DocumentView(doc).to_string()
}

/// One line per document, in the order given.
pub fn history<D: AsRef<DesignDocument>>(designs: &[D]) -> String {
    HistoryView(designs).to_string()
}

/// Version chain, root first.
pub fn lineage<D: AsRef<DesignDocument>>(chain: &[D]) -> String {
    LineageView(chain).to_string()
}

struct DocumentView<'a>(&'a DesignDocument);

impl Display for DocumentView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let doc = self.0;
        writeln!(f, "Design {}", doc.id)?;
        writeln!(f, "Generated: {}", local_time(doc))?;
        if doc.version.get() > 1 {
            writeln!(f, "Version {}", doc.version)?;
        }
        if let Some(parent) = &doc.parent_id {
            writeln!(f, "Revises: {}", parent)?;
        }

        writeln!(f, "\nRequirements\n  {}", doc.requirements)?;
        if !doc.constraints.is_empty() {
            writeln!(f, "Constraints\n  {}", doc.constraints.join(", "))?;
        }

        let design = &doc.design;
        if let Some(components) = &design.components {
            writeln!(f, "\nComponents")?;
            for component in components {
                let name = component.name.as_deref().unwrap_or("(unnamed)");
                match &component.technology {
                    Some(tech) => writeln!(f, "  {} [{}]", name, tech)?,
                    None => writeln!(f, "  {}", name)?,
                }
                if let Some(kind) = &component.kind {
                    writeln!(f, "    {}", kind)?;
                }
                for responsibility in &component.responsibilities {
                    writeln!(f, "    - {}", responsibility)?;
                }
            }
        }
        if let Some(capacity) = &design.capacity_estimations {
            section_map(f, "Capacity Estimations", capacity)?;
        }
        if let Some(tradeoffs) = &design.tradeoffs {
            section_list(f, "Tradeoffs", tradeoffs)?;
        }
        if let Some(patterns) = &design.architecture_patterns {
            section_list(f, "Architecture Patterns", patterns)?;
        }
        if let Some(nfrs) = &design.non_functional_requirements {
            section_map(f, "Non-Functional Requirements", nfrs)?;
        }
        if !design.extra.is_empty() {
            section_map(f, "Other", &design.extra)?;
        }
        Ok(())
    }
}

struct HistoryView<'a, D>(&'a [D]);

impl<D: AsRef<DesignDocument>> Display for HistoryView<'_, D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No designs yet.");
        }

        for doc in self.0 {
            let doc = doc.as_ref();
            write!(f, "{}", doc.id)?;
            if doc.version.get() > 1 {
                write!(f, " v{}", doc.version)?;
            }
            if doc.parent_id.is_some() {
                write!(f, " (updated)")?;
            }
            writeln!(f, "  {}", local_time(doc))?;
            writeln!(
                f,
                "  {}  [{} constraints, {} components]",
                truncate(&doc.requirements, SUMMARY_LIMIT),
                doc.constraints.len(),
                doc.design.components.as_ref().map_or(0, Vec::len)
            )?;
        }
        Ok(())
    }
}

struct LineageView<'a, D>(&'a [D]);

impl<D: AsRef<DesignDocument>> Display for LineageView<'_, D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (depth, doc) in self.0.iter().enumerate() {
            let doc = doc.as_ref();
            writeln!(
                f,
                "{}v{} {}  {}",
                "  ".repeat(depth),
                doc.version,
                doc.id,
                local_time(doc)
            )?;
        }
        Ok(())
    }
}

fn section_list(f: &mut Formatter<'_>, title: &str, items: &[String]) -> fmt::Result {
    writeln!(f, "\n{}", title)?;
    for item in items {
        writeln!(f, "  - {}", item)?;
    }
    Ok(())
}

fn section_map(f: &mut Formatter<'_>, title: &str, entries: &Map<String, Value>) -> fmt::Result {
    writeln!(f, "\n{}", title)?;
    for (key, value) in entries {
        writeln!(f, "  {}: {}", label(key), scalar(value))?;
    }
    Ok(())
}

fn label(key: &str) -> String {
    key.replace('_', " ")
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Backend wall-clock times were read in the local zone, so this shows them unchanged.
fn local_time(doc: &DesignDocument) -> String {
    doc.timestamp
        .with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
