use libimgsync::AggregateReport;
use serde::Serialize;

/// Output format for the `sync` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable summary
    #[default]
    Pretty,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "yaml" | "yml" => OutputFormat::Yaml,
            _ => OutputFormat::Pretty,
        }
    }
}

/// Trait for types that can be formatted for CLI output
pub trait Formattable: Serialize {
    /// Format the type for pretty (human-readable) output
    fn format_pretty(&self) -> String;
}

impl Formattable for AggregateReport {
    fn format_pretty(&self) -> String {
        let mut out = String::new();
        for image in &self.images {
            out.push_str(&format!("{}\n", image.name));
            out.push_str(&format!("  Repository: {}\n", image.repository));
            if image.latest.is_empty() {
                out.push_str("  Latest:     -\n");
            } else {
                out.push_str(&format!("  Latest:     {} ({})\n", image.latest, image.digest));
            }
            out.push_str(&format!("  Login:      {}\n", image.login));
            out.push_str(&format!("  Tags:       {}\n", image.tags.len()));
        }
        out.push_str(&format!(
            "\n{} images, {} tags, {} ms (updated {})",
            self.images.len(),
            self.tag_count(),
            self.duration,
            self.updated.to_rfc3339()
        ));
        out
    }
}

/// Format a single item for output
pub fn format_output<T: Formattable>(item: &T, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Pretty => Ok(item.format_pretty()),
        OutputFormat::Json => serde_json::to_string_pretty(item)
            .map_err(|e| format!("Failed to serialize to JSON: {}", e)),
        OutputFormat::Yaml => {
            serde_yaml::to_string(item).map_err(|e| format!("Failed to serialize to YAML: {}", e))
        }
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
