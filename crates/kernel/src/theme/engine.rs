//! Theme engine with Tera templates.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use tera::{Tera, Value};
use tracing::debug;

/// URL prefix static files are served under.
const STATIC_URL: &str = "/static/";

/// Theme engine for rendering templates.
pub struct ThemeEngine {
    /// Tera template engine instance.
    tera: Tera,
}

impl ThemeEngine {
    /// Create a new theme engine loading templates from the given directory.
    pub fn new(template_dir: &Path) -> Result<Self> {
        let pattern = template_dir.join("**/*.html");
        let pattern_str = pattern
            .to_str()
            .context("invalid template directory path")?;

        let mut tera = Tera::new(pattern_str).context("failed to initialize Tera templates")?;
        Self::register_filters(&mut tera);

        let template_names: Vec<_> = tera.get_template_names().collect();
        debug!(count = template_names.len(), "loaded templates");

        Ok(Self { tera })
    }

    /// Create a theme engine from in-memory templates.
    pub fn from_raw(templates: &[(&str, &str)]) -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(templates.iter().copied())
            .context("failed to parse templates")?;
        Self::register_filters(&mut tera);
        Ok(Self { tera })
    }

    /// Register custom Tera filters.
    fn register_filters(tera: &mut Tera) {
        // Normalized image path -> URL under /static; empty for missing images
        tera.register_filter(
            "image_url",
            |value: &Value, _args: &HashMap<String, Value>| {
                let url = match value.as_str() {
                    Some(path) if !path.is_empty() => {
                        format!("{STATIC_URL}{}", path.trim_start_matches('/'))
                    }
                    _ => String::new(),
                };
                Ok(Value::String(url))
            },
        );

        // Signed year -> 公元前300年 / 公元1046年
        tera.register_filter(
            "format_year",
            |value: &Value, _args: &HashMap<String, Value>| {
                let formatted = match value.as_i64() {
                    Some(year) if year < 0 => format!("公元前{}年", -year),
                    Some(year) => format!("公元{year}年"),
                    None => String::new(),
                };
                Ok(Value::String(formatted))
            },
        );

        // RFC 3339 timestamp -> "2025-12-04 14:30"; other strings pass through
        tera.register_filter(
            "format_datetime",
            |value: &Value, _args: &HashMap<String, Value>| {
                let Some(raw) = value.as_str() else {
                    return Ok(Value::String(String::new()));
                };
                let formatted = chrono::DateTime::parse_from_rfc3339(raw)
                    .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|_| raw.to_string());
                Ok(Value::String(formatted))
            },
        );
    }

    /// Get the underlying Tera instance for custom operations.
    pub fn tera(&self) -> &Tera {
        &self.tera
    }

    /// Render a template by name.
    pub fn render(&self, template: &str, context: &tera::Context) -> Result<String> {
        self.tera
            .render(template, context)
            .with_context(|| format!("failed to render template {template}"))
    }

    /// Check if a path is an admin path.
    pub fn is_admin_path(path: &str) -> bool {
        path == "/admin" || path.starts_with("/admin/")
    }
}

impl std::fmt::Debug for ThemeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeEngine")
            .field("template_count", &self.tera.get_template_names().count())
            .finish()
    }
}
