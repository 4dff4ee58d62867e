use anyhow::Context;
use minijinja::Environment;
use serde_json::Value;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// File-based template renderer, registered as the persistent `templates`
/// dependency by `App::templates`.
///
/// Templates are read from disk on every render, so edits show up without a
/// restart. Names ending in `.html` are rendered with HTML auto-escaping.
#[derive(Debug, Clone)]
pub struct Templates {
    base_dir: PathBuf,
}

impl Templates {
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Self {
            base_dir: base.into(),
        }
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn map_path(&self, name: &str) -> Option<PathBuf> {
        let mut pb = self.base_dir.clone();
        for comp in Path::new(name.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(pb)
    }

    /// Render `name` with `ctx`.
    ///
    /// # Errors
    ///
    /// Fails for names escaping the base directory, unreadable files and
    /// template syntax or render errors.
    pub fn render(&self, name: &str, ctx: &Value) -> anyhow::Result<String> {
        let path = self
            .map_path(name)
            .ok_or_else(|| anyhow::anyhow!("template name '{name}' escapes the template root"))?;
        let source = fs::read_to_string(&path)
            .with_context(|| format!("failed to read template {}", path.display()))?;

        let mut env = Environment::new();
        env.add_template(name, &source)
            .with_context(|| format!("failed to compile template '{name}'"))?;
        let rendered = env
            .get_template(name)
            .and_then(|tmpl| tmpl.render(ctx))
            .with_context(|| format!("failed to render template '{name}'"))?;
        debug!(template = %name, bytes = rendered.len(), "Template rendered");
        Ok(rendered)
    }
}
