//! Manifest rendering
//!
//! Every `*.tmpl` file in a chart's `templates/` directory is a Jinja
//! template for one compose manifest; other files are ignored. The merged
//! values are exposed under the `Values` namespace, undefined lookups
//! render as empty rather than failing, and a directory renders atomically:
//! one bad template fails the whole set and nothing is returned.

use indexmap::IndexMap;
use minijinja::{context, Environment, UndefinedBehavior};
use shipwright_core::Values;
use std::path::Path;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::filters;

/// Suffix stripped from template file names
pub const TEMPLATE_SUFFIX: &str = ".tmpl";

/// Required extension of a rendered manifest
pub const MANIFEST_EXT: &str = ".yml";

/// Compose manifest renderer
pub struct Renderer {
    env: Environment<'static>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        let mut env = Environment::new();
        // Missing keys render as empty output, matching the contract that
        // absent values produce an empty field rather than a hard error.
        env.set_undefined_behavior(UndefinedBehavior::Lenient);
        env.add_filter("toyaml", filters::toyaml);
        env.add_filter("quote", filters::quote);
        Self { env }
    }

    /// Render a single template string against the merged values
    pub fn render_str(&self, template: &str, values: &Values, name: &str) -> Result<String> {
        self.env
            .render_str(template, context! { Values => values.inner() })
            .map_err(|source| EngineError::Template {
                name: name.to_string(),
                source,
            })
    }

    /// Render every `*.tmpl` file in a templates directory.
    ///
    /// Returns rendered manifests keyed by output file name, in sorted
    /// input order. Files without the template suffix are skipped. Any
    /// template error aborts the whole directory.
    pub fn render_dir(&self, templates_dir: &Path, values: &Values) -> Result<IndexMap<String, String>> {
        if !templates_dir.is_dir() {
            return Err(EngineError::TemplatesDirNotFound {
                path: templates_dir.display().to_string(),
            });
        }

        let mut files: Vec<(String, std::path::PathBuf)> = Vec::new();
        for entry in std::fs::read_dir(templates_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str()
                && name.ends_with(TEMPLATE_SUFFIX)
            {
                files.push((name.to_string(), entry.path()));
            }
        }
        files.sort();

        let mut rendered = IndexMap::new();
        for (name, path) in files {
            let out_name = output_name(&name);
            let template = std::fs::read_to_string(&path)?;
            let content = self.render_str(&template, values, &name)?;
            debug!(template = %name, output = %out_name, "rendered manifest");
            rendered.insert(out_name, content);
        }

        Ok(rendered)
    }
}

/// Output file name for a template: the `.tmpl` suffix is stripped and a
/// `.yml` extension appended when the remainder does not already carry one.
pub fn output_name(template_name: &str) -> String {
    let out = template_name
        .strip_suffix(TEMPLATE_SUFFIX)
        .unwrap_or(template_name);
    if out.ends_with(MANIFEST_EXT) {
        out.to_string()
    } else {
        format!("{out}{MANIFEST_EXT}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(yaml: &str) -> Values {
        Values::from_yaml(yaml).unwrap()
    }

    #[test]
    fn test_values_namespace() {
        let renderer = Renderer::new();
        let out = renderer
            .render_str(
                "image: {{ Values.image }}:{{ Values.tag }}",
                &values("image: redis\ntag: '7'\n"),
                "t",
            )
            .unwrap();
        assert_eq!(out, "image: redis:7");
    }

    #[test]
    fn test_missing_key_renders_empty() {
        let renderer = Renderer::new();
        let out = renderer
            .render_str("tag: '{{ Values.no.such.key }}'", &values("a: 1\n"), "t")
            .unwrap();
        assert_eq!(out, "tag: ''");
    }

    #[test]
    fn test_filters_registered() {
        let renderer = Renderer::new();
        let out = renderer
            .render_str(
                "{{ Values.port | quote }}",
                &values("port: 6379\n"),
                "t",
            )
            .unwrap();
        assert_eq!(out, "\"6379\"");
    }

    #[test]
    fn test_output_name_strips_suffix() {
        assert_eq!(output_name("docker-compose.yml.tmpl"), "docker-compose.yml");
        assert_eq!(output_name("extra.yml"), "extra.yml");
    }

    #[test]
    fn test_output_name_appends_manifest_extension() {
        assert_eq!(output_name("backup.tmpl"), "backup.yml");
        assert_eq!(output_name("jobs"), "jobs.yml");
    }

    #[test]
    fn test_render_dir_sorted_and_named() {
        let dir = tempfile::tempdir().unwrap();
        let templates = dir.path().join("templates");
        std::fs::create_dir(&templates).unwrap();
        std::fs::write(
            templates.join("docker-compose.yml.tmpl"),
            "services:\n  web:\n    image: {{ Values.image }}\n",
        )
        .unwrap();
        std::fs::write(templates.join("extra.yml.tmpl"), "x: 1\n").unwrap();

        let renderer = Renderer::new();
        let rendered = renderer
            .render_dir(&templates, &values("image: nginx\n"))
            .unwrap();

        let names: Vec<&String> = rendered.keys().collect();
        assert_eq!(names, vec!["docker-compose.yml", "extra.yml"]);
        assert!(rendered["docker-compose.yml"].contains("image: nginx"));
    }

    #[test]
    fn test_render_dir_ignores_non_template_files() {
        let dir = tempfile::tempdir().unwrap();
        let templates = dir.path().join("templates");
        std::fs::create_dir(&templates).unwrap();
        std::fs::write(templates.join("docker-compose.yml.tmpl"), "ok: 1\n").unwrap();
        std::fs::write(templates.join("README.md"), "# docs\n").unwrap();
        std::fs::write(templates.join("notes.txt"), "scratch\n").unwrap();

        let renderer = Renderer::new();
        let rendered = renderer
            .render_dir(&templates, &values("a: 1\n"))
            .unwrap();

        let names: Vec<&String> = rendered.keys().collect();
        assert_eq!(names, vec!["docker-compose.yml"]);
    }

    #[test]
    fn test_render_dir_atomic_on_bad_template() {
        let dir = tempfile::tempdir().unwrap();
        let templates = dir.path().join("templates");
        std::fs::create_dir(&templates).unwrap();
        std::fs::write(templates.join("a.yml.tmpl"), "ok: 1\n").unwrap();
        std::fs::write(templates.join("b.yml.tmpl"), "bad: {{ Values.x |\n").unwrap();

        let renderer = Renderer::new();
        let err = renderer
            .render_dir(&templates, &values("x: 1\n"))
            .unwrap_err();
        assert!(matches!(err, EngineError::Template { .. }));
    }

    #[test]
    fn test_render_dir_missing() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = Renderer::new();
        let err = renderer
            .render_dir(&dir.path().join("nope"), &values("a: 1\n"))
            .unwrap_err();
        assert!(matches!(err, EngineError::TemplatesDirNotFound { .. }));
    }
}
