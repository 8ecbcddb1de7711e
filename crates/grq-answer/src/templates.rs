//! Response templates and their Handlebars renderer.
//!
//! Templates live in an embedded YAML document so wording changes never
//! touch synthesis logic. Custom helpers:
//! - percent: format a ratio as a percentage
//! - join: join an array with a separator
use std::collections::HashMap;

use handlebars::{
    Context, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext,
};
use serde::Deserialize;
use serde_json::Value;

use grq_core::PipelineError;

/// Default response wording, one template per outcome shape plus the
/// role framings layered on top.
const BUILTIN_TEMPLATES: &str = r#"
version: "1.0"
templates:
  count:
    description: Plain record count
    template: "Found {{count}} {{#if (eq count 1)}}record{{else}}records{{/if}} in {{model}}."
  distinct_values:
    description: Unique values of one field
    template: "{{model}} has {{count}} distinct {{field}} values: {{join values \", \"}}."
  listing:
    description: Capped record listing
    template: "Showing {{shown}} of {{total}} records from {{model}}{{#if remainder}} (+{{remainder}} more){{/if}}."
  comparison:
    description: Per-value counts over one field
    template: "Comparison by {{field}}: {{join groups \"; \"}}."
  catalog:
    description: Available models and their fields
    template: "Available data: {{join models \", \"}}."
  executive_framing:
    description: Strategic sentence appended for executives
    template: " This reflects the current state of {{model}} across the golden record."
  disclosure:
    description: Confidence caveat
    template: "Interpreted with {{percent confidence}} confidence."
"#;

#[derive(Debug, Clone, Deserialize)]
pub struct TemplatesFile {
    pub version: String,
    pub templates: HashMap<String, Template>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Template {
    pub description: String,
    pub template: String,
}

impl TemplatesFile {
    pub fn from_yaml(yaml: &str) -> Result<Self, PipelineError> {
        serde_yaml::from_str(yaml)
            .map_err(|e| PipelineError::Unknown(format!("templates parse: {}", e)))
    }

    pub fn builtin() -> Self {
        // The embedded document is part of the crate; failing to parse it
        // is a programming error caught by the unit tests below.
        Self::from_yaml(BUILTIN_TEMPLATES).unwrap_or(Self {
            version: "1.0".to_string(),
            templates: HashMap::new(),
        })
    }
}

/// Compiled renderer with registered helpers.
pub struct TemplateRenderer<'a> {
    handlebars: Handlebars<'a>,
}

impl<'a> TemplateRenderer<'a> {
    pub fn new(templates: &TemplatesFile) -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);

        handlebars.register_helper("percent", Box::new(PercentHelper));
        handlebars.register_helper("join", Box::new(JoinHelper));

        for (name, template) in &templates.templates {
            let _ = handlebars.register_template_string(name, &template.template);
        }

        TemplateRenderer { handlebars }
    }

    pub fn render(&self, template_name: &str, data: &Value) -> Result<String, PipelineError> {
        self.handlebars
            .render(template_name, data)
            .map_err(|e| PipelineError::Unknown(format!("render {}: {}", template_name, e)))
    }
}

impl Default for TemplateRenderer<'_> {
    fn default() -> Self {
        Self::new(&TemplatesFile::builtin())
    }
}

/// Format a ratio as a percentage (0.85 -> "85%").
struct PercentHelper;

impl HelperDef for PercentHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _r: &'reg Handlebars<'reg>,
        _ctx: &'rc Context,
        _rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let value = h.param(0).and_then(|v| v.value().as_f64()).unwrap_or(0.0);
        let percent = (value * 100.0).round() as i64;
        out.write(&format!("{}%", percent))?;
        Ok(())
    }
}

/// Join an array with a separator.
struct JoinHelper;

impl HelperDef for JoinHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _r: &'reg Handlebars<'reg>,
        _ctx: &'rc Context,
        _rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let array = h.param(0).and_then(|v| v.value().as_array());
        let separator = h.param(1).and_then(|v| v.value().as_str()).unwrap_or(", ");

        if let Some(arr) = array {
            let strings: Vec<String> = arr
                .iter()
                .map(|v| v.as_str().map(String::from).unwrap_or_else(|| v.to_string()))
                .collect();
            out.write(&strings.join(separator))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtin_templates_parse() {
        let file = TemplatesFile::builtin();
        assert!(file.templates.contains_key("count"));
        assert!(file.templates.contains_key("distinct_values"));
        assert!(file.templates.contains_key("disclosure"));
    }

    #[test]
    fn test_count_render() {
        let renderer = TemplateRenderer::default();
        let result = renderer
            .render("count", &json!({ "count": 6, "model": "Advertisements" }))
            .unwrap();
        assert_eq!(result, "Found 6 records in Advertisements.");
    }

    #[test]
    fn test_distinct_values_render() {
        let renderer = TemplateRenderer::default();
        let result = renderer
            .render(
                "distinct_values",
                &json!({
                    "count": 3,
                    "model": "Advertisements",
                    "field": "ADVERTISER",
                    "values": ["Sony", "Apple", "Microsoft"],
                }),
            )
            .unwrap();
        assert_eq!(
            result,
            "Advertisements has 3 distinct ADVERTISER values: Sony, Apple, Microsoft."
        );
    }

    #[test]
    fn test_percent_helper() {
        let renderer = TemplateRenderer::default();
        let result = renderer.render("disclosure", &json!({ "confidence": 0.72 })).unwrap();
        assert_eq!(result, "Interpreted with 72% confidence.");
    }

    #[test]
    fn test_listing_remainder() {
        let renderer = TemplateRenderer::default();
        let result = renderer
            .render(
                "listing",
                &json!({ "shown": 10, "total": 14, "model": "Advertisements", "remainder": 4 }),
            )
            .unwrap();
        assert_eq!(result, "Showing 10 of 14 records from Advertisements (+4 more).");
    }
}
