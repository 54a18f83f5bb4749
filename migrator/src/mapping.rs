//! Image mapping strategies.
//!
//! Every changed image goes through an [`ImageMapper`] before its destination key is projected.
//! Mappers are pure: they receive the source image and return the destination image.

use config::shared::MappingRuleConfig;

use crate::error::{ErrorKind, MigratorError, MigratorResult};
use crate::{bail, migrator_error};
use crate::types::Image;

/// Converts a source image into a destination image.
pub trait ImageMapper {
    fn map_image(&self, image: &Image) -> MigratorResult<Image>;
}

impl<F> ImageMapper for F
where
    F: Fn(&Image) -> MigratorResult<Image>,
{
    fn map_image(&self, image: &Image) -> MigratorResult<Image> {
        self(image)
    }
}

/// Returns every image unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityMapper;

impl ImageMapper for IdentityMapper {
    fn map_image(&self, image: &Image) -> MigratorResult<Image> {
        Ok(image.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Attribute(String),
}

/// A parsed `format` template.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Template {
    segments: Vec<Segment>,
}

impl Template {
    fn parse(template: &str) -> MigratorResult<Template> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }

                    if !closed || name.is_empty() || name.contains('{') {
                        bail!(
                            ErrorKind::ConfigError,
                            "Invalid mapping template",
                            format!("The template '{template}' contains a malformed placeholder")
                        );
                    }

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Attribute(name));
                }
                '}' => {
                    bail!(
                        ErrorKind::ConfigError,
                        "Invalid mapping template",
                        format!("The template '{template}' contains an unmatched '}}'")
                    );
                }
                c => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Template { segments })
    }

    fn render(&self, image: &Image) -> MigratorResult<String> {
        let mut rendered = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => rendered.push_str(literal),
                Segment::Attribute(name) => {
                    let Some(value) = image.get(name) else {
                        bail!(
                            ErrorKind::MappingFailed,
                            "Mapping template references a missing attribute",
                            format!("The attribute '{name}' is not present in the image")
                        );
                    };

                    let Some(text) = value.as_text() else {
                        bail!(
                            ErrorKind::MappingFailed,
                            "Mapping template references a non scalar attribute",
                            format!(
                                "The attribute '{name}' has type {}, expected S or N",
                                value.type_tag()
                            )
                        );
                    };

                    rendered.push_str(text);
                }
            }
        }

        Ok(rendered)
    }
}

#[derive(Debug, Clone)]
enum Rule {
    Rename { from: String, to: String },
    Copy { from: String, to: String },
    Remove { attribute: String },
    Format { to: String, template: Template },
}

/// Applies a sequence of declarative rules, each one to the output of the previous one.
#[derive(Debug, Clone)]
pub struct RuleMapper {
    rules: Vec<Rule>,
}

impl RuleMapper {
    /// Builds a mapper from configuration, parsing every `format` template up front.
    pub fn new(rules: &[MappingRuleConfig]) -> MigratorResult<RuleMapper> {
        let rules = rules
            .iter()
            .map(|rule| {
                Ok(match rule {
                    MappingRuleConfig::Rename { from, to } => Rule::Rename {
                        from: from.clone(),
                        to: to.clone(),
                    },
                    MappingRuleConfig::Copy { from, to } => Rule::Copy {
                        from: from.clone(),
                        to: to.clone(),
                    },
                    MappingRuleConfig::Remove { attribute } => Rule::Remove {
                        attribute: attribute.clone(),
                    },
                    MappingRuleConfig::Format { to, template } => Rule::Format {
                        to: to.clone(),
                        template: Template::parse(template)?,
                    },
                })
            })
            .collect::<MigratorResult<Vec<_>>>()?;

        Ok(RuleMapper { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn missing_attribute(rule: &str, name: &str) -> MigratorError {
    migrator_error!(
        ErrorKind::MappingFailed,
        "Mapping rule references a missing attribute",
        format!("The {rule} rule expects attribute '{name}', which is not present in the image")
    )
}

impl ImageMapper for RuleMapper {
    fn map_image(&self, image: &Image) -> MigratorResult<Image> {
        let mut mapped = image.clone();

        for rule in &self.rules {
            match rule {
                Rule::Rename { from, to } => {
                    let value = mapped
                        .remove(from)
                        .ok_or_else(|| missing_attribute("rename", from))?;
                    mapped.insert(to.clone(), value);
                }
                Rule::Copy { from, to } => {
                    let value = mapped
                        .get(from)
                        .cloned()
                        .ok_or_else(|| missing_attribute("copy", from))?;
                    mapped.insert(to.clone(), value);
                }
                Rule::Remove { attribute } => {
                    mapped
                        .remove(attribute)
                        .ok_or_else(|| missing_attribute("remove", attribute))?;
                }
                Rule::Format { to, template } => {
                    let value = template.render(&mapped)?;
                    mapped.insert(to.clone(), value);
                }
            }
        }

        Ok(mapped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttributeValue;

    fn rules(json: &str) -> RuleMapper {
        let config: Vec<MappingRuleConfig> = serde_json::from_str(json).unwrap();
        RuleMapper::new(&config).unwrap()
    }

    #[test]
    fn reshapes_legacy_keys_into_single_table_layout() {
        let mapper = rules(
            r#"[
                {"rule": "copy", "from": "SortKey", "to": "gsi1_pk"},
                {"rule": "format", "to": "gsi1_sk", "template": "new-{someKey}"},
                {"rule": "rename", "from": "PartitionKey", "to": "pk"},
                {"rule": "rename", "from": "SortKey", "to": "sk"}
            ]"#,
        );
        let image = Image::new()
            .with("PartitionKey", "user#1")
            .with("SortKey", "profile")
            .with("someKey", "abc");

        let mapped = mapper.map_image(&image).unwrap();

        assert_eq!(
            mapped,
            Image::new()
                .with("pk", "user#1")
                .with("sk", "profile")
                .with("gsi1_pk", "profile")
                .with("gsi1_sk", "new-abc")
                .with("someKey", "abc")
        );
    }

    #[test]
    fn format_accepts_numbers_and_escaped_braces() {
        let mapper = rules(r#"[{"rule": "format", "to": "label", "template": "{{v{n}}}"}]"#);
        let image = Image::new().with("n", AttributeValue::N("42".to_owned()));

        let mapped = mapper.map_image(&image).unwrap();

        assert_eq!(mapped.get("label"), Some(&AttributeValue::from("{v42}")));
    }

    #[test]
    fn missing_attribute_fails_mapping() {
        let mapper = rules(r#"[{"rule": "rename", "from": "PartitionKey", "to": "pk"}]"#);

        let err = mapper.map_image(&Image::new().with("pk", "a")).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MappingFailed);
    }

    #[test]
    fn format_rejects_non_scalar_attributes() {
        let mapper = rules(r#"[{"rule": "format", "to": "x", "template": "{flag}"}]"#);

        let err = mapper
            .map_image(&Image::new().with("flag", true))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MappingFailed);
    }

    #[test]
    fn malformed_templates_are_rejected() {
        for template in ["{", "{}", "a}", "{a{b}"] {
            let config = vec![MappingRuleConfig::Format {
                to: "x".to_owned(),
                template: template.to_owned(),
            }];

            let err = RuleMapper::new(&config).unwrap_err();

            assert_eq!(err.kind(), ErrorKind::ConfigError, "template {template}");
        }
    }

    #[test]
    fn closures_are_mappers() {
        let mapper = |image: &Image| -> MigratorResult<Image> {
            Ok(image.clone().with("migrated", true))
        };

        let mapped = mapper.map_image(&Image::new()).unwrap();

        assert_eq!(mapped.get("migrated"), Some(&AttributeValue::Bool(true)));
    }
}
