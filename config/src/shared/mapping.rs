use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// One declarative step of the image mapping applied to every changed row.
///
/// Rules run in order, each one seeing the output of the previous one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "rule")]
pub enum MappingRuleConfig {
    /// Moves an attribute to a new name.
    Rename { from: String, to: String },
    /// Duplicates an attribute under a new name.
    Copy { from: String, to: String },
    /// Drops an attribute.
    Remove { attribute: String },
    /// Writes a string attribute built from a template.
    ///
    /// `{name}` placeholders are replaced with the string or number payload of attribute `name`;
    /// `{{` and `}}` produce literal braces.
    Format { to: String, template: String },
}

impl MappingRuleConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let has_empty_name = match self {
            MappingRuleConfig::Rename { from, to } | MappingRuleConfig::Copy { from, to } => {
                from.is_empty() || to.is_empty()
            }
            MappingRuleConfig::Remove { attribute } => attribute.is_empty(),
            MappingRuleConfig::Format { to, .. } => to.is_empty(),
        };

        if has_empty_name {
            return Err(ValidationError::invalid(
                "mapping",
                "attribute names cannot be empty",
            ));
        }

        Ok(())
    }
}
