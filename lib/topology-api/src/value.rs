//! Record inputs: literal values or placeholders for generated attributes

use crate::ResourceKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Transform applied to a generated value once it is known
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Transform {
    /// Append `/<len>` to turn a bare address into a CIDR
    CidrSuffix(u8),
}

impl Transform {
    pub fn apply(&self, value: &str) -> String {
        match self {
            Transform::CidrSuffix(len) => format!("{}/{}", value, len),
        }
    }
}

/// Reference to an attribute of another record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRef {
    /// Record that produces the attribute
    pub resource: ResourceKey,

    /// Attribute name on that record
    pub attribute: String,

    /// Applied to the upstream value when it is resolved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
}

impl OutputRef {
    pub fn new(resource: &ResourceKey, attribute: &str) -> Self {
        Self {
            resource: resource.clone(),
            attribute: attribute.to_string(),
            transform: None,
        }
    }
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource, self.attribute)?;
        if let Some(Transform::CidrSuffix(len)) = self.transform {
            write!(f, " + \"/{}\"", len)?;
        }
        Ok(())
    }
}

/// Value of a record field.
///
/// Generated values are never inspected: an `Output` is carried until the
/// upstream record exists and is then replaced by the upstream value with
/// its transform applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Input {
    Known(String),
    Output(OutputRef),
}

impl Input {
    pub fn known(value: impl Into<String>) -> Self {
        Input::Known(value.into())
    }

    pub fn output(resource: &ResourceKey, attribute: &str) -> Self {
        Input::Output(OutputRef::new(resource, attribute))
    }

    /// Attach a lazy transform to an output placeholder. Known values are
    /// left as they are.
    pub fn map(self, transform: Transform) -> Self {
        match self {
            Input::Output(mut output) => {
                output.transform = Some(transform);
                Input::Output(output)
            }
            known => known,
        }
    }

    pub fn as_known(&self) -> Option<&str> {
        match self {
            Input::Known(value) => Some(value),
            Input::Output(_) => None,
        }
    }

    pub fn output_ref(&self) -> Option<&OutputRef> {
        match self {
            Input::Output(output) => Some(output),
            Input::Known(_) => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Input::Known(_))
    }

    /// Bind the upstream value, applying the pending transform
    pub fn resolve(&mut self, upstream: &str) {
        if let Input::Output(output) = self {
            let value = match output.transform {
                Some(transform) => transform.apply(upstream),
                None => upstream.to_string(),
            };
            *self = Input::Known(value);
        }
    }
}

impl From<&str> for Input {
    fn from(value: &str) -> Self {
        Input::Known(value.to_string())
    }
}

impl From<String> for Input {
    fn from(value: String) -> Self {
        Input::Known(value)
    }
}
