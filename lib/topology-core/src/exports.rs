//! Published outputs

use crate::resolve::OutputSource;
use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use topology_api::OutputRef;

/// Values the topology publishes for separately provisioned compute
#[derive(Clone, Debug, PartialEq)]
pub struct Exports {
    pub aws_vpc_id: OutputRef,
    pub aws_subnet_ids: Vec<OutputRef>,
    pub gcp_vpc_id: OutputRef,
    pub gcp_subnet_ids: Vec<OutputRef>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedExports {
    pub aws_vpc_id: String,
    pub aws_subnet_ids: Vec<String>,
    pub gcp_vpc_id: String,
    pub gcp_subnet_ids: Vec<String>,
}

impl Exports {
    /// Read every exported value, failing if any upstream is missing
    pub fn resolve<S: OutputSource + ?Sized>(&self, source: &S) -> Result<ResolvedExports> {
        let read = |output: &OutputRef| -> Result<String> {
            source
                .output(&output.resource, &output.attribute)
                .map(str::to_string)
                .ok_or_else(|| CoreError::UnresolvedOutput(output.to_string()))
        };

        Ok(ResolvedExports {
            aws_vpc_id: read(&self.aws_vpc_id)?,
            aws_subnet_ids: self.aws_subnet_ids.iter().map(read).collect::<Result<_>>()?,
            gcp_vpc_id: read(&self.gcp_vpc_id)?,
            gcp_subnet_ids: self.gcp_subnet_ids.iter().map(read).collect::<Result<_>>()?,
        })
    }
}
