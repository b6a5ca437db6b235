use crate::Input;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Takes over the VPC's default route table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DefaultRouteTable {
    /// Route table created implicitly with the VPC
    pub default_route_table_id: Input,

    pub routes: Vec<Route>,

    /// VPN gateways allowed to propagate BGP-learned routes into the table
    #[serde(default)]
    pub propagating_vgws: Vec<Input>,

    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Static route entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Destination block
    pub cidr_block: String,

    /// Internet gateway or VPN gateway to send the traffic to
    pub gateway_id: Input,
}

impl DefaultRouteTable {
    pub fn inputs(&self) -> Vec<&Input> {
        let mut inputs = vec![&self.default_route_table_id];
        inputs.extend(self.routes.iter().map(|r| &r.gateway_id));
        inputs.extend(self.propagating_vgws.iter());
        inputs
    }

    pub fn inputs_mut(&mut self) -> Vec<&mut Input> {
        let mut inputs = vec![&mut self.default_route_table_id];
        inputs.extend(self.routes.iter_mut().map(|r| &mut r.gateway_id));
        inputs.extend(self.propagating_vgws.iter_mut());
        inputs
    }
}
