mod status;
mod types;

pub use status::{
    AcmeIssuerStatus, ConditionStatus, IssuerCondition, IssuerConditionType, IssuerStatus,
};
pub use types::{
    AcmeIssuerConfig, ClusterIssuer, ClusterIssuerSpec, GenericIssuer, Issuer, IssuerSpec,
};
