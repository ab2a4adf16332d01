//! Resource type identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Service family a QPU resource belongs to.
///
/// The wire form (configuration files, published environment variables)
/// is kebab-case: `direct-access`, `qiskit-runtime-service`,
/// `pasqal-cloud`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceType {
    /// IBM Direct Access API (on-prem, single-tenant).
    DirectAccess,
    /// IBM Qiskit Runtime Service (session-based cloud access).
    QiskitRuntimeService,
    /// Pasqal Cloud (neutral-atom batches).
    PasqalCloud,
}

impl ResourceType {
    /// Wire identifier for this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::DirectAccess => "direct-access",
            ResourceType::QiskitRuntimeService => "qiskit-runtime-service",
            ResourceType::PasqalCloud => "pasqal-cloud",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct-access" => Ok(ResourceType::DirectAccess),
            "qiskit-runtime-service" => Ok(ResourceType::QiskitRuntimeService),
            "pasqal-cloud" => Ok(ResourceType::PasqalCloud),
            other => Err(format!("unknown resource type '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_round_trip() {
        for rtype in [
            ResourceType::DirectAccess,
            ResourceType::QiskitRuntimeService,
            ResourceType::PasqalCloud,
        ] {
            assert_eq!(rtype.as_str().parse::<ResourceType>().unwrap(), rtype);
        }
    }

    #[test]
    fn test_serde_kebab_case() {
        let json = serde_json::to_string(&ResourceType::QiskitRuntimeService).unwrap();
        assert_eq!(json, "\"qiskit-runtime-service\"");

        let parsed: ResourceType = serde_json::from_str("\"direct-access\"").unwrap();
        assert_eq!(parsed, ResourceType::DirectAccess);
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!("braket".parse::<ResourceType>().is_err());
        assert!(serde_json::from_str::<ResourceType>("\"braket\"").is_err());
    }
}
