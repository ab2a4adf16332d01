//! Site configuration and plugin arguments.
//!
//! The resource catalog is a JSON file whose path is the first plugin
//! argument in `plugstack.conf`:
//!
//! ```text
//! required alsvid_spank.so /etc/slurm/qpu_resources.json duplicates=skip
//! ```
//!
//! ```json
//! {
//!   "resources": [
//!     {
//!       "name": "heron1",
//!       "type": "direct-access",
//!       "environment": { "QRMI_IBM_DA_ENDPOINT": "http://da:8080" }
//!     }
//!   ]
//! }
//! ```
//!
//! Remaining plugin arguments are `key=value` policy knobs (§ policies
//! below). Lookup is by resource name; a name missing from the catalog is
//! not an error here — the activation loop logs and skips it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rustc_hash::FxHashMap;
use serde::Deserialize;

use alsvid_qrmi::ResourceType;

use crate::error::{SlurmError, SlurmResult};

/// One catalog entry: a named resource, its service family, and the
/// default environment the site declares for it.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceDefinition {
    /// Resource name as requested via `--qpu`.
    pub name: String,
    /// Service family.
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    /// Default environment variables. Keys carry the `QRMI_` prefix
    /// (e.g. `QRMI_IBM_DA_ENDPOINT`); values are published as
    /// `{name}_{key}` with keep-if-exists semantics.
    #[serde(default)]
    pub environment: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct Catalog {
    resources: Vec<ResourceDefinition>,
}

/// The loaded resource catalog, indexed by name.
#[derive(Debug, Default)]
pub struct QpuConfig {
    by_name: FxHashMap<String, ResourceDefinition>,
}

impl QpuConfig {
    /// Load and index a catalog file.
    ///
    /// A name listed twice keeps its last definition.
    pub fn load(path: &Path) -> SlurmResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SlurmError::Config(format!("cannot read {}: {e}", path.display())))?;
        let catalog: Catalog = serde_json::from_str(&text)
            .map_err(|e| SlurmError::Config(format!("cannot parse {}: {e}", path.display())))?;

        let mut by_name = FxHashMap::default();
        for def in catalog.resources {
            by_name.insert(def.name.clone(), def);
        }
        Ok(Self { by_name })
    }

    /// Look up a resource definition by name.
    pub fn resource(&self, name: &str) -> Option<&ResourceDefinition> {
        self.by_name.get(name)
    }

    /// Number of cataloged resources.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// What to do with a name that appears twice in one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Ignore the second occurrence (the tracker stays duplicate-free).
    #[default]
    Skip,
    /// Acquire every occurrence independently.
    AcquireEach,
    /// Fail activation on the first duplicate.
    Reject,
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skip" => Ok(DuplicatePolicy::Skip),
            "acquire-each" => Ok(DuplicatePolicy::AcquireEach),
            "reject" => Ok(DuplicatePolicy::Reject),
            other => Err(format!("unknown duplicate policy '{other}'")),
        }
    }
}

/// What to do when `--qpu` is supplied empty or whitespace-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyRequestPolicy {
    /// Treat the job as not a QPU job.
    #[default]
    Ignore,
    /// Treat it as a zero-resource request and fail activation.
    Fail,
}

impl FromStr for EmptyRequestPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ignore" => Ok(EmptyRequestPolicy::Ignore),
            "fail" => Ok(EmptyRequestPolicy::Fail),
            other => Err(format!("unknown empty-request policy '{other}'")),
        }
    }
}

/// Site-selectable lifecycle behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct LifecyclePolicies {
    /// Duplicate-name handling within one request.
    pub duplicates: DuplicatePolicy,
    /// Empty/whitespace-only request handling.
    pub empty_request: EmptyRequestPolicy,
}

/// Parsed `plugstack.conf` arguments.
#[derive(Debug, Clone)]
pub struct PluginArgs {
    /// Path to the resource catalog.
    pub config_path: PathBuf,
    /// Policy knobs.
    pub policies: LifecyclePolicies,
}

impl PluginArgs {
    /// Parse the plugin argument list: a catalog path followed by
    /// optional `duplicates=` and `empty-request=` pairs.
    pub fn parse<S: AsRef<str>>(args: &[S]) -> SlurmResult<Self> {
        let mut iter = args.iter();
        let Some(path) = iter.next() else {
            return Err(SlurmError::PluginArg(
                "missing resource catalog path".to_string(),
            ));
        };

        let mut policies = LifecyclePolicies::default();
        for arg in iter {
            let arg = arg.as_ref();
            match arg.split_once('=') {
                Some(("duplicates", value)) => {
                    policies.duplicates = value.parse().map_err(SlurmError::PluginArg)?;
                }
                Some(("empty-request", value)) => {
                    policies.empty_request = value.parse().map_err(SlurmError::PluginArg)?;
                }
                _ => {
                    return Err(SlurmError::PluginArg(format!(
                        "unrecognized argument '{arg}'"
                    )));
                }
            }
        }

        Ok(Self {
            config_path: PathBuf::from(path.as_ref()),
            policies,
        })
    }
}
