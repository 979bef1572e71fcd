use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The operation a hook observes.
///
/// [`HookMethod::All`] is a wildcard: a hook listing it fires for every
/// operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookMethod {
    All,
    Get,
    List,
    Create,
    Update,
    Delete,
    Patch,
}

impl HookMethod {
    /// Every concrete (non-wildcard) method.
    pub const CONCRETE: [HookMethod; 6] = [
        HookMethod::Get,
        HookMethod::List,
        HookMethod::Create,
        HookMethod::Update,
        HookMethod::Delete,
        HookMethod::Patch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HookMethod::All => "all",
            HookMethod::Get => "get",
            HookMethod::List => "list",
            HookMethod::Create => "create",
            HookMethod::Update => "update",
            HookMethod::Delete => "delete",
            HookMethod::Patch => "patch",
        }
    }

    /// Returns `true` for methods that write to the store.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            HookMethod::Create | HookMethod::Update | HookMethod::Delete | HookMethod::Patch
        )
    }
}

impl fmt::Display for HookMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookMethod {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(HookMethod::All),
            "get" => Ok(HookMethod::Get),
            "list" => Ok(HookMethod::List),
            "create" => Ok(HookMethod::Create),
            "update" => Ok(HookMethod::Update),
            "delete" => Ok(HookMethod::Delete),
            "patch" => Ok(HookMethod::Patch),
            other => Err(TypeError::UnknownHookMethod(other.to_string())),
        }
    }
}
