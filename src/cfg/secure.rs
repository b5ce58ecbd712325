// src/cfg/secure.rs

use secure_string::SecureString;
use serde::{Deserialize, Deserializer};

/// Deserializes an optional secret from YAML. A blank string counts as unset,
/// so an empty `api-key:` entry does not mask the environment variable.
pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<SecureString>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt
        .filter(|s| !s.trim().is_empty())
        .map(SecureString::from))
}
