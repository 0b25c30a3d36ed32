use std::collections::BTreeMap;
use std::fmt;

/// Broker settings forwarded from the generator's own environment (`KEY=VALUE` lines)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentFile {
    entries: BTreeMap<String, String>,
}

impl EnvironmentFile {
    /// Keep only the variables whose name starts with `prefix`
    pub fn extract<I>(vars: I, prefix: &str) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut entries = BTreeMap::new();

        for (key, value) in vars {
            if !key.starts_with(prefix) {
                continue;
            }
            if value.contains('\n') || value.contains('\r') {
                tracing::warn!("Skipping {}: multi-line values cannot be carried in an env file", key);
                continue;
            }
            entries.insert(key, value);
        }

        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for EnvironmentFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.entries {
            writeln!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}
