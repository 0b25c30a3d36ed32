use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::RngCore;
use std::fmt;

/// Random bytes behind each generated password
pub const SECRET_BYTES: usize = 16;

/// Passwords generated fresh on every run and embedded in the artifacts.
///
/// Nothing persists them separately, so each run invalidates the credentials
/// handed out by the previous one.
#[derive(Clone, PartialEq, Eq)]
pub struct GeneratedSecrets {
    /// Admin password of the metrics dashboard store (Grafana)
    pub monitoring_password: String,

    /// Default password of the broker dashboard on every node
    pub dashboard_password: String,
}

impl GeneratedSecrets {
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng())
    }

    pub fn generate_with<R: RngCore>(rng: &mut R) -> Self {
        Self {
            monitoring_password: token(rng),
            dashboard_password: token(rng),
        }
    }
}

impl fmt::Debug for GeneratedSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedSecrets")
            .field("monitoring_password", &"<redacted>")
            .field("dashboard_password", &"<redacted>")
            .finish()
    }
}

fn token<R: RngCore>(rng: &mut R) -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rng.fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}
