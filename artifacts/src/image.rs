use crate::certs::{CA_CERT_FILE, CA_KEY_FILE, NODE_CERT_FILE, NODE_KEY_FILE};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Used whenever the host OS cannot be mapped to an image
pub const DEFAULT_BASE_IMAGE: &str = "ubuntu:22.04";

/// Install location of the broker release inside the image
pub const BROKER_HOME: &str = "/opt/broker";

/// Certificate bundle location inside the image
pub const CERTS_HOME: &str = "/opt/broker/etc/certs";

/// Paths kept out of every build context
pub const IGNORED_PATHS: &[&str] = &[".git", "target", "**/data", "**/log", "*.log", "*.dump"];

/// Container build recipe (Dockerfile) for the broker image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRecipe {
    pub base_image: String,
    pub release_dir: PathBuf,
    pub cert_dir: PathBuf,
}

impl ContainerRecipe {
    pub fn new(base_image: impl Into<String>, release_dir: &Path, cert_dir: &Path) -> Self {
        Self {
            base_image: base_image.into(),
            release_dir: release_dir.to_path_buf(),
            cert_dir: cert_dir.to_path_buf(),
        }
    }
}

impl fmt::Display for ContainerRecipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FROM {}", self.base_image)?;
        writeln!(f)?;
        writeln!(f, "COPY {} {}", self.release_dir.display(), BROKER_HOME)?;
        // the root key never leaves the host
        write!(f, "COPY")?;
        for file in [CA_CERT_FILE, NODE_CERT_FILE, NODE_KEY_FILE] {
            write!(f, " {}", self.cert_dir.join(file).display())?;
        }
        writeln!(f, " {}/", CERTS_HOME)?;
        writeln!(f)?;
        writeln!(f, "WORKDIR {}", BROKER_HOME)?;
        writeln!(f, "CMD [\"{}/bin/emqx\", \"foreground\"]", BROKER_HOME)
    }
}

/// Build-context ignore list (.dockerignore)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreList(Vec<String>);

impl IgnoreList {
    pub fn entries(&self) -> &[String] {
        &self.0
    }
}

impl Default for IgnoreList {
    fn default() -> Self {
        let mut entries: Vec<String> = IGNORED_PATHS.iter().map(|p| p.to_string()).collect();
        entries.push(format!("**/{}", CA_KEY_FILE));
        Self(entries)
    }
}

impl fmt::Display for IgnoreList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.0 {
            writeln!(f, "{}", entry)?;
        }
        Ok(())
    }
}

/// Pick a base image matching the host OS described by an os-release file.
///
/// Falls back to [`DEFAULT_BASE_IMAGE`] when the file is unreadable or the
/// distribution is unknown.
pub fn detect_base_image(os_release: &Path) -> String {
    let contents = match fs::read_to_string(os_release) {
        Ok(contents) => contents,
        Err(e) => {
            tracing::warn!(
                "Cannot read {} ({}), using base image {}",
                os_release.display(),
                e,
                DEFAULT_BASE_IMAGE
            );
            return DEFAULT_BASE_IMAGE.to_string();
        }
    };

    match parse_os_release(&contents).and_then(|(id, version)| image_for(&id, &version)) {
        Some(image) => {
            tracing::debug!("Detected base image {}", image);
            image
        }
        None => {
            tracing::warn!(
                "No base image mapping for {}, using {}",
                os_release.display(),
                DEFAULT_BASE_IMAGE
            );
            DEFAULT_BASE_IMAGE.to_string()
        }
    }
}

/// Extract `ID` and `VERSION_ID`
fn parse_os_release(contents: &str) -> Option<(String, String)> {
    let mut id = None;
    let mut version = None;

    for line in contents.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim_matches('\'').to_string();
        match key {
            "ID" => id = Some(value),
            "VERSION_ID" => version = Some(value),
            _ => {}
        }
    }

    Some((id?, version?))
}

fn image_for(id: &str, version: &str) -> Option<String> {
    if version.is_empty() {
        return None;
    }
    let major = version.split('.').next()?;

    match id {
        "ubuntu" => Some(format!("ubuntu:{}", version)),
        "debian" => Some(format!("debian:{}-slim", major)),
        "rocky" | "rockylinux" => Some(format!("rockylinux:{}", major)),
        "almalinux" => Some(format!("almalinux:{}", major)),
        "amzn" => Some(format!("amazonlinux:{}", major)),
        _ => None,
    }
}
