use clusterforge_common::{ClusterForgeError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub const CA_KEY_FILE: &str = "ca.key";
pub const CA_CERT_FILE: &str = "ca.pem";
pub const NODE_KEY_FILE: &str = "node.key";
pub const NODE_CERT_FILE: &str = "node.pem";

const NODE_CSR_FILE: &str = "node.csr";
const NODE_EXT_FILE: &str = "node.ext";
const ROOT_SUBJECT: &str = "/CN=clusterforge-root-ca";

/// Root authority and node key pairs, persisted under one directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateBundle {
    pub root_ca_key: PathBuf,
    pub root_ca_cert: PathBuf,
    pub node_key: PathBuf,
    pub node_cert: PathBuf,
}

impl CertificateBundle {
    /// Expected bundle layout under `dir`
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            root_ca_key: dir.join(CA_KEY_FILE),
            root_ca_cert: dir.join(CA_CERT_FILE),
            node_key: dir.join(NODE_KEY_FILE),
            node_cert: dir.join(NODE_CERT_FILE),
        }
    }

    /// The idempotency key: a bundle exists iff its leaf certificate exists
    pub fn exists(&self) -> bool {
        self.node_cert.is_file()
    }
}

/// Issues a self-signed root plus a leaf certificate signed by it
pub trait CertificateAuthority {
    /// Write every file of `bundle`; the leaf carries `subject_alt_name` as its DNS SAN
    fn issue(&self, bundle: &CertificateBundle, subject_alt_name: &str) -> Result<()>;
}

/// Certificate authority backed by the `openssl` command line tool
#[derive(Debug, Clone)]
pub struct OpensslAuthority {
    program: String,
    key_bits: u32,
    root_days: u32,
    leaf_days: u32,
}

impl OpensslAuthority {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            key_bits: 2048,
            root_days: 3650,
            leaf_days: 825,
        }
    }

    fn run(&self, step: &str, args: &[&str]) -> Result<()> {
        tracing::debug!("Running {} {}", self.program, args.join(" "));

        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| ClusterForgeError::ExternalTool {
                tool: self.program.clone(),
                message: format!("{}: {}", step, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ClusterForgeError::ExternalTool {
                tool: self.program.clone(),
                message: format!("{} exited with {}: {}", step, output.status, stderr.trim()),
            });
        }

        Ok(())
    }
}

impl CertificateAuthority for OpensslAuthority {
    fn issue(&self, bundle: &CertificateBundle, subject_alt_name: &str) -> Result<()> {
        let dir = bundle
            .node_cert
            .parent()
            .ok_or_else(|| ClusterForgeError::configuration("certificate path has no parent"))?;
        let csr = dir.join(NODE_CSR_FILE);
        let ext = dir.join(NODE_EXT_FILE);
        let staged_cert = bundle.node_cert.with_extension("pem.tmp");
        // written by -CAcreateserial next to the root certificate
        let serial = bundle.root_ca_cert.with_extension("srl");

        let bits = self.key_bits.to_string();
        let root_days = self.root_days.to_string();
        let leaf_days = self.leaf_days.to_string();
        let leaf_subject = format!("/CN={}", subject_alt_name);

        let ca_key = path_arg(&bundle.root_ca_key)?;
        let ca_cert = path_arg(&bundle.root_ca_cert)?;
        let node_key = path_arg(&bundle.node_key)?;
        let csr_arg = path_arg(&csr)?;
        let ext_arg = path_arg(&ext)?;
        let staged_arg = path_arg(&staged_cert)?;

        self.run("root key", &["genrsa", "-out", ca_key, &bits])?;
        self.run(
            "root certificate",
            &[
                "req", "-x509", "-new", "-nodes", "-key", ca_key, "-sha256", "-days", &root_days,
                "-subj", ROOT_SUBJECT, "-out", ca_cert,
            ],
        )?;
        self.run("node key", &["genrsa", "-out", node_key, &bits])?;
        self.run(
            "node signing request",
            &["req", "-new", "-key", node_key, "-subj", &leaf_subject, "-out", csr_arg],
        )?;

        fs::write(&ext, format!("subjectAltName = DNS:{}\n", subject_alt_name))?;

        self.run(
            "node certificate",
            &[
                "x509", "-req", "-in", csr_arg, "-CA", ca_cert, "-CAkey", ca_key,
                "-CAcreateserial", "-out", staged_arg, "-days", &leaf_days, "-sha256",
                "-extfile", ext_arg,
            ],
        )?;

        // the leaf appears last so a failed run never looks complete
        fs::rename(&staged_cert, &bundle.node_cert)?;

        for scratch in [&csr, &ext, &serial] {
            if let Err(e) = fs::remove_file(scratch) {
                tracing::warn!("Failed to remove {}: {}", scratch.display(), e);
            }
        }

        Ok(())
    }
}

fn path_arg(path: &Path) -> Result<&str> {
    path.to_str().ok_or_else(|| {
        ClusterForgeError::configuration(format!("non UTF-8 path: {}", path.display()))
    })
}

/// Return the bundle under `dir`, asking `authority` to create it only when
/// the leaf certificate is absent. An existing bundle is never touched.
pub fn ensure_certificate<P: AsRef<Path>>(
    dir: P,
    subject_alt_name: &str,
    authority: &dyn CertificateAuthority,
) -> Result<CertificateBundle> {
    let dir = dir.as_ref();
    let bundle = CertificateBundle::in_dir(dir);

    if bundle.exists() {
        tracing::info!("Reusing certificate bundle in {}", dir.display());
        return Ok(bundle);
    }

    tracing::info!("Creating certificate bundle in {}", dir.display());
    fs::create_dir_all(dir)?;
    authority.issue(&bundle, subject_alt_name)?;

    if !bundle.exists() {
        return Err(ClusterForgeError::ExternalTool {
            tool: "certificate authority".to_string(),
            message: format!("no leaf certificate at {}", bundle.node_cert.display()),
        });
    }

    Ok(bundle)
}
