use clusterforge_common::Result;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// One generated file, fully rendered in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifact {
    pub file_name: String,
    pub contents: String,
}

impl RenderedArtifact {
    pub fn new(file_name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            contents: contents.into(),
        }
    }
}

/// Writes a set of artifacts into one directory.
///
/// Every file is staged next to its destination first; destinations are only
/// replaced once all of them were staged, so a failed run leaves the
/// previous generation in place.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write_all(&self, artifacts: &[RenderedArtifact]) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.dir)?;

        let mut staged = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            let file = self.stage(artifact)?;
            staged.push((file, self.dir.join(&artifact.file_name)));
        }

        let mut written = Vec::with_capacity(staged.len());
        for (file, target) in staged {
            file.persist(&target).map_err(std::io::Error::from)?;
            tracing::debug!("Wrote {}", target.display());
            written.push(target);
        }

        Ok(written)
    }

    fn stage(&self, artifact: &RenderedArtifact) -> Result<NamedTempFile> {
        let mut file = NamedTempFile::new_in(&self.dir)?;
        file.write_all(artifact.contents.as_bytes())?;
        file.as_file().sync_all()?;

        // temp files are created 0600
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.as_file()
                .set_permissions(fs::Permissions::from_mode(0o644))?;
        }

        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_all_replaces_previous_contents() {
        let temp_dir = tempdir().unwrap();
        let writer = ArtifactWriter::new(temp_dir.path().join("out"));

        writer
            .write_all(&[RenderedArtifact::new("haproxy.cfg", "old\n")])
            .unwrap();
        let written = writer
            .write_all(&[
                RenderedArtifact::new("haproxy.cfg", "new\n"),
                RenderedArtifact::new("prometheus.yml", "global: {}\n"),
            ])
            .unwrap();

        assert_eq!(written.len(), 2);
        assert_eq!(fs::read_to_string(&written[0]).unwrap(), "new\n");
        assert_eq!(fs::read_to_string(&written[1]).unwrap(), "global: {}\n");

        // no staging leftovers
        assert_eq!(fs::read_dir(writer.dir()).unwrap().count(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_written_files_are_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempdir().unwrap();
        let writer = ArtifactWriter::new(temp_dir.path());

        let written = writer
            .write_all(&[RenderedArtifact::new("broker.env", "")])
            .unwrap();

        let mode = fs::metadata(&written[0]).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}
