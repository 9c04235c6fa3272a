//! Payload unpacking into a staging directory.
//!
//! After unpacking, install-mapping sources are resolved relative to the
//! staging root. A bare binary is staged under its URL file name.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use flate2::read::GzDecoder;

use crate::formula::ArtifactFormat;

/// Unpack `artifact` into `staging` according to `format`.
///
/// # Errors
///
/// Returns an I/O error if the artifact cannot be read or is not a valid
/// archive of the declared format.
pub fn unpack(
    artifact: &Path,
    file_name: &str,
    format: ArtifactFormat,
    staging: &Path,
) -> std::io::Result<()> {
    std::fs::create_dir_all(staging)?;
    match format {
        ArtifactFormat::Binary => {
            std::fs::copy(artifact, staging.join(file_name))?;
        }
        ArtifactFormat::TarGz => {
            let file = File::open(artifact)?;
            let mut archive = tar::Archive::new(GzDecoder::new(BufReader::new(file)));
            archive.set_preserve_permissions(true);
            archive.unpack(staging)?;
        }
        ArtifactFormat::Zip => {
            let file = File::open(artifact)?;
            let mut archive = zip::ZipArchive::new(BufReader::new(file))?;
            archive.extract(staging)?;
        }
    }
    tracing::debug!(artifact = %artifact.display(), ?format, "unpacked payload");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_tar_gz(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn binary_is_staged_under_its_file_name() {
        let dir = TempDir::new().unwrap();
        let artifact = dir.path().join("abc--condash-macos-aarch64");
        std::fs::write(&artifact, b"binary").unwrap();
        let staging = dir.path().join("stage");

        unpack(&artifact, "condash-macos-aarch64", ArtifactFormat::Binary, &staging).unwrap();
        assert_eq!(
            std::fs::read(staging.join("condash-macos-aarch64")).unwrap(),
            b"binary"
        );
    }

    #[test]
    fn tar_gz_members_are_unpacked() {
        let dir = TempDir::new().unwrap();
        let artifact = dir.path().join("condash.tar.gz");
        write_tar_gz(
            &artifact,
            &[
                ("condash/bin/condash", &b"exe"[..]),
                ("condash/README", &b"docs"[..]),
            ],
        );
        let staging = dir.path().join("stage");

        unpack(&artifact, "condash.tar.gz", ArtifactFormat::TarGz, &staging).unwrap();
        assert_eq!(std::fs::read(staging.join("condash/bin/condash")).unwrap(), b"exe");
        assert_eq!(std::fs::read(staging.join("condash/README")).unwrap(), b"docs");
    }

    #[test]
    fn zip_members_are_unpacked() {
        let dir = TempDir::new().unwrap();
        let artifact = dir.path().join("condash.zip");
        {
            let mut zip = zip::ZipWriter::new(File::create(&artifact).unwrap());
            zip.start_file("condash", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"exe").unwrap();
            zip.finish().unwrap();
        }
        let staging = dir.path().join("stage");

        unpack(&artifact, "condash.zip", ArtifactFormat::Zip, &staging).unwrap();
        assert_eq!(std::fs::read(staging.join("condash")).unwrap(), b"exe");
    }

    #[test]
    fn garbage_archive_is_an_error() {
        let dir = TempDir::new().unwrap();
        let artifact = dir.path().join("broken.tar.gz");
        std::fs::write(&artifact, b"not gzip at all").unwrap();
        let staging = dir.path().join("stage");
        assert!(unpack(&artifact, "broken.tar.gz", ArtifactFormat::TarGz, &staging).is_err());
    }
}
