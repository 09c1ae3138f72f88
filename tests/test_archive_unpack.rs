// Archive unpacker tests: flat zip/tgz extraction, generic-output renaming,
// and the fixed two-level nested scenario.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::Result;
use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

use blobharvest::{archive_stem, unpack_tree, ArchiveFormat, HarvestError};

fn write_zip(path: &Path, entries: &[(&str, &[u8])]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = zip::ZipWriter::new(file);
    for (name, data) in entries {
        let opts = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        writer.start_file(*name, opts)?;
        writer.write_all(data)?;
    }
    writer.finish()?;
    Ok(())
}

fn write_tgz(path: &Path, entries: &[(&str, &[u8])]) -> Result<()> {
    let file = File::create(path)?;
    let enc = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(enc);
    for (name, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, *name, *data)?;
    }
    builder.into_inner()?.finish()?;
    Ok(())
}

#[test]
fn format_detection_and_stem() {
    assert_eq!(ArchiveFormat::from_path(Path::new("a/b.zip")), Some(ArchiveFormat::Zip));
    assert_eq!(ArchiveFormat::from_path(Path::new("b.tgz")), Some(ArchiveFormat::TarGz));
    assert_eq!(ArchiveFormat::from_path(Path::new("b.tar.gz")), Some(ArchiveFormat::TarGz));
    assert_eq!(ArchiveFormat::from_path(Path::new("b.parquet")), None);

    assert_eq!(archive_stem(Path::new("x/batch-1.zip")), "batch-1");
    assert_eq!(archive_stem(Path::new("inner.tgz")), "inner");
    assert_eq!(archive_stem(Path::new("data.tar.gz")), "data");
}

#[test]
fn flat_zip_renames_train_and_test() -> Result<()> {
    let tmp = TempDir::new()?;
    let zip_path = tmp.path().join("batch.zip");
    write_zip(
        &zip_path,
        &[
            ("train.csv", b"a,b\n1,2\n"),
            ("test.csv", b"a,b\n3,4\n"),
            ("readme.txt", b"notes"),
        ],
    )?;

    let dest = tmp.path().join("batch");
    let outcome = unpack_tree(&zip_path, &dest)?;

    assert_eq!(outcome.nested.len(), 0);
    assert_eq!(outcome.renamed.len(), 2);
    assert!(dest.join("batch_train.csv").is_file());
    assert!(dest.join("batch_test.csv").is_file());
    assert!(!dest.join("train.csv").exists());
    assert!(!dest.join("test.csv").exists());
    // Non-generic names are left alone.
    assert!(dest.join("readme.txt").is_file());
    Ok(())
}

#[test]
fn flat_tgz_extracts_and_renames() -> Result<()> {
    let tmp = TempDir::new()?;
    let tgz_path = tmp.path().join("export.tgz");
    write_tgz(&tgz_path, &[("train.csv", b"x\n1\n")])?;

    let dest = tmp.path().join("export");
    unpack_tree(&tgz_path, &dest)?;

    assert!(dest.join("export_train.csv").is_file());
    assert!(!dest.join("train.csv").exists());
    Ok(())
}

#[test]
fn nested_archive_is_unpacked_renamed_and_consumed() -> Result<()> {
    let tmp = TempDir::new()?;

    // inner.tgz carrying the generic outputs
    let inner = tmp.path().join("inner.tgz");
    write_tgz(&inner, &[("train.csv", b"c\n5\n"), ("test.csv", b"c\n6\n")])?;
    let inner_bytes = std::fs::read(&inner)?;

    // A.zip carrying inner.tgz
    let top = tmp.path().join("A.zip");
    write_zip(&top, &[("inner.tgz", &inner_bytes)])?;

    let dest = tmp.path().join("A");
    let outcome = unpack_tree(&top, &dest)?;

    // Renamed with the *top-level* archive's stem, inside the nested stem dir.
    assert!(dest.join("inner").join("A_train.csv").is_file());
    assert!(dest.join("inner").join("A_test.csv").is_file());
    assert!(!dest.join("inner").join("train.csv").exists());

    // The extracted copy of the nested container is consumed.
    assert!(!dest.join("inner.tgz").exists());
    assert_eq!(outcome.nested.len(), 1);
    Ok(())
}

#[test]
fn corrupt_archive_is_isolated_to_unpack_failed() -> Result<()> {
    let tmp = TempDir::new()?;
    let bogus = tmp.path().join("broken.zip");
    std::fs::write(&bogus, b"this is not a zip file")?;

    let err = unpack_tree(&bogus, &tmp.path().join("broken")).unwrap_err();
    assert!(matches!(err, HarvestError::UnpackFailed { .. }));
    assert!(!err.is_fatal());
    Ok(())
}
