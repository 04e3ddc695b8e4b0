//! Archive adapters: reading ZIP/pak and 7z sources, writing the output pak

use crate::aux_files::normalize_path;
use crate::error::{Error, Result};
use crate::staging::StagedFile;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Archive formats mods may be packed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// `.zip` and `.pak` (a pak is a ZIP container)
    Zip,
    /// `.7z`
    SevenZip,
}

impl ArchiveKind {
    /// Detect the format from a file name's extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "zip" | "pak" => Some(ArchiveKind::Zip),
            "7z" => Some(ArchiveKind::SevenZip),
            _ => None,
        }
    }
}

/// Whether a member path names an archive (nested archives are not
/// collected as ordinary files)
pub fn is_archive_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".zip") || lower.ends_with(".pak") || lower.ends_with(".7z")
}

/// One member read out of an archive
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Member path, forward-slash normalized
    pub path: String,
    pub is_dir: bool,
    /// Member contents (empty for directories)
    pub data: Vec<u8>,
}

fn zip_error(path: &Path, source: zip::result::ZipError) -> Error {
    Error::Zip {
        path: path.to_path_buf(),
        source,
    }
}

fn open_file(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Read every member of an archive on disk
pub fn read_archive<P: AsRef<Path>>(path: P) -> Result<Vec<ArchiveEntry>> {
    let path = path.as_ref();
    match ArchiveKind::from_path(path) {
        Some(ArchiveKind::Zip) => read_zip(BufReader::new(open_file(path)?), path),
        Some(ArchiveKind::SevenZip) => read_7z(path),
        None => Err(Error::UnsupportedArchive(path.to_path_buf())),
    }
}

/// Read every member of a ZIP held in memory (e.g. a pak nested in a mod)
pub fn read_zip_bytes(bytes: &[u8], label: &Path) -> Result<Vec<ArchiveEntry>> {
    read_zip(Cursor::new(bytes), label)
}

fn read_zip<R: Read + Seek>(reader: R, label: &Path) -> Result<Vec<ArchiveEntry>> {
    let mut archive = ZipArchive::new(reader).map_err(|e| zip_error(label, e))?;
    let mut entries = Vec::with_capacity(archive.len());

    for i in 0..archive.len() {
        let mut member = archive.by_index(i).map_err(|e| zip_error(label, e))?;
        let is_dir = member.is_dir();
        let path = normalize_path(member.name());

        let mut data = Vec::new();
        if !is_dir {
            member.read_to_end(&mut data)?;
        }

        entries.push(ArchiveEntry { path, is_dir, data });
    }

    Ok(entries)
}

fn read_7z(path: &Path) -> Result<Vec<ArchiveEntry>> {
    let seven_zip_error = |e: sevenz_rust::Error| Error::SevenZip {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let mut reader = sevenz_rust::SevenZReader::open(path, sevenz_rust::Password::empty())
        .map_err(seven_zip_error)?;

    let mut entries = Vec::new();
    reader
        .for_each_entries(|entry, member| {
            let is_dir = entry.is_directory();
            let mut data = Vec::new();
            if !is_dir {
                member.read_to_end(&mut data)?;
            }
            entries.push(ArchiveEntry {
                path: normalize_path(entry.name()),
                is_dir,
                data,
            });
            Ok(true)
        })
        .map_err(seven_zip_error)?;

    Ok(entries)
}

/// Read a single member from the base archive
///
/// Only the requested member is decompressed, so large base paks are cheap
/// to open. Member names are compared after slash normalization.
pub fn read_base_member<P: AsRef<Path>>(archive_path: P, member: &str) -> Result<Vec<u8>> {
    let archive_path = archive_path.as_ref();
    if !archive_path.is_file() {
        return Err(Error::BaseArchiveMissing(archive_path.to_path_buf()));
    }

    let file = open_file(archive_path)?;
    let mut archive = ZipArchive::new(BufReader::new(file)).map_err(|e| zip_error(archive_path, e))?;

    let wanted = normalize_path(member);
    let name = archive
        .file_names()
        .find(|name| normalize_path(name) == wanted)
        .map(str::to_string)
        .ok_or_else(|| Error::BaseParamMissing {
            archive: archive_path.to_path_buf(),
            member: wanted.clone(),
        })?;

    let mut entry = archive
        .by_name(&name)
        .map_err(|e| zip_error(archive_path, e))?;
    let mut data = Vec::new();
    entry.read_to_end(&mut data)?;
    debug!(member = name.as_str(), bytes = data.len(), "read base member");

    Ok(data)
}

/// Result of writing the output archive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembleReport {
    pub output: PathBuf,
    /// Members written, the parameter file included
    pub files_written: usize,
    /// Uncompressed bytes written
    pub bytes_written: u64,
}

/// Write the merged parameter file and every resolved auxiliary file into
/// one deflate-compressed ZIP at `output`
///
/// Any existing archive at `output` is removed first. The new archive is
/// built in a temporary file next to `output` and renamed into place only
/// once it is complete, so a failure never leaves a partial archive behind.
pub fn assemble<P: AsRef<Path>>(
    output: P,
    param_path: &str,
    param_bytes: &[u8],
    files: &BTreeMap<String, StagedFile>,
) -> Result<AssembleReport> {
    let output = output.as_ref();
    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    if output.exists() {
        info!(path = %output.display(), "removing previous output archive");
        fs::remove_file(output)?;
    }

    let tmp = tempfile::Builder::new()
        .prefix(".pv-merge-")
        .suffix(".part")
        .tempfile_in(&dir)?;

    let param_path = normalize_path(param_path);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(tmp.as_file());
    let mut report = AssembleReport {
        output: output.to_path_buf(),
        files_written: 0,
        bytes_written: 0,
    };

    writer
        .start_file(param_path.as_str(), options)
        .map_err(|e| zip_error(output, e))?;
    writer.write_all(param_bytes)?;
    report.files_written += 1;
    report.bytes_written += param_bytes.len() as u64;
    debug!(member = param_path.as_str(), "added parameter file");

    for (dest, staged) in files {
        let dest = normalize_path(dest);
        if dest == param_path {
            warn!(member = dest.as_str(), "skipping file that would replace the merged parameter file");
            continue;
        }

        writer
            .start_file(dest.as_str(), options)
            .map_err(|e| zip_error(output, e))?;
        let mut source = open_file(&staged.path)?;
        let copied = io::copy(&mut source, &mut writer)?;
        report.files_written += 1;
        report.bytes_written += copied;
        debug!(member = dest.as_str(), bytes = copied, "added file");
    }

    writer.finish().map_err(|e| zip_error(output, e))?;
    tmp.persist(output).map_err(|e| Error::Io(e.error))?;

    info!(
        path = %output.display(),
        files = report.files_written,
        "output archive written"
    );
    Ok(report)
}
