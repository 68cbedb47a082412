use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bio::io::fastq;
use flate2::bufread::MultiGzDecoder;
use log::debug;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Opens a text input that may be gzip-compressed. Compression is
/// detected from the leading magic bytes, not the file name. The name
/// `-` reads standard input.
pub fn open_maybe_gzip<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead + Send>> {
    let path = path.as_ref();

    let raw: Box<dyn io::Read + Send> = if path == Path::new("-") {
        Box::new(io::stdin())
    } else {
        Box::new(
            fs::File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )
    };

    let mut reader = BufReader::new(raw);
    let is_gzip = reader.fill_buf()?.starts_with(&GZIP_MAGIC);

    if is_gzip {
        debug!("reading {} as gzip", path.display());
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(reader))))
    } else {
        Ok(Box::new(reader))
    }
}

/// Fastq reader over a possibly-compressed input file.
pub fn fastq_reader<P: AsRef<Path>>(path: P) -> Result<fastq::Reader<Box<dyn BufRead + Send>>> {
    Ok(fastq::Reader::from_bufread(open_maybe_gzip(path)?))
}

/// Lists the regular files in a directory, sorted by name. A path
/// naming a single file yields just that file.
pub fn input_files<P: AsRef<Path>>(path: P) -> Result<Vec<PathBuf>> {
    let path = path.as_ref();

    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(path).with_context(|| format!("listing {}", path.display()))? {
        let entry_path = entry?.path();
        if entry_path.is_file() {
            files.push(entry_path);
        }
    }
    files.sort();
    Ok(files)
}

/// File name with the final extension (and a trailing `.gz`) removed.
pub fn file_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    match name.rfind('.') {
        Some(dot) if dot > 0 => name[..dot].to_string(),
        _ => name.to_string(),
    }
}
