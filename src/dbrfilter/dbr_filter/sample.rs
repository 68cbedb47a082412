use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::fastx_utils::input_files;

static LIBRARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(Library\d{1,3}[AB]?)").unwrap());

/// Alignment files with this in their name hold reads that matched no
/// sample and are never filtered.
pub const UNMATCHED_MARKER: &str = "unmatched";

/// Reason an alignment file is left out of filtering.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Skip {
    #[error("unmatched reads")]
    Unmatched,
    #[error("no sample id in file name")]
    NoSampleId,
    #[error("no library id in file name")]
    NoLibraryId,
    #[error("no tag map for {0}")]
    NoTagMap(String),
    #[error("no barcode file for {0}")]
    NoBarcodes(String),
    #[error("output {output} already written from {first}")]
    DuplicateSample { output: String, first: String },
}

/// Everything needed to filter one sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleFiles {
    alignment: PathBuf,
    sample: String,
    library: String,
    tag_map: PathBuf,
    barcodes: Option<PathBuf>,
}

impl SampleFiles {
    pub fn new(
        alignment: PathBuf,
        sample: String,
        library: String,
        tag_map: PathBuf,
        barcodes: Option<PathBuf>,
    ) -> Self {
        SampleFiles {
            alignment,
            sample,
            library,
            tag_map,
            barcodes,
        }
    }

    pub fn alignment(&self) -> &Path {
        &self.alignment
    }

    pub fn sample(&self) -> &str {
        &self.sample
    }

    pub fn library(&self) -> &str {
        &self.library
    }

    pub fn tag_map(&self) -> &Path {
        &self.tag_map
    }

    pub fn barcodes(&self) -> Option<&Path> {
        self.barcodes.as_deref()
    }

    /// Name of the filtered output file for this sample.
    pub fn output_name(&self) -> String {
        format!("DBR_filtered_sequences_{}_{}.fastq", self.library, self.sample)
    }
}

/// Matches alignment files to sample ids, libraries, and the per-library
/// auxiliary files, all by file name.
#[derive(Debug, Clone)]
pub struct SampleResolver {
    sample_re: Regex,
    tag_maps: PathBuf,
    barcodes: Option<PathBuf>,
}

impl SampleResolver {
    /// # Arguments
    ///
    /// * `sample_re` finds the sample id as its first capture group
    ///
    /// * `tag_maps` is a single tag map used for every sample, or a
    /// directory of per-library tag maps
    ///
    /// * `barcodes` is an optional single barcode file or directory of
    /// per-library barcode files that every sample must have
    pub fn new(sample_re: Regex, tag_maps: PathBuf, barcodes: Option<PathBuf>) -> Self {
        SampleResolver {
            sample_re,
            tag_maps,
            barcodes,
        }
    }

    pub fn sample_id(&self, name: &str) -> Option<String> {
        self.sample_re
            .captures(name)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    pub fn library_id(name: &str) -> Option<String> {
        LIBRARY_RE.find(name).map(|m| m.as_str().to_string())
    }

    /// A file for `library`: `path` itself when it is a file, or the
    /// first entry of the directory `path`, by name, that mentions
    /// `library` as a whole id. `Library1` does not match
    /// `Library12_dbr.json` or `Library1A_dbr.json`.
    pub fn library_file(library: &str, path: &Path) -> Option<PathBuf> {
        if path.is_file() {
            return Some(path.to_path_buf());
        }

        if !path.is_dir() {
            return None;
        }

        let library_re =
            Regex::new(&format!(r"{}(?:[^0-9AB]|$)", regex::escape(library))).ok()?;
        input_files(path).ok()?.into_iter().find(|f| {
            f.file_name()
                .is_some_and(|n| library_re.is_match(&n.to_string_lossy()))
        })
    }

    pub fn resolve(&self, alignment: &Path) -> Result<SampleFiles, Skip> {
        let name = alignment
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if name.contains(UNMATCHED_MARKER) {
            return Err(Skip::Unmatched);
        }

        let sample = self.sample_id(&name).ok_or(Skip::NoSampleId)?;
        let library = Self::library_id(&name).ok_or(Skip::NoLibraryId)?;

        let tag_map = Self::library_file(&library, &self.tag_maps)
            .ok_or_else(|| Skip::NoTagMap(library.clone()))?;

        let barcodes = match &self.barcodes {
            Some(dir) => Some(
                Self::library_file(&library, dir)
                    .ok_or_else(|| Skip::NoBarcodes(library.clone()))?,
            ),
            None => None,
        };

        Ok(SampleFiles::new(
            alignment.to_path_buf(),
            sample,
            library,
            tag_map,
            barcodes,
        ))
    }
}

/// True for an existing, readable regular file.
pub fn readable_file(path: &Path) -> bool {
    fs::File::open(path).is_ok() && path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("dicts")).unwrap();
        fs::write(dir.path().join("dicts/Library12_dbr.json"), b"{}").unwrap();
        fs::write(dir.path().join("dicts/Library3_dbr.json"), b"{}").unwrap();
        fs::create_dir(dir.path().join("barcodes")).unwrap();
        fs::write(dir.path().join("barcodes/Library12_barcodes.txt"), b"").unwrap();
        dir
    }

    fn resolver(dir: &Path, barcodes: bool) -> SampleResolver {
        SampleResolver::new(
            Regex::new(r".*_(\d{1,3}T?)\.sam").unwrap(),
            dir.join("dicts"),
            if barcodes {
                Some(dir.join("barcodes"))
            } else {
                None
            },
        )
    }

    #[test]
    fn ids() {
        assert_eq!(
            SampleResolver::library_id("aln_Library12B_017.sam"),
            Some("Library12B".to_string())
        );
        assert_eq!(SampleResolver::library_id("aln_L12_017.sam"), None);

        let dir = setup();
        let r = resolver(dir.path(), false);
        assert_eq!(r.sample_id("aln_Library12_017T.sam"), Some("017T".to_string()));
        assert_eq!(r.sample_id("aln_Library12.sam"), None);
    }

    #[test]
    fn resolve_sample() {
        let dir = setup();
        let r = resolver(dir.path(), true);

        let files = r.resolve(Path::new("/aln/Library12_017.sam")).unwrap();
        assert_eq!(files.sample(), "017");
        assert_eq!(files.library(), "Library12");
        assert_eq!(files.tag_map(), dir.path().join("dicts/Library12_dbr.json"));
        assert_eq!(
            files.barcodes(),
            Some(dir.path().join("barcodes/Library12_barcodes.txt").as_path())
        );
        assert_eq!(
            files.output_name(),
            "DBR_filtered_sequences_Library12_017.fastq"
        );
    }

    #[test]
    fn skips() {
        let dir = setup();
        let r = resolver(dir.path(), true);

        assert_eq!(
            r.resolve(Path::new("Library12_unmatched_1.sam")),
            Err(Skip::Unmatched)
        );
        assert_eq!(r.resolve(Path::new("Library12.sam")), Err(Skip::NoSampleId));
        assert_eq!(r.resolve(Path::new("Lib12_017.sam")), Err(Skip::NoLibraryId));
        assert_eq!(
            r.resolve(Path::new("Library7_017.sam")),
            Err(Skip::NoTagMap("Library7".to_string()))
        );
        assert_eq!(
            r.resolve(Path::new("Library3_017.sam")),
            Err(Skip::NoBarcodes("Library3".to_string()))
        );
        assert!(resolver(dir.path(), false)
            .resolve(Path::new("Library3_017.sam"))
            .is_ok());
    }

    #[test]
    fn library_id_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let dicts = dir.path().join("dicts");
        fs::create_dir(&dicts).unwrap();
        for name in ["Library12_dbr.json", "Library1A_dbr.json", "Library1_dbr.json"] {
            fs::write(dicts.join(name), b"{}").unwrap();
        }

        let r = SampleResolver::new(Regex::new(r"_(\d+)\.sam").unwrap(), dicts.clone(), None);
        let files = r.resolve(Path::new("Library1_017.sam")).unwrap();
        assert_eq!(files.library(), "Library1");
        assert_eq!(files.tag_map(), dicts.join("Library1_dbr.json"));

        let files = r.resolve(Path::new("Library1A_017.sam")).unwrap();
        assert_eq!(files.tag_map(), dicts.join("Library1A_dbr.json"));

        assert_eq!(
            SampleResolver::library_file("Library12", &dicts),
            Some(dicts.join("Library12_dbr.json"))
        );
        assert_eq!(SampleResolver::library_file("Library2", &dicts), None);
    }

    #[test]
    fn single_tag_map_file() {
        let dir = setup();
        let single = dir.path().join("dicts/Library3_dbr.json");
        let r = SampleResolver::new(Regex::new(r"_(\d+)\.sam").unwrap(), single.clone(), None);
        let files = r.resolve(Path::new("Library12_017.sam")).unwrap();
        assert_eq!(files.tag_map(), single.as_path());
    }
}
