use std::collections::hash_map;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::io::{self, BufRead, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use bio::io::fastq;
use log::info;
use serde::Deserialize;

use crate::error::DbrError;
use crate::read_id::ReadId;

/// Half-open range of bases holding the degenerate base region in a
/// raw read. Offsets follow slice conventions where a negative offset
/// counts back from the end of the read, so that `-9,-2` addresses
/// the same bases in merged reads of any length. Offsets past either
/// end of the read are clamped, which truncates the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagRange {
    start: isize,
    stop: isize,
}

impl TagRange {
    pub fn new(start: isize, stop: isize) -> Self {
        TagRange { start, stop }
    }

    /// Like `new`, but rejects a range that is empty for every read.
    /// Offsets of mixed sign depend on the read length and are accepted.
    pub fn checked(start: isize, stop: isize) -> Result<Self, DbrError> {
        if (start < 0) == (stop < 0) && start >= stop {
            return Err(DbrError::BadTagRange(format!("{},{}", start, stop)));
        }
        Ok(TagRange::new(start, stop))
    }

    pub fn start(&self) -> isize {
        self.start
    }

    pub fn stop(&self) -> isize {
        self.stop
    }

    fn resolve(offset: isize, len: usize) -> usize {
        if offset < 0 {
            len.saturating_sub(offset.unsigned_abs())
        } else {
            (offset as usize).min(len)
        }
    }

    /// Tag bases within `sequence`.
    pub fn extract<'a>(&self, sequence: &'a [u8]) -> &'a [u8] {
        let start = Self::resolve(self.start, sequence.len());
        let stop = Self::resolve(self.stop, sequence.len());
        if start < stop {
            &sequence[start..stop]
        } else {
            &[]
        }
    }
}

/// Destination for (read identifier, tag) pairs scanned from a raw
/// sequence file.
pub trait TagSink {
    fn add_tag(&mut self, id: ReadId, tag: &[u8]) -> Result<(), DbrError>;
}

/// Scans every record of a fastq file, adding the identifier and tag of
/// each one to `sink`. Returns the number of records scanned.
///
/// # Errors
///
/// Fails on the first malformed record, including a read name without
/// an identifier token, or on the first error reported by `sink`.
pub fn scan_tags<R, S>(reader: fastq::Reader<R>, range: &TagRange, sink: &mut S) -> Result<usize>
where
    R: BufRead,
    S: TagSink,
{
    let mut nrecords = 0;

    for fqres in reader.records() {
        let fq = fqres?;
        let id = ReadId::from_fastq(&fq).with_context(|| format!("record {}", nrecords + 1))?;
        sink.add_tag(id, range.extract(fq.seq()))?;
        nrecords += 1;
    }

    Ok(nrecords)
}

fn tag_string(tag: &[u8]) -> String {
    String::from_utf8_lossy(tag).into_owned()
}

/// Mapping from read identifier to tag. A recurring identifier
/// replaces the earlier tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagMap {
    tags: HashMap<ReadId, String>,
}

impl TagMap {
    pub fn new() -> Self {
        TagMap::default()
    }

    pub fn insert(&mut self, id: ReadId, tag: String) -> Option<String> {
        self.tags.insert(id, tag)
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.tags.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, ReadId, String> {
        self.tags.iter()
    }

    pub fn from_fastq<R: BufRead>(reader: fastq::Reader<R>, range: &TagRange) -> Result<Self> {
        let mut tag_map = TagMap::new();
        scan_tags(reader, range, &mut tag_map)?;
        Ok(tag_map)
    }

    /// Entries ordered by identifier.
    pub fn sorted(&self) -> BTreeMap<&str, &str> {
        self.tags
            .iter()
            .map(|(id, tag)| (id.as_str(), tag.as_str()))
            .collect()
    }

    /// Writes the map as a JSON object of identifier to tag, with keys
    /// in sorted order.
    pub fn write_json<W: Write>(&self, dest: W) -> Result<()> {
        serde_json::to_writer_pretty(dest, &self.sorted())?;
        Ok(())
    }

    /// Reads a map written in either the forward or the inverted
    /// form. An inverted map is flattened into the forward form.
    ///
    /// # Errors
    ///
    /// `DbrError::BadTagMap` when the JSON is neither form, and
    /// `DbrError::DuplicateReadId` when an inverted map lists one
    /// identifier under two tags.
    pub fn read_json<R: Read>(src: R) -> Result<Self> {
        let file: TagMapFile =
            serde_json::from_reader(src).map_err(|e| DbrError::BadTagMap(e.to_string()))?;
        match file {
            TagMapFile::Forward(tags) => Ok(TagMap { tags }),
            TagMapFile::Inverted(ids) => {
                let mut inverted = InvertedTagMap::new();
                for (tag, tag_ids) in ids {
                    for id in tag_ids {
                        inverted.add_tag(id, tag.as_bytes())?;
                    }
                }
                Ok(inverted.into_tag_map())
            }
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
        TagMap::read_json(io::BufReader::new(file))
            .with_context(|| format!("reading tag map {}", path.display()))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file =
            fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut dest = BufWriter::new(file);
        self.write_json(&mut dest)?;
        dest.flush()?;
        Ok(())
    }

    /// Logs the first `n` entries by identifier for checking the map
    /// by eye.
    pub fn log_sample(&self, n: usize) {
        for (id, tag) in self.sorted().into_iter().take(n) {
            info!("  {}\t{}", id, tag);
        }
    }
}

impl TagSink for TagMap {
    fn add_tag(&mut self, id: ReadId, tag: &[u8]) -> Result<(), DbrError> {
        self.insert(id, tag_string(tag));
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TagMapFile {
    Forward(HashMap<ReadId, String>),
    Inverted(BTreeMap<String, Vec<ReadId>>),
}

/// Mapping from tag to the identifiers of the reads carrying it, in
/// the order they were read. Identifiers must be unique across the
/// whole map.
#[derive(Debug, Clone, Default)]
pub struct InvertedTagMap {
    ids: BTreeMap<String, Vec<ReadId>>,
    seen: HashSet<ReadId>,
}

impl InvertedTagMap {
    pub fn new() -> Self {
        InvertedTagMap::default()
    }

    pub fn get(&self, tag: &str) -> Option<&[ReadId]> {
        self.ids.get(tag).map(Vec::as_slice)
    }

    /// Number of distinct tags.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of identifiers over all tags.
    pub fn total_ids(&self) -> usize {
        self.seen.len()
    }

    pub fn from_fastq<R: BufRead>(reader: fastq::Reader<R>, range: &TagRange) -> Result<Self> {
        let mut inverted = InvertedTagMap::new();
        scan_tags(reader, range, &mut inverted)?;
        Ok(inverted)
    }

    pub fn into_tag_map(self) -> TagMap {
        let mut tag_map = TagMap::new();
        for (tag, ids) in self.ids {
            for id in ids {
                tag_map.insert(id, tag.clone());
            }
        }
        tag_map
    }

    /// Writes the map as a JSON object of tag to an array of
    /// identifiers, with tags in sorted order.
    pub fn write_json<W: Write>(&self, dest: W) -> Result<()> {
        serde_json::to_writer_pretty(dest, &self.ids)?;
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file =
            fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut dest = BufWriter::new(file);
        self.write_json(&mut dest)?;
        dest.flush()?;
        Ok(())
    }

    pub fn log_sample(&self, n: usize) {
        for (tag, ids) in self.ids.iter().take(n) {
            let ids: Vec<&str> = ids.iter().map(ReadId::as_str).collect();
            info!("  {}\t{}", tag, ids.join(","));
        }
    }
}

impl TagSink for InvertedTagMap {
    fn add_tag(&mut self, id: ReadId, tag: &[u8]) -> Result<(), DbrError> {
        let tag = tag_string(tag);
        if !self.seen.insert(id.clone()) {
            return Err(DbrError::DuplicateReadId {
                id: id.into_string(),
                tag,
            });
        }
        self.ids.entry(tag).or_default().push(id);
        Ok(())
    }
}
