use std::collections::BTreeMap;
use std::collections::btree_map;
use std::io::BufRead;

use anyhow::Result;
use log::{debug, info};

use crate::read_id::ReadId;
use crate::tag_map::TagMap;

use super::alignment::{AlignmentRecord, AlignmentRecords};

/// Grouping key for candidate PCR duplicates: the reference locus of
/// the alignment and the tag of the read. Reads missing from the tag
/// map have no tag and group together under `None`, which orders
/// before every real tag.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocusKey {
    locus: String,
    tag: Option<String>,
}

impl LocusKey {
    pub fn new(locus: String, tag: Option<String>) -> Self {
        LocusKey { locus, tag }
    }

    pub fn locus(&self) -> &str {
        &self.locus
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn is_unmapped(&self) -> bool {
        self.locus == super::alignment::UNMAPPED
    }
}

/// One read in a locus group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    id: ReadId,
    sequence: String,
    quality: String,
}

impl Member {
    pub fn new(id: ReadId, sequence: String, quality: String) -> Self {
        Member {
            id,
            sequence,
            quality,
        }
    }

    pub fn id(&self) -> &ReadId {
        &self.id
    }

    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    pub fn quality(&self) -> &str {
        &self.quality
    }
}

/// Reads sharing one `LocusKey`, in the order they were seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocusGroup {
    members: Vec<Member>,
}

impl LocusGroup {
    pub fn new() -> Self {
        LocusGroup::default()
    }

    pub fn push(&mut self, member: Member) {
        self.members.push(member);
    }

    /// Number of reads observed for the key.
    pub fn count(&self) -> usize {
        self.members.len()
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn into_members(self) -> Vec<Member> {
        self.members
    }
}

/// All locus groups for one sample, along with counts of the
/// alignments that were considered.
#[derive(Debug, Clone, Default)]
pub struct SampleGroups {
    groups: BTreeMap<LocusKey, LocusGroup>,
    n_primary: usize,
    n_secondary: usize,
    n_wrong_length: usize,
    n_untagged: usize,
}

impl SampleGroups {
    pub fn new() -> Self {
        SampleGroups::default()
    }

    /// Adds one alignment. Alignments other than the primary one are
    /// ignored entirely, as are primary alignments whose sequence
    /// length differs from `seq_length` when it is given. Every other
    /// alignment, mapped or not, counts as a primary read and joins
    /// exactly one group.
    pub fn add(&mut self, rec: AlignmentRecord, tag_map: &TagMap, seq_length: Option<usize>) {
        if !rec.is_primary() {
            self.n_secondary += 1;
            return;
        }

        if seq_length.is_some_and(|len| rec.sequence().len() != len) {
            self.n_wrong_length += 1;
            return;
        }

        let tag = tag_map.get(rec.id().as_str()).map(str::to_string);
        if tag.is_none() {
            self.n_untagged += 1;
        }

        let (id, locus, sequence, quality) = rec.into_parts();
        self.groups
            .entry(LocusKey::new(locus, tag))
            .or_default()
            .push(Member::new(id, sequence, quality));
        self.n_primary += 1;
    }

    /// Groups every alignment from a text alignment stream.
    ///
    /// # Errors
    ///
    /// Fails on the first unreadable or malformed alignment line.
    pub fn from_alignments<R: BufRead>(
        src: R,
        tag_map: &TagMap,
        seq_length: Option<usize>,
    ) -> Result<Self> {
        let mut groups = SampleGroups::new();
        for rec in AlignmentRecords::new(src) {
            groups.add(rec?, tag_map, seq_length);
        }

        debug!(
            "{} primary, {} secondary, {} wrong length, {} untagged, {} groups",
            groups.n_primary,
            groups.n_secondary,
            groups.n_wrong_length,
            groups.n_untagged,
            groups.groups.len()
        );

        Ok(groups)
    }

    pub fn get(&self, locus: &str, tag: Option<&str>) -> Option<&LocusGroup> {
        self.groups
            .get(&LocusKey::new(locus.to_string(), tag.map(str::to_string)))
    }

    pub fn iter(&self) -> btree_map::Iter<'_, LocusKey, LocusGroup> {
        self.groups.iter()
    }

    /// Number of distinct (locus, tag) groups, unmapped included.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Primary alignments grouped, unmapped included.
    pub fn n_primary(&self) -> usize {
        self.n_primary
    }

    /// Non-primary alignments skipped.
    pub fn n_secondary(&self) -> usize {
        self.n_secondary
    }

    /// Primary alignments skipped for their sequence length.
    pub fn n_wrong_length(&self) -> usize {
        self.n_wrong_length
    }

    /// Primary alignments with no tag.
    pub fn n_untagged(&self) -> usize {
        self.n_untagged
    }

    /// Primary alignments at the unmapped locus.
    pub fn n_unmapped(&self) -> usize {
        self.groups
            .iter()
            .filter(|(key, _)| key.is_unmapped())
            .map(|(_, group)| group.count())
            .sum()
    }

    /// Logs up to `n` groups for checking the grouping by eye.
    pub fn log_sample(&self, n: usize) {
        for (key, group) in self.groups.iter().take(n) {
            let ids: Vec<&str> = group.members().iter().map(|m| m.id().as_str()).collect();
            info!(
                "  {}\t{}\t{}\t{}",
                key.locus(),
                key.tag().unwrap_or("-"),
                group.count(),
                ids.join(",")
            );
        }
    }
}

impl IntoIterator for SampleGroups {
    type Item = (LocusKey, LocusGroup);
    type IntoIter = btree_map::IntoIter<LocusKey, LocusGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.into_iter()
    }
}
