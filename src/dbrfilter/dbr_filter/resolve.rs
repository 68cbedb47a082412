//! Choosing which reads of a locus group survive.
//!
//! A group with no more reads than the expected copy number is kept
//! whole. A larger group keeps only the expected number of reads, the
//! ones ranked highest by the key (median quality, sequence, quality
//! string) compared in that order, largest first. Reads that tie on
//! the entire key are ranked by the order they were seen, earliest
//! first.

use std::cmp::Ordering;

use anyhow::Result;

use crate::error::DbrError;
use crate::quality::median_quality;

use super::locus_group::{LocusGroup, Member, SampleGroups};
use super::stats::Stats;

/// The reads of one group chosen to be kept, and how many were
/// discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct Retention {
    kept: Vec<Member>,
    removed: usize,
}

impl Retention {
    pub fn kept(&self) -> &[Member] {
        &self.kept
    }

    pub fn removed(&self) -> usize {
        self.removed
    }
}

struct Ranked {
    score: f64,
    order: usize,
    member: Member,
}

impl Ranked {
    /// Best first.
    fn rank(a: &Ranked, b: &Ranked) -> Ordering {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.member.sequence().cmp(a.member.sequence()))
            .then_with(|| b.member.quality().cmp(a.member.quality()))
            .then_with(|| a.order.cmp(&b.order))
    }
}

/// Resolves one group against the expected copy number `n_expected`.
///
/// # Errors
///
/// `DbrError::UnknownQualityChar` when ranking is needed and a quality
/// string contains a character outside the score table.
pub fn resolve_group(group: LocusGroup, n_expected: usize) -> Result<Retention, DbrError> {
    let count = group.count();
    if count <= n_expected {
        return Ok(Retention {
            kept: group.into_members(),
            removed: 0,
        });
    }

    let mut ranked = group
        .into_members()
        .into_iter()
        .enumerate()
        .map(|(order, member)| -> Result<Ranked, DbrError> {
            Ok(Ranked {
                score: median_quality(member.quality().as_bytes())?,
                order,
                member,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    ranked.sort_by(Ranked::rank);
    ranked.truncate(n_expected);

    Ok(Retention {
        kept: ranked.into_iter().map(|r| r.member).collect(),
        removed: count - n_expected,
    })
}

/// Receives the reads that survive duplicate removal.
pub trait RetainedSink {
    fn retain(&mut self, member: &Member) -> Result<()>;
}

impl RetainedSink for Vec<Member> {
    fn retain(&mut self, member: &Member) -> Result<()> {
        self.push(member.clone());
        Ok(())
    }
}

/// Resolves every group of a sample in key order, passing kept reads
/// to `sink`. Reads at the unmapped locus are dropped without being
/// counted as kept or removed.
///
/// # Arguments
///
/// * `groups` are all locus groups of the sample
///
/// * `n_expected` is the number of copies of one molecule expected to
/// share a locus and tag without being PCR duplicates
///
/// * `sink` receives each kept read, group by group
///
/// # Errors
///
/// An error variant is returned for an unscoreable quality string or
/// when `sink` fails; resolution stops at the first error.
pub fn resolve_sample<S: RetainedSink>(
    groups: SampleGroups,
    n_expected: usize,
    sink: &mut S,
) -> Result<Stats> {
    let mut stats = Stats::new(n_expected.saturating_add(3));
    stats.set_primary(groups.n_primary());
    stats.set_untagged(groups.n_untagged());
    stats.set_wrong_length(groups.n_wrong_length());

    for (key, group) in groups {
        if key.is_unmapped() {
            stats.tally_unmapped(group.count());
            continue;
        }

        let count = group.count();
        let retention = resolve_group(group, n_expected)?;
        stats.tally(count, retention.kept().len());

        for member in retention.kept() {
            sink.retain(member)?;
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::read_id::ReadId;
    use crate::tag_map::TagMap;

    fn member(id: &str, seq: &str, qual: &str) -> Member {
        Member::new(ReadId::parse(id).unwrap(), seq.to_string(), qual.to_string())
    }

    fn group(members: &[Member]) -> LocusGroup {
        let mut group = LocusGroup::new();
        for m in members {
            group.push(m.clone());
        }
        group
    }

    fn kept_ids(retention: &Retention) -> Vec<&str> {
        retention.kept().iter().map(|m| m.id().as_str()).collect()
    }

    #[test]
    fn at_threshold_keeps_all() {
        let members = [
            member("1:1:1:1", "ACGT", "!!!!"),
            member("1:1:1:2", "ACGT", "IIII"),
        ];
        // Unscoreable qualities are never looked at when every read is kept.
        let retention = resolve_group(group(&members), 2).unwrap();
        assert_eq!(retention.removed(), 0);
        assert_eq!(retention.kept(), &members[..]);
    }

    #[test]
    fn keeps_highest_quality() {
        let members = [
            member("1:1:1:1", "ACGT", "5555"),
            member("1:1:1:2", "ACGT", "IIII"),
            member("1:1:1:3", "ACGT", "++++"),
            member("1:1:1:4", "ACGT", "????"),
        ];
        let retention = resolve_group(group(&members), 2).unwrap();
        assert_eq!(retention.removed(), 2);
        assert_eq!(kept_ids(&retention), vec!["1:1:1:2", "1:1:1:4"]);
    }

    #[test]
    fn kept_score_dominates_removed() {
        let quals = ["I5?+", "+++I", "IIII", "55II", "?5?5", "+I+I", "K\"K\""];
        let members: Vec<Member> = quals
            .iter()
            .enumerate()
            .map(|(i, q)| member(&format!("1:1:1:{}", i), "ACGT", q))
            .collect();
        let retention = resolve_group(group(&members), 3).unwrap();
        assert_eq!(retention.kept().len(), 3);
        assert_eq!(retention.removed(), 4);

        let score = |m: &Member| median_quality(m.quality().as_bytes()).unwrap();
        let min_kept = retention.kept().iter().map(score).fold(f64::MAX, f64::min);
        let kept: Vec<&ReadId> = retention.kept().iter().map(Member::id).collect();
        for m in members.iter().filter(|m| !kept.contains(&m.id())) {
            assert!(score(m) <= min_kept);
        }
    }

    #[test]
    fn tie_on_score_uses_sequence_then_quality() {
        // All medians are 40.
        let members = [
            member("1:1:1:1", "AAAA", "IIII"),
            member("1:1:1:2", "CCCC", "IIII"),
            member("1:1:1:3", "CCCC", "IIIK"),
            member("1:1:1:4", "GGGG", "IIII"),
        ];
        let retention = resolve_group(group(&members), 1).unwrap();
        assert_eq!(kept_ids(&retention), vec!["1:1:1:4"]);

        let retention = resolve_group(group(&members[..3]), 2).unwrap();
        assert_eq!(kept_ids(&retention), vec!["1:1:1:3", "1:1:1:2"]);
    }

    #[test]
    fn full_tie_keeps_first_seen() {
        let members = [
            member("1:1:1:1", "ACGT", "IIII"),
            member("1:1:1:2", "ACGT", "IIII"),
            member("1:1:1:3", "ACGT", "IIII"),
        ];
        let retention = resolve_group(group(&members), 2).unwrap();
        assert_eq!(kept_ids(&retention), vec!["1:1:1:1", "1:1:1:2"]);
    }

    #[test]
    fn zero_expected_removes_all() {
        let members = [member("1:1:1:1", "ACGT", "IIII")];
        let retention = resolve_group(group(&members), 0).unwrap();
        assert!(retention.kept().is_empty());
        assert_eq!(retention.removed(), 1);
    }

    #[test]
    fn bad_quality_over_threshold() {
        let members = [
            member("1:1:1:1", "ACGT", "IIII"),
            member("1:1:1:2", "ACGT", "II!I"),
        ];
        assert_eq!(
            resolve_group(group(&members), 1),
            Err(DbrError::UnknownQualityChar(b'!'))
        );
    }

    fn sample_text() -> String {
        let rows = [
            ("1:1:1:1", "locusA", "ACGT", "IIII"),
            ("1:1:1:2", "locusA", "ACGT", "5555"),
            ("1:1:1:3", "locusA", "ACGT", "????"),
            ("1:1:1:4", "locusB", "TTTT", "IIII"),
            ("1:1:1:5", "*", "GGGG", "IIII"),
            ("1:1:1:6", "locusB", "CCCC", "++++"),
        ];
        rows.iter()
            .map(|(id, locus, seq, qual)| {
                format!("{}\t0\t{}\t1\t60\t4M\t*\t0\t0\t{}\t{}\n", id, locus, seq, qual)
            })
            .collect()
    }

    fn sample_tags() -> TagMap {
        let mut tag_map = TagMap::new();
        for (id, tag) in [
            ("1:1:1:1", "T1"),
            ("1:1:1:2", "T1"),
            ("1:1:1:3", "T1"),
            ("1:1:1:4", "T2"),
            ("1:1:1:5", "T1"),
        ] {
            tag_map.insert(ReadId::parse(id).unwrap(), tag.to_string());
        }
        tag_map
    }

    #[test]
    fn sample_resolution() {
        let text = sample_text();
        let groups = SampleGroups::from_alignments(text.as_bytes(), &sample_tags(), None).unwrap();

        let mut kept: Vec<Member> = Vec::new();
        let stats = resolve_sample(groups, 2, &mut kept).unwrap();

        let ids: Vec<&str> = kept.iter().map(|m| m.id().as_str()).collect();
        // locusA/T1 best two, then locusB untagged, then locusB/T2
        assert_eq!(ids, vec!["1:1:1:1", "1:1:1:3", "1:1:1:6", "1:1:1:4"]);

        assert_eq!(stats.n_primary(), 6);
        assert_eq!(stats.n_removed(), 1);
        assert_eq!(stats.n_retained(), 4);
        assert_eq!(stats.n_unmapped(), 1);
        assert_eq!(stats.n_untagged(), 1);
        assert_eq!(
            stats.n_primary() - stats.n_unmapped() - stats.n_retained(),
            stats.n_removed()
        );
    }

    #[test]
    fn untagged_group_over_threshold() {
        let text = "1:1:2:1\t0\tlocusC\t1\t60\t4M\t*\t0\t0\tACGT\t5555\n\
                    1:1:2:2\t0\tlocusC\t1\t60\t4M\t*\t0\t0\tACGT\tIIII\n\
                    1:1:2:3\t0\tlocusC\t1\t60\t4M\t*\t0\t0\tTTTT\t????\n\
                    1:1:2:4\t0\tlocusC\t1\t60\t4M\t*\t0\t0\tAAAA\t????\n";
        let groups = SampleGroups::from_alignments(text.as_bytes(), &sample_tags(), None).unwrap();
        assert_eq!(groups.get("locusC", None).unwrap().count(), 4);

        let mut kept: Vec<Member> = Vec::new();
        let stats = resolve_sample(groups, 2, &mut kept).unwrap();

        // 40 first, then the 30s split by sequence
        let ids: Vec<&str> = kept.iter().map(|m| m.id().as_str()).collect();
        assert_eq!(ids, vec!["1:1:2:2", "1:1:2:3"]);
        assert_eq!(stats.n_untagged(), 4);
        assert_eq!(stats.n_removed(), 2);
        assert_eq!(stats.groups(4, 2), 1);
    }

    #[test]
    fn huge_expected_count() {
        let text = sample_text();
        let groups = SampleGroups::from_alignments(text.as_bytes(), &sample_tags(), None).unwrap();

        let mut kept: Vec<Member> = Vec::new();
        let stats = resolve_sample(groups, usize::MAX, &mut kept).unwrap();
        assert_eq!(kept.len(), 5);
        assert_eq!(stats.n_removed(), 0);
        assert_eq!(stats.groups(3, 3), 1);

        let groups = SampleGroups::from_alignments(text.as_bytes(), &sample_tags(), None).unwrap();
        let stats = resolve_sample(groups, 1 << 20, &mut Vec::<Member>::new()).unwrap();
        assert_eq!(stats.n_retained(), 5);
    }

    #[test]
    fn sample_bad_quality() {
        let text = "1:1:1:1\t0\tlocusA\t1\t60\t4M\t*\t0\t0\tACGT\tIIII\n\
                    1:1:1:2\t0\tlocusA\t1\t60\t4M\t*\t0\t0\tACGT\tII I\n";
        let groups = SampleGroups::from_alignments(text.as_bytes(), &sample_tags(), None).unwrap();
        let mut kept: Vec<Member> = Vec::new();
        let err = resolve_sample(groups, 1, &mut kept).unwrap_err();
        assert_eq!(
            err.downcast_ref::<DbrError>(),
            Some(&DbrError::UnknownQualityChar(b' '))
        );
    }
}
