use std::fmt::Write;

/// Largest tally dimension.
pub const MAX_NLIM: usize = 64;

/// Tallies of locus groups by the number of reads observed and the
/// number kept. Group sizes at or above `nlim - 1` share the last
/// row or column, with `nlim` capped at `MAX_NLIM`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stats {
    nlim: usize,
    counts: Vec<u64>,
    n_primary: usize,
    n_retained: usize,
    n_removed: usize,
    n_unmapped: usize,
    n_untagged: usize,
    n_wrong_length: usize,
}

impl Stats {
    pub fn new(nlim: usize) -> Self {
        let nlim = nlim.clamp(2, MAX_NLIM);
        Stats {
            nlim,
            counts: vec![0; nlim * nlim],
            n_primary: 0,
            n_retained: 0,
            n_removed: 0,
            n_unmapped: 0,
            n_untagged: 0,
            n_wrong_length: 0,
        }
    }

    fn index(&self, ntotal: usize, nkept: usize) -> usize {
        ntotal.min(self.nlim - 1) * self.nlim + nkept.min(self.nlim - 1)
    }

    /// Records one resolved group.
    pub fn tally(&mut self, ntotal: usize, nkept: usize) {
        let idx = self.index(ntotal, nkept);
        self.counts[idx] += 1;
        self.n_retained += nkept;
        self.n_removed += ntotal - nkept;
    }

    /// Records reads at the unmapped locus, which are neither kept nor
    /// removed.
    pub fn tally_unmapped(&mut self, nreads: usize) {
        self.n_unmapped += nreads;
    }

    pub fn set_primary(&mut self, n_primary: usize) {
        self.n_primary = n_primary;
    }

    pub fn set_untagged(&mut self, n_untagged: usize) {
        self.n_untagged = n_untagged;
    }

    pub fn set_wrong_length(&mut self, n_wrong_length: usize) {
        self.n_wrong_length = n_wrong_length;
    }

    pub fn groups(&self, ntotal: usize, nkept: usize) -> u64 {
        self.counts[self.index(ntotal, nkept)]
    }

    pub fn n_primary(&self) -> usize {
        self.n_primary
    }

    pub fn n_retained(&self) -> usize {
        self.n_retained
    }

    pub fn n_removed(&self) -> usize {
        self.n_removed
    }

    pub fn n_unmapped(&self) -> usize {
        self.n_unmapped
    }

    pub fn n_untagged(&self) -> usize {
        self.n_untagged
    }

    pub fn n_wrong_length(&self) -> usize {
        self.n_wrong_length
    }

    pub fn dedup_table(&self) -> String {
        let mut table = "ttl\tkept\tcount\n".to_string();

        for ttl in 0..self.nlim {
            for kept in 0..self.nlim {
                let ct = self.counts[self.index(ttl, kept)];
                if ct > 0 {
                    let ttl_str = if ttl + 1 == self.nlim {
                        format!("{}+", ttl)
                    } else {
                        ttl.to_string()
                    };
                    let kept_str = if kept + 1 == self.nlim {
                        format!("{}+", kept)
                    } else {
                        kept.to_string()
                    };
                    writeln!(table, "{}\t{}\t{}", ttl_str, kept_str, ct).unwrap();
                }
            }
        }

        table
    }

    pub fn summary_table(&self) -> String {
        format!(
            "primary\t{}\nretained\t{}\nremoved\t{}\nunmapped\t{}\nuntagged\t{}\nwrong_length\t{}\n",
            self.n_primary,
            self.n_retained,
            self.n_removed,
            self.n_unmapped,
            self.n_untagged,
            self.n_wrong_length
        )
    }
}
