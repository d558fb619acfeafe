use rand::Rng;

/// Weighted index sampler over an integer mass array.
///
/// The masses are kept in a heap-ordered binary choice tree, so one draw
/// costs O(log n). The mapper rebuilds and resamples its candidate sets
/// many times per run, which makes the up-front O(n) construction pay
/// off over repeated linear scans.
#[derive(Clone, Debug)]
pub(crate) struct MassTree {
    /// Internal nodes hold the total mass of their left subtree;
    /// c[0] holds the total mass of the whole tree.
    c: Vec<u64>,
    n: usize,
}

impl MassTree {
    /// Build the choice tree; `mass` must hold at least two entries and
    /// no zero masses (callers floor their masses at 1).
    pub(crate) fn new(mass: &[u64]) -> Self {
        debug_assert!(mass.len() >= 2);
        debug_assert!(mass.iter().all(|m| *m > 0));
        let n = mass.len();
        let mut c = vec![0u64; n];
        // total mass from the leaves up; node i has children 2i and 2i+1
        for i in (1..n).rev() {
            let k = 2 * i;
            c[i] = Self::node(&c, mass, n, k) + Self::node(&c, mass, n, k + 1);
        }
        // c[0] is unused by the walk; keep the total there
        c[0] = c[1];
        // reduce internal nodes to the mass of their left child's subtree
        for i in 1..n {
            c[i] -= Self::node(&c, mass, n, 2 * i + 1);
        }
        MassTree { c, n }
    }

    // lets the construction treat c and mass as one contiguous array
    fn node(c: &[u64], mass: &[u64], n: usize, i: usize) -> u64 {
        if i < n {
            c[i]
        } else {
            mass[i - n]
        }
    }

    /// Total mass in the tree.
    pub(crate) fn total(&self) -> u64 {
        self.c[0]
    }

    /// Draw an index with probability proportional to its mass.
    pub(crate) fn pick<R: Rng>(&self, rng: &mut R) -> usize {
        let r = rng.gen_range(0..self.total());
        self.reduce(r)
    }

    fn reduce(&self, mut r: u64) -> usize {
        let mut k = 1;
        while k < self.n {
            let m = self.c[k];
            k *= 2;
            if r >= m {
                r -= m;
                k += 1;
            }
        }
        k - self.n
    }
}
