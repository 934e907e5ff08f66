use crate::errors::SGError;
use crate::storage::MAX_LEVEL;

///
/// Admissibility rule for the level vectors of a non-adaptive grid. Each
/// variant is an independent predicate over the complete level vector; the
/// generator only shares the enumeration mechanics between them.
///
#[derive(Clone, Debug, PartialEq)]
pub enum LevelVectorRule
{
    ///
    /// Interior sparse grid: `l_i >= 1`, `|l|_1 - t*|l|_inf <= (n + d - 1) - t*n`
    /// and `|l|_inf <= n`. `t = 0` is the standard sparse grid, `t` towards
    /// minus infinity approaches the full grid (Griebel & Knapek, "Optimized
    /// Tensor-Product Approximation Spaces").
    ///
    Regular { level: u8, t: f64 },
    ///
    /// Sparse grid with boundary points. For `boundary_level >= 1` a vector with
    /// `z` zero levels and level sum `s` is admitted iff `z == d`, or
    /// `s - t*|l|_inf <= b - t*n` where the bound `b` is `n + d - 1` for
    /// `z == 0` and `n + d - z - boundary_level` otherwise.
    /// `boundary_level == 0` admits every vector with `|l|_1 <= n`.
    ///
    BoundaryTruncated { level: u8, boundary_level: u8, t: f64 },
    ///
    /// `Regular` restricted to the given interaction terms: the dimensions
    /// refined beyond level one must all lie in one of the `terms`. Subsets of
    /// a term are implied, so the grid stays hierarchically complete.
    ///
    Interaction { level: u8, t: f64, terms: Vec<Vec<usize>> },
    ///
    /// `Regular` with periodic boundaries: level zero holds the single point
    /// with index zero and counts as level one in the level sum.
    ///
    Periodic { level: u8, t: f64 },
    ///
    /// Generalized truncated boundary grid ("pentagon cut"): levels below `k`
    /// count as `k`, and `sum(max(l_i, k)) <= n + k*(d - 1)`.
    ///
    Truncated { level: u8, k: u8 },
    /// Anisotropic full grid without boundary, `1 <= l_i <= levels[i]`.
    Full { levels: Vec<u8> },
    /// Full grid with boundary, `0 <= l_i <= n`.
    FullBoundary { level: u8 },
}

impl LevelVectorRule
{
    ///
    /// Validate the rule for a grid of `num_inputs` dimensions.
    ///
    pub fn validate(&self, num_inputs: usize) -> Result<(), SGError>
    {
        let check_modifier = |t: f64| if t.is_finite() && t <= 1.0 { Ok(()) } else { Err(SGError::InvalidParameter) };
        match self
        {
            LevelVectorRule::Regular { level, t } | LevelVectorRule::Periodic { level, t } =>
            {
                if *level == 0 || *level > MAX_LEVEL
                {
                    return Err(SGError::InvalidLevel);
                }
                check_modifier(*t)?;
            }
            LevelVectorRule::Interaction { level, t, terms } =>
            {
                if *level == 0 || *level > MAX_LEVEL
                {
                    return Err(SGError::InvalidLevel);
                }
                check_modifier(*t)?;
                if terms.iter().flatten().any(|&dim| dim >= num_inputs)
                {
                    return Err(SGError::InvalidParameter);
                }
            }
            LevelVectorRule::BoundaryTruncated { level, t, .. } =>
            {
                if *level > MAX_LEVEL
                {
                    return Err(SGError::InvalidLevel);
                }
                check_modifier(*t)?;
            }
            LevelVectorRule::FullBoundary { level } =>
            {
                if *level > MAX_LEVEL
                {
                    return Err(SGError::InvalidLevel);
                }
            }
            LevelVectorRule::Truncated { level, k } =>
            {
                if *level > MAX_LEVEL || *k > *level
                {
                    return Err(SGError::InvalidLevel);
                }
            }
            LevelVectorRule::Full { levels } =>
            {
                if levels.len() != num_inputs
                {
                    return Err(SGError::DimensionMismatch { expected: num_inputs, found: levels.len() });
                }
                if levels.iter().any(|&l| l == 0 || l > MAX_LEVEL)
                {
                    return Err(SGError::InvalidLevel);
                }
            }
        }
        Ok(())
    }

    /// Whether the grid has boundary points on both ends of every dimension.
    pub fn has_boundary(&self) -> bool
    {
        matches!(self, LevelVectorRule::BoundaryTruncated { .. } | LevelVectorRule::Truncated { .. } | LevelVectorRule::FullBoundary { .. })
    }

    fn min_level(&self) -> u8
    {
        if self.has_boundary() || matches!(self, LevelVectorRule::Periodic { .. }) { 0 } else { 1 }
    }

    ///
    /// Whether the point `index` of subspace `levels` belongs to the grid.
    /// Only periodic grids drop points: the right boundary is the left one.
    ///
    pub(crate) fn admits_index(&self, levels: &[u8], index: &[u32]) -> bool
    {
        !matches!(self, LevelVectorRule::Periodic { .. }) ||
            levels.iter().zip(index).all(|(&l, &i)| l != 0 || i == 0)
    }

    /// Upper bound for the level of dimension `dim` in any admitted vector.
    fn level_bound(&self, dim: usize) -> u8
    {
        match self
        {
            LevelVectorRule::Regular { level, .. } |
            LevelVectorRule::Interaction { level, .. } |
            LevelVectorRule::Periodic { level, .. } |
            LevelVectorRule::BoundaryTruncated { level, .. } |
            LevelVectorRule::Truncated { level, .. } |
            LevelVectorRule::FullBoundary { level } => *level,
            LevelVectorRule::Full { levels } => levels[dim],
        }
    }

    ///
    /// Whether the complete level vector `levels` is admitted.
    ///
    pub fn admits(&self, levels: &[u8]) -> bool
    {
        let d = levels.len() as i64;
        let sum: i64 = levels.iter().map(|&l| l as i64).sum();
        let max = levels.iter().copied().max().unwrap_or(0) as i64;
        if levels.iter().enumerate().any(|(dim, &l)| l < self.min_level() || l > self.level_bound(dim))
        {
            return false;
        }
        let modified = |sum: i64, max: i64, bound: i64, n: u8, t: f64|
            (sum as f64) - t * (max as f64) <= bound as f64 - t * (n as f64) + 1e-10;
        match self
        {
            LevelVectorRule::Regular { level, t } => modified(sum, max, *level as i64 + d - 1, *level, *t),
            LevelVectorRule::Interaction { level, t, terms } =>
            {
                let in_some_term = levels.iter().all(|&l| l <= 1) ||
                    terms.iter().any(|term| levels.iter().enumerate().all(|(dim, &l)| l <= 1 || term.contains(&dim)));
                in_some_term && modified(sum, max, *level as i64 + d - 1, *level, *t)
            }
            LevelVectorRule::Periodic { level, t } =>
            {
                let zeros = levels.iter().filter(|&&l| l == 0).count() as i64;
                modified(sum + zeros, max.max(1), *level as i64 + d - 1, *level, *t)
            }
            LevelVectorRule::BoundaryTruncated { level, boundary_level, t } =>
            {
                let n = *level as i64;
                let b = *boundary_level as i64;
                if b == 0
                {
                    return sum <= n;
                }
                let zeros = levels.iter().filter(|&&l| l == 0).count() as i64;
                if zeros == d
                {
                    true
                }
                else if zeros == 0
                {
                    modified(sum, max, n + d - 1, *level, *t)
                }
                else
                {
                    modified(sum, max, n + d - zeros - b, *level, *t)
                }
            }
            LevelVectorRule::Truncated { level, k } =>
            {
                let k = *k as i64;
                let effective: i64 = levels.iter().map(|&l| (l as i64).max(k)).sum();
                effective <= *level as i64 + k * (d - 1)
            }
            LevelVectorRule::Full { .. } | LevelVectorRule::FullBoundary { .. } => true,
        }
    }

    ///
    /// Whether some completion of `prefix` to `num_inputs` dimensions is admitted.
    /// Every rule is monotone in the levels apart from the all-boundary case, so
    /// completing with the smallest levels (zeros or ones) decides it.
    ///
    fn prefix_feasible(&self, prefix: &[u8], num_inputs: usize, scratch: &mut Vec<u8>) -> bool
    {
        [0u8, 1u8].iter().any(|&fill|
        {
            scratch.clear();
            scratch.extend_from_slice(prefix);
            scratch.resize(num_inputs, fill.max(self.min_level()));
            self.admits(scratch)
        })
    }

    ///
    /// All admitted level vectors, in lexicographic order.
    ///
    pub fn level_vectors(&self, num_inputs: usize) -> Vec<Vec<u8>>
    {
        let mut result = Vec::new();
        let mut prefix = Vec::with_capacity(num_inputs);
        let mut scratch = Vec::with_capacity(num_inputs);
        if num_inputs > 0
        {
            self.enumerate(num_inputs, &mut prefix, &mut scratch, &mut result);
        }
        result
    }

    fn enumerate(&self, num_inputs: usize, prefix: &mut Vec<u8>, scratch: &mut Vec<u8>, result: &mut Vec<Vec<u8>>)
    {
        let dim = prefix.len();
        for l in self.min_level()..=self.level_bound(dim)
        {
            prefix.push(l);
            if dim + 1 == num_inputs
            {
                if self.admits(prefix)
                {
                    result.push(prefix.clone());
                }
            }
            else if self.prefix_feasible(prefix, num_inputs, scratch)
            {
                self.enumerate(num_inputs, prefix, scratch, result);
            }
            prefix.pop();
        }
    }
}

///
/// Visit every point of the hierarchical subspace with the given level vector.
///
pub(crate) fn for_each_index<F: FnMut(&[u32])>(levels: &[u8], mut f: F)
{
    let first = |l: u8| if l == 0 { 0 } else { 1 };
    let last = |l: u8| if l == 0 { 1 } else { (1u32 << l) - 1 };
    let step = |l: u8| if l == 0 { 1 } else { 2 };
    let mut index: Vec<u32> = levels.iter().map(|&l| first(l)).collect();
    if index.is_empty()
    {
        return;
    }
    loop
    {
        f(&index);
        // odometer increment, fastest in the last dimension
        let mut d = levels.len();
        loop
        {
            if d == 0
            {
                return;
            }
            d -= 1;
            if index[d] < last(levels[d])
            {
                index[d] += step(levels[d]);
                break;
            }
            index[d] = first(levels[d]);
        }
    }
}
