//!
//! Whitespace separated grid description, compatible with grids persisted by
//! older tools:
//!
//! ```text
//! <version> <dim> <number of points>
//! 0
//! <lower> <upper> <dirichlet lower> <dirichlet upper>   (once per dimension)
//! <dim> <level> <index> ... <leaf>                       (once per point)
//! ```
//!
//! Version 5 is written. Versions 1 and 2 carry no bounding box, versions 1
//! and 4 carry no leaf flag (leaf flags are then recalculated). Version 5 files
//! written with coordinate stretching (marker `1` or `2` instead of `0`) are
//! read as plain grids; the stretching block is skipped.
//!
use std::fmt::Write;
use std::str::{FromStr, SplitWhitespace};

use crate::errors::SGError;
use crate::storage::{BoundingBox, GridPoint, SparseGridData, MAX_LEVEL};

pub const TEXT_FORMAT_VERSION: u32 = 5;

struct Tokens<'a>(SplitWhitespace<'a>);

impl Tokens<'_>
{
    fn next<T: FromStr>(&mut self) -> Result<T, SGError>
    {
        self.0.next().ok_or(SGError::DeserializationFailed)?.parse().map_err(|_| SGError::DeserializationFailed)
    }
    fn remaining(&self) -> usize
    {
        self.0.clone().count()
    }
    fn next_bool(&mut self) -> Result<bool, SGError>
    {
        match self.next::<u8>()?
        {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(SGError::DeserializationFailed),
        }
    }
}

impl SparseGridData
{
    ///
    /// Serialize dimension, points, leaf flags and bounding box as text.
    ///
    pub fn to_text(&self) -> Result<String, SGError>
    {
        let mut out = String::new();
        let bbox = &self.bounding_box;
        let write = |out: &mut String| -> std::fmt::Result
        {
            writeln!(out, "{} {} {}", TEXT_FORMAT_VERSION, self.num_inputs, self.len())?;
            writeln!(out, "0")?;
            for d in 0..self.num_inputs
            {
                write!(out, "{:e} {:e} {} {} ", bbox.lower[d], bbox.upper[d],
                    bbox.is_dirichlet_lower(d) as u8, bbox.is_dirichlet_upper(d) as u8)?;
            }
            writeln!(out)?;
            for point in self.nodes()
            {
                write!(out, "{}", self.num_inputs)?;
                for (l, i) in point.level().iter().zip(point.index())
                {
                    write!(out, " {l} {i}")?;
                }
                writeln!(out, " {}", point.is_leaf() as u8)?;
            }
            Ok(())
        };
        write(&mut out).map_err(|_| SGError::SerializationFailed)?;
        Ok(out)
    }

    ///
    /// Parse a grid written by `to_text` (or an older version of the format).
    ///
    pub fn from_text(text: &str) -> Result<Self, SGError>
    {
        let mut tokens = Tokens(text.split_whitespace());
        let version: u32 = tokens.next()?;
        let num_inputs: usize = tokens.next()?;
        let num_points: usize = tokens.next()?;
        if version == 0 || version > TEXT_FORMAT_VERSION
        {
            return Err(SGError::UnsupportedFormat);
        }
        let stretching = match version
        {
            1 | 2 | 3 | 4 => None,
            _ => match tokens.next::<i32>()?
            {
                0 => None,
                mode @ (1 | 2) => Some(mode),
                _ => return Err(SGError::UnsupportedFormat),
            },
        };
        let has_bounding_box = version >= 3;
        let has_leaf_flags = !matches!(version, 1 | 4);

        // every dimension and point must be backed by tokens before anything is allocated
        let per_point = num_inputs.checked_mul(2).and_then(|n| n.checked_add(1 + has_leaf_flags as usize));
        let required = num_inputs.checked_mul(if has_bounding_box { 4 } else { 0 })
            .zip(per_point.and_then(|n| n.checked_mul(num_points)))
            .and_then(|(bounds, points)| bounds.checked_add(points));
        match required
        {
            Some(required) if required <= tokens.remaining() && num_inputs <= text.len() => {}
            _ => return Err(SGError::DeserializationFailed),
        }

        let mut bounding_box = BoundingBox::with_dim(num_inputs);
        if has_bounding_box
        {
            for d in 0..num_inputs
            {
                bounding_box.lower[d] = tokens.next()?;
                bounding_box.upper[d] = tokens.next()?;
                let dirichlet_lower = tokens.next_bool()?;
                let dirichlet_upper = tokens.next_bool()?;
                bounding_box.set_dirichlet(d, dirichlet_lower, dirichlet_upper);
            }
        }
        if let Some(mode) = stretching
        {
            skip_stretching(&mut tokens, mode, &mut bounding_box)?;
        }

        let mut storage = SparseGridData::with_bounding_box(bounding_box);
        let mut level = vec![0u8; num_inputs];
        let mut index = vec![0u32; num_inputs];
        for seq in 0..num_points
        {
            let dim: usize = tokens.next()?;
            if dim != num_inputs
            {
                return Err(SGError::DimensionMismatch { expected: num_inputs, found: dim });
            }
            for d in 0..num_inputs
            {
                level[d] = tokens.next()?;
                index[d] = tokens.next()?;
            }
            let is_leaf = if has_leaf_flags { tokens.next_bool()? } else { false };
            let point = GridPoint::new(&level, &index, is_leaf);
            if !point.is_valid() || storage.insert(point) != seq
            {
                return Err(SGError::DeserializationFailed);
            }
        }
        if !has_leaf_flags
        {
            log::warn!("grid description version {version} has no leaf flags, recalculating");
            storage.recalc_leaf_property();
        }
        storage.has_boundary = storage.num_inner_points() != storage.len();
        Ok(storage)
    }
}

///
/// Consume the coordinate stretching block that follows the boundaries of a
/// stretched grid. Mode 1 lists an analytic map (`type x_0 xsi`) per
/// dimension, mode 2 a discrete level and its `2^level + 1` grid lines. The
/// map itself is dropped; a discrete one still narrows the bounding box to its
/// first and last grid line.
///
fn skip_stretching(tokens: &mut Tokens<'_>, mode: i32, bounding_box: &mut BoundingBox) -> Result<(), SGError>
{
    log::warn!("dropping coordinate stretching (mode {mode}), keeping its bounding box");
    for d in 0..bounding_box.num_inputs()
    {
        if mode == 1
        {
            let kind: i32 = tokens.next()?;
            if !(1..=3).contains(&kind)
            {
                log::warn!("unknown stretching type {kind} in dimension {d}");
            }
            tokens.next::<f64>()?;
            tokens.next::<f64>()?;
            continue;
        }
        let level: u32 = tokens.next()?;
        if level > MAX_LEVEL as u32
        {
            return Err(SGError::DeserializationFailed);
        }
        let first: f64 = tokens.next()?;
        let mut last = first;
        for _ in 0..1u64 << level
        {
            last = tokens.next()?;
        }
        bounding_box.lower[d] = first;
        bounding_box.upper[d] = last;
    }
    Ok(())
}
