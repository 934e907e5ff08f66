//! Adaptive refinement towards a sharp peak, followed by coarsening.
//!
//! Run with: cargo run --example adaptive_refinement

use sgadapt::algorithms::coarsening::Coarsening;
use sgadapt::errors::SGError;
use sgadapt::generators::StandardGenerator;
use sgadapt::grids::SparseGrid;
use sgadapt::serialization::SerializationFormat;
use sgadapt::storage::BoundingBox;

fn peak(x: &[f64]) -> f64 {
    (-50.0 * x.iter().map(|x| (x - 0.3) * (x - 0.3)).sum::<f64>()).exp()
}

/// Rough hierarchical surplus: the largest deviation, over all directions, from
/// the mean of the two neighbours at the point's own mesh width.
fn indicator(grid: &SparseGrid) -> Vec<f64> {
    let storage = grid.storage();
    (0..grid.len())
        .map(|seq| {
            let x = storage.unit_coordinate(seq);
            let value = peak(&x);
            let point = storage.point(seq);
            let mut deviation = 0.0_f64;
            for dim in 0..storage.num_inputs() {
                let (level, _) = point.get(dim);
                let h = 0.5_f64.powi(level as i32);
                let mut left = x.clone();
                let mut right = x.clone();
                left[dim] -= h;
                right[dim] += h;
                deviation = deviation.max((value - 0.5 * (peak(&left) + peak(&right))).abs());
            }
            deviation
        })
        .collect()
}

fn main() -> Result<(), SGError> {
    let mut grid = SparseGrid::with_bounding_box(BoundingBox::new(&[0.0, 0.0], &[1.0, 1.0]), 1);
    grid.sparse_grid(3, &StandardGenerator)?;
    println!("initial grid: {} points", grid.len());

    let refinement = grid.base_refinement();
    for iteration in 1..=8 {
        let alpha = indicator(&grid);
        grid.set_alpha(alpha)?;
        let created = grid.refine_by_surplus(&refinement, 4, 1e-3)?;
        println!("iteration {iteration}: {} new points, {} total", created.len(), grid.len());
        if created.is_empty() {
            break;
        }
    }

    let alpha = indicator(&grid);
    grid.set_alpha(alpha)?;
    let removed = grid.coarsen_by_surplus(&Coarsening::new(1), 1e-2)?;
    println!("coarsening removed {removed} points, {} left", grid.len());

    let buffer = grid.to_buffer(SerializationFormat::BincodeLz4)?;
    let copy = SparseGrid::read_buffer(&buffer, SerializationFormat::BincodeLz4)?;
    println!("serialized to {} bytes, read back {} points", buffer.len(), copy.len());
    Ok(())
}
