use crate::algorithms::refinement::RefinementFunctor;
use crate::storage::SparseGridData;

///
/// A function that defines how refinement is performed.
///
/// # Arguments
/// - `storage`: Storage of sparse grid.
/// - `seq`: Sequence number of the point being scored.
///
pub type UserRefinementFunction = dyn Fn(&SparseGridData, usize) -> f64 + Send + Sync;

pub struct UserDefinedRefinement<'a>
{
    pub fun_eval: &'a UserRefinementFunction,
    pub refinements_num: usize,
    pub threshold: f64,
    pub start: f64,
}

impl<'a> UserDefinedRefinement<'a>
{
    pub fn new(fun_eval: &'a UserRefinementFunction, refinements_num: usize, threshold: f64) -> Self
    {
        Self { fun_eval, refinements_num, threshold, start: 0.0 }
    }
}

impl RefinementFunctor for UserDefinedRefinement<'_>
{
    fn eval(&self, storage: &SparseGridData, seq: usize) -> f64 {
        (self.fun_eval)(storage, seq)
    }

    fn start(&self) -> f64 {
        self.start
    }

    fn refinements_num(&self) -> usize {
        self.refinements_num
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }
}

#[test]
fn test_user_defined_refinement()
{
    use crate::algorithms::refinement::{BaseRefinement, Refinement};
    use crate::storage::GridPoint;
    let mut storage = SparseGridData::new(2);
    crate::generators::regular(&mut storage, 2, None).expect("Could not generate grid");
    // prefer points close to the origin
    let distance = |storage: &SparseGridData, seq: usize| -> f64
    {
        let x = storage.unit_coordinate(seq);
        2.0 - x.iter().map(|x| x * x).sum::<f64>().sqrt()
    };
    let functor = UserDefinedRefinement::new(&distance, 1, 0.0);
    let created = BaseRefinement::default().free_refine(&mut storage, &functor).expect("refinement failed");
    assert_eq!(created.len(), 4);
    assert!(storage.contains(&GridPoint::new(&[1, 3], &[1, 1], true)));
    assert!(storage.contains(&GridPoint::new(&[2, 2], &[1, 1], true)));
}
