//! Weighted winner draw and the decorative reel built around it.
//!
//! The winner is drawn first. The reel is then filled with uniformly random
//! candidates and the winner is written at the landing index, so the scroll
//! only ever shows an outcome that is already fixed.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use super::Candidate;

/// Minimum number of reel entries that scroll past before the winner.
pub const MIN_LEAD: usize = 30;
/// Random extra spin on top of [`MIN_LEAD`].
pub const MAX_EXTRA_SPIN: usize = 12;
/// Entries drawn after the winner so the reel does not end at the pointer.
pub const TAIL: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReelPlan {
    /// Candidate indices in scroll order.
    pub reel: Vec<usize>,
    /// Index into `reel` where the pointer stops.
    pub landing: usize,
}

/// Draw the winning candidate index by weight.
///
/// Falls back to a uniform draw when every weight is zero or invalid.
pub fn pick_winner<R: Rng + ?Sized>(candidates: &[Candidate], rng: &mut R) -> Option<usize> {
    if candidates.is_empty() {
        return None;
    }
    match WeightedIndex::new(candidates.iter().map(|c| c.weight)) {
        Ok(dist) => Some(dist.sample(rng)),
        Err(_) => Some(rng.gen_range(0..candidates.len())),
    }
}

/// Build a reel of `len` candidates that lands on `winner`.
pub fn plan_reel<R: Rng + ?Sized>(len: usize, winner: usize, rng: &mut R) -> ReelPlan {
    let landing = MIN_LEAD + rng.gen_range(0..=MAX_EXTRA_SPIN);
    let mut reel: Vec<usize> = (0..landing + 1 + TAIL).map(|_| rng.gen_range(0..len)).collect();
    reel[landing] = winner;
    ReelPlan { reel, landing }
}

/// Entry shown while the reel idles before a roll.
pub fn idle_pick<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Option<usize> {
    (len > 0).then(|| rng.gen_range(0..len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CandidateKind;
    use crate::model::BonusType;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn cand(t: BonusType, weight: f64) -> Candidate {
        Candidate { kind: CandidateKind::Card(t), weight }
    }

    #[test]
    fn reel_always_lands_on_winner() {
        let mut rng = StdRng::seed_from_u64(7);
        for winner in 0..5 {
            let plan = plan_reel(5, winner, &mut rng);
            assert_eq!(plan.reel[plan.landing], winner);
            assert!(plan.landing >= MIN_LEAD);
            assert_eq!(plan.reel.len(), plan.landing + 1 + TAIL);
            assert!(plan.reel.iter().all(|&i| i < 5));
        }
    }

    #[test]
    fn zero_weight_never_wins() {
        let mut rng = StdRng::seed_from_u64(42);
        let pool = vec![cand(BonusType::EvadeMapTax, 0.0), cand(BonusType::RerollGame, 1.0)];
        for _ in 0..200 {
            assert_eq!(pick_winner(&pool, &mut rng), Some(1));
        }
    }

    #[test]
    fn weights_shape_the_distribution() {
        let mut rng = StdRng::seed_from_u64(1);
        let pool = vec![cand(BonusType::EvadeMapTax, 9.0), cand(BonusType::RerollGame, 1.0)];
        let heavy = (0..2000).filter(|_| pick_winner(&pool, &mut rng) == Some(0)).count();
        assert!(heavy > 1600, "heavy candidate won {heavy} of 2000");
    }

    #[test]
    fn all_zero_weights_fall_back_to_uniform() {
        let mut rng = StdRng::seed_from_u64(3);
        let pool = vec![cand(BonusType::EvadeMapTax, 0.0), cand(BonusType::RerollGame, 0.0)];
        assert!(pick_winner(&pool, &mut rng).is_some());
        assert_eq!(pick_winner(&[], &mut rng), None);
        assert_eq!(idle_pick(0, &mut rng), None);
    }
}
