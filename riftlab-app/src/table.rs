use rand::Rng;
use rand::seq::SliceRandom;
use riftlab_core::{ExpectedAnswer, Side, TrialCondition};

/// Balanced trial table: the four cue-by-probe side combinations repeat in
/// turn up to `count`, then the whole table is shuffled once. The expected
/// answer is the probed side.
pub fn balanced<R: Rng>(count: usize, rng: &mut R) -> Vec<TrialCondition> {
    let combos = [
        (Side::Left, Side::Left),
        (Side::Left, Side::Right),
        (Side::Right, Side::Left),
        (Side::Right, Side::Right),
    ];
    let mut table: Vec<TrialCondition> = (0..count)
        .map(|i| {
            let (cued_side, probe_side) = combos[i % combos.len()];
            TrialCondition {
                cued_side,
                probe_side,
                expected: ExpectedAnswer::Side(probe_side),
            }
        })
        .collect();
    table.shuffle(rng);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn table_is_balanced_across_combinations() {
        let mut rng = StdRng::seed_from_u64(1);
        let table = balanced(20, &mut rng);
        assert_eq!(table.len(), 20);

        let left_cues = table.iter().filter(|c| c.cued_side == Side::Left).count();
        let left_probes = table.iter().filter(|c| c.probe_side == Side::Left).count();
        assert_eq!(left_cues, 10);
        assert_eq!(left_probes, 10);
    }

    #[test]
    fn expected_answer_tracks_the_probe_side() {
        let mut rng = StdRng::seed_from_u64(2);
        for condition in balanced(40, &mut rng) {
            assert_eq!(condition.expected, ExpectedAnswer::Side(condition.probe_side));
        }
    }
}
