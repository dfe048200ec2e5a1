use comms::msg::{MinLoc, Msg, Payload};

use super::Reducible;

/// Whether `a` wins over `b` in a minloc reduction.
///
/// The lower value wins. Equal values go to the lower rank. NaN loses
/// against every number, two NaNs go to the lower rank.
pub fn beats(a: &MinLoc, b: &MinLoc) -> bool {
    match (a.value.is_nan(), b.value.is_nan()) {
        (false, true) => true,
        (true, false) => false,
        (true, true) => a.rank < b.rank,
        (false, false) => a.value < b.value || (a.value == b.value && a.rank < b.rank),
    }
}

impl Reducible for MinLoc {
    const KIND: &'static str = "data/minloc";

    fn to_msg(self) -> Msg<'static> {
        Msg::Data(Payload::MinLoc(self))
    }

    fn from_msg(msg: &Msg<'_>) -> Option<Self> {
        match msg {
            Msg::Data(Payload::MinLoc(minloc)) => Some(*minloc),
            _ => None,
        }
    }

    fn combine(self, other: Self) -> Self {
        if beats(&other, &self) { other } else { self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ml(value: f64, rank: usize) -> MinLoc {
        MinLoc { value, rank }
    }

    #[test]
    fn lower_value_wins() {
        assert_eq!(ml(2.0, 0).combine(ml(1.0, 5)), ml(1.0, 5));
        assert_eq!(ml(1.0, 5).combine(ml(2.0, 0)), ml(1.0, 5));
    }

    #[test]
    fn ties_go_to_the_lower_rank() {
        assert_eq!(ml(1.0, 3).combine(ml(1.0, 1)), ml(1.0, 1));
        assert_eq!(ml(1.0, 1).combine(ml(1.0, 3)), ml(1.0, 1));
    }

    #[test]
    fn signed_zeros_tie() {
        assert_eq!(ml(0.0, 2).combine(ml(-0.0, 4)).rank, 2);
        assert_eq!(ml(-0.0, 4).combine(ml(0.0, 2)).rank, 2);
    }

    #[test]
    fn nan_never_wins_against_numbers() {
        assert_eq!(ml(f64::NAN, 0).combine(ml(f64::INFINITY, 1)).rank, 1);
        assert_eq!(ml(f64::NAN, 3).combine(ml(f64::NAN, 1)).rank, 1);
    }

    #[test]
    fn fold_order_does_not_matter() {
        let values = [
            ml(3.0, 0),
            ml(-1.0, 1),
            ml(f64::NAN, 2),
            ml(-1.0, 3),
            ml(7.5, 4),
            ml(-1.0, 5),
        ];

        let forward = values.iter().copied().reduce(MinLoc::combine).unwrap();
        let backward = values.iter().rev().copied().reduce(MinLoc::combine).unwrap();
        let paired = values
            .chunks(2)
            .map(|pair| pair[0].combine(pair[1]))
            .reduce(MinLoc::combine)
            .unwrap();

        assert_eq!(forward, ml(-1.0, 1));
        assert_eq!(backward, forward);
        assert_eq!(paired, forward);
    }
}
