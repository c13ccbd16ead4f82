//! Range-shift planning for moving one question to a new position. Only the questions between
//! the old and new position are renumbered; everything outside the range keeps its order.

/// Position parked on the moving question while its neighbours shift. Author-supplied orders
/// start at 1, so no live question can already hold it.
pub const SENTINEL: i32 = 0;

/// A contiguous, inclusive range of positions that all move by the same `delta`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Shift {
    pub lo: i32,
    pub hi: i32,
    pub delta: i32,
}

impl Shift {
    /// Plans the renumbering needed to move a question from `current` to `target`. Returns
    /// `None` for a no-op move.
    ///
    /// Moving down closes the gap with `[current + 1, target]` shifted up by one slot. Moving
    /// up opens a gap with `[target, current - 1]` shifted down by one slot.
    pub const fn plan(current: i32, target: i32) -> Option<Self> {
        if target > current {
            Some(Self { lo: current + 1, hi: target, delta: -1 })
        } else if target < current {
            Some(Self { lo: target, hi: current - 1, delta: 1 })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::{tests::question, Question, QuestionType};
    use alloc::{collections::BTreeSet, vec::Vec};
    use uuid::Uuid;

    impl Shift {
        fn relabel(&self, position: i32) -> i32 {
            if self.lo <= position && position <= self.hi {
                position + self.delta
            } else {
                position
            }
        }
    }

    /// In-memory rendition of the transactional move, used to check the planner's ranges.
    fn move_within(questions: &mut [Question], id: Uuid, target: i32) -> Option<bool> {
        let index = questions.iter().position(|q| q.id == id && !q.deleted)?;
        let Some(shift) = Shift::plan(questions[index].order, target) else {
            return Some(false);
        };

        questions[index].order = SENTINEL;
        for question in questions.iter_mut().filter(|q| !q.deleted) {
            question.order = shift.relabel(question.order);
        }
        questions[index].order = target;
        Some(true)
    }

    fn form(orders: &[i32]) -> Vec<Question> {
        orders
            .iter()
            .enumerate()
            .map(|(i, &order)| {
                let mut q = question(QuestionType::TextInput, order);
                q.id = Uuid::from_u128(i as u128 + 1);
                q
            })
            .collect()
    }

    fn id(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn orders(questions: &[Question]) -> Vec<i32> {
        questions.iter().map(|q| q.order).collect()
    }

    fn live_orders_unique(questions: &[Question]) -> bool {
        let mut seen = BTreeSet::new();
        questions.iter().filter(|q| !q.deleted).all(|q| seen.insert(q.order))
    }

    #[test]
    fn plan_picks_range_and_direction() {
        assert_eq!(Shift::plan(2, 5), Some(Shift { lo: 3, hi: 5, delta: -1 }));
        assert_eq!(Shift::plan(4, 1), Some(Shift { lo: 1, hi: 3, delta: 1 }));
        assert_eq!(Shift::plan(3, 3), None);
    }

    #[test]
    fn relabel_leaves_outside_positions_alone() {
        let shift = Shift::plan(2, 5).unwrap();
        assert_eq!(shift.relabel(1), 1);
        assert_eq!(shift.relabel(3), 2);
        assert_eq!(shift.relabel(5), 4);
        assert_eq!(shift.relabel(6), 6);
    }

    #[test]
    fn moving_down_compresses_the_range() {
        // A B C D E, move B to 5
        let mut questions = form(&[1, 2, 3, 4, 5]);
        assert_eq!(move_within(&mut questions, id(2), 5), Some(true));
        assert_eq!(orders(&questions), [1, 5, 2, 3, 4]);
    }

    #[test]
    fn moving_up_expands_the_range() {
        // A B C D E, move D to 1
        let mut questions = form(&[1, 2, 3, 4, 5]);
        assert_eq!(move_within(&mut questions, id(4), 1), Some(true));
        assert_eq!(orders(&questions), [2, 3, 4, 1, 5]);
    }

    #[test]
    fn same_position_is_a_no_op() {
        let mut questions = form(&[1, 2, 3]);
        assert_eq!(move_within(&mut questions, id(2), 2), Some(false));
        assert_eq!(orders(&questions), [1, 2, 3]);
    }

    #[test]
    fn unknown_or_archived_question_is_not_found() {
        let mut questions = form(&[1, 2, 3]);
        assert_eq!(move_within(&mut questions, id(9), 1), None);
        questions[0].deleted = true;
        assert_eq!(move_within(&mut questions, id(1), 3), None);
    }

    #[test]
    fn archived_questions_keep_their_stale_order() {
        let mut questions = form(&[1, 2, 3, 4]);
        questions[2].deleted = true;
        assert_eq!(move_within(&mut questions, id(1), 4), Some(true));
        assert_eq!(orders(&questions), [4, 1, 3, 3]);
        assert!(live_orders_unique(&questions));
    }

    #[test]
    fn gaps_are_tolerated() {
        let mut questions = form(&[1, 4, 9]);
        assert_eq!(move_within(&mut questions, id(3), 2), Some(true));
        assert_eq!(orders(&questions), [1, 5, 2]);
        assert!(live_orders_unique(&questions));
    }

    #[test]
    fn every_move_preserves_uniqueness() {
        const SIZE: i32 = 6;
        for mover in 1..=SIZE {
            for target in 1..=SIZE + 2 {
                let mut questions = form(&[1, 2, 3, 4, 5, 6]);
                move_within(&mut questions, id(mover as u128), target).unwrap();
                assert!(live_orders_unique(&questions), "moving {mover} to {target}");
                assert_eq!(questions[mover as usize - 1].order, target);
            }
        }
    }

    #[test]
    fn sequence_of_moves_preserves_uniqueness() {
        let mut questions = form(&[1, 2, 3, 4, 5, 6, 7]);
        let moves = [(3, 7), (7, 1), (1, 4), (5, 5), (2, 6), (6, 2), (4, 3)];
        for (mover, target) in moves {
            move_within(&mut questions, id(mover), target).unwrap();
            assert!(live_orders_unique(&questions));
        }
    }
}
