//! Transactional ordering engine. Every write to a question's position goes through here.

use crate::{
    error::{Error, Result},
    lock_form, Database,
};
use model::{
    order::{Shift, SENTINEL},
    Uuid,
};
use tokio_postgres::{types::ToSql, Transaction};

/// Slides every live question of form `$1` within `[$2, $3]` by `$4`.
const SHIFT_RANGE: &str = "UPDATE question SET position = position + $4, last_updated = now() \
                           WHERE form_id = $1 AND position BETWEEN $2 AND $3 AND NOT deleted";

/// Binds a planned shift to the placeholders of [`SHIFT_RANGE`].
fn range_params<'a>(form: &'a i32, shift: &'a Shift) -> [&'a (dyn ToSql + Sync); 4] {
    [form, &shift.lo, &shift.hi, &shift.delta]
}

/// Fails with [`Error::DuplicateOrder`] if a live question of the form already holds `order`.
pub(crate) async fn ensure_vacant(tx: &Transaction<'_>, form: i32, order: i32) -> Result<()> {
    let taken = tx
        .query_opt("SELECT 1 FROM question WHERE form_id = $1 AND position = $2 AND NOT deleted", &[&form, &order])
        .await?;
    match taken {
        Some(_) => Err(Error::DuplicateOrder),
        None => Ok(()),
    }
}

/// Moves one live question from `current` to `target` inside an already open transaction. The
/// caller must hold the form lock. Returns `false` for a no-op move, which writes nothing.
pub(crate) async fn shift(tx: &Transaction<'_>, form: i32, question: Uuid, current: i32, target: i32) -> Result<bool> {
    if target <= SENTINEL {
        return Err(model::rules::SchemaError::NonPositiveOrder(target).into());
    }

    let Some(plan) = Shift::plan(current, target) else {
        let row = tx
            .query_opt(
                "SELECT 1 FROM question WHERE id = $1 AND form_id = $2 AND position = $3 AND NOT deleted",
                &[&question, &form, &current],
            )
            .await?;
        return row.map(|_| false).ok_or(Error::QuestionNotFound);
    };

    tx.execute("SET CONSTRAINTS question_position_excl DEFERRED", &[]).await?;

    // Park the mover so that the range below may slide over its old slot.
    match tx
        .execute(
            "UPDATE question SET position = $4, last_updated = now() \
             WHERE id = $1 AND form_id = $2 AND position = $3 AND NOT deleted",
            &[&question, &form, &current, &SENTINEL],
        )
        .await?
    {
        1 => (),
        0 => return Err(Error::QuestionNotFound),
        _ => return Err(Error::Fatal),
    }

    let shifted = tx.execute(SHIFT_RANGE, &range_params(&form, &plan)).await?;

    tx.execute(
        "UPDATE question SET position = $2, last_updated = now() WHERE id = $1",
        &[&question, &target],
    )
    .await?;

    log::info!("moved question {question} of form {form} from {current} to {target}, shifting {shifted} others");
    Ok(true)
}

impl Database {
    /// Checks that `order` is free to claim in the given form. Creation never renumbers, so a
    /// collision is reported as [`Error::DuplicateOrder`].
    pub async fn create_question_order(&self, form: i32, order: i32) -> Result<()> {
        if order <= SENTINEL {
            return Err(model::rules::SchemaError::NonPositiveOrder(order).into());
        }

        let mut client = self.exclusive().await;
        let tx = client.transaction().await?;
        lock_form(&tx, form).await?;
        ensure_vacant(&tx, form, order).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Atomically moves a question to `target`, shifting the questions in between by one slot.
    /// Concurrent moves on the same form are serialized. Any failure rolls back the whole move.
    pub async fn move_question(&self, form: i32, question: Uuid, current: i32, target: i32) -> Result<bool> {
        let mut client = self.exclusive().await;
        let tx = client.transaction().await?;
        lock_form(&tx, form).await?;
        let moved = shift(&tx, form, question, current, target).await?;
        if moved {
            tx.commit().await?;
        }
        Ok(moved)
    }

    /// Applies every `(question, target)` pair as its own move. One failed item leaves the
    /// others in place. Outcomes come back in the order the pairs were given.
    pub async fn reorder(&self, pairs: &[(Uuid, i32)]) -> Vec<(Uuid, Result<bool>)> {
        let mut schedule: Vec<_> = pairs.iter().copied().enumerate().collect();
        schedule.sort_by_key(|&(_, (_, target))| target);

        let mut outcomes: Vec<_> = pairs.iter().map(|&(id, _)| (id, Err(Error::Fatal))).collect();
        for (index, (id, target)) in schedule {
            let outcome = self.relocate(id, target).await;
            if let Err(err) = &outcome {
                log::warn!("reorder of question {id} to {target} failed: {err}");
            }
            outcomes[index].1 = outcome;
        }
        outcomes
    }

    /// Moves a question to `target` when only its id is known.
    async fn relocate(&self, question: Uuid, target: i32) -> Result<bool> {
        let mut client = self.exclusive().await;
        let tx = client.transaction().await?;
        let row = tx
            .query_opt("SELECT form_id FROM question WHERE id = $1 AND NOT deleted", &[&question])
            .await?
            .ok_or(Error::QuestionNotFound)?;
        let form: i32 = row.try_get("form_id")?;
        lock_form(&tx, form).await?;

        // Re-read under the lock since a concurrent move may have shifted it.
        let row = tx
            .query_opt("SELECT position FROM question WHERE id = $1 AND NOT deleted FOR UPDATE", &[&question])
            .await?
            .ok_or(Error::QuestionNotFound)?;
        let current: i32 = row.try_get("position")?;

        let moved = shift(&tx, form, question, current, target).await?;
        if moved {
            tx.commit().await?;
        }
        Ok(moved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moving_down_binds_the_range_below_the_target() {
        // A B C D E, move B to 5
        let plan = Shift::plan(2, 5).unwrap();
        assert_eq!(format!("{:?}", range_params(&7, &plan)), "[7, 3, 5, -1]");
    }

    #[test]
    fn moving_up_binds_the_range_above_the_target() {
        // A B C D E, move D to 1
        let plan = Shift::plan(4, 1).unwrap();
        assert_eq!(format!("{:?}", range_params(&7, &plan)), "[7, 1, 3, 1]");
    }

    #[test]
    fn range_statement_shifts_only_live_rows_between_the_bounds() {
        assert!(SHIFT_RANGE.contains("SET position = position + $4"));
        assert!(SHIFT_RANGE.contains("WHERE form_id = $1 AND position BETWEEN $2 AND $3 AND NOT deleted"));
    }
}
