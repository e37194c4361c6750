use sqlx::Row;
use trail_core::model::{
    CheckpointId, CheckpointOutcome, OutcomeKind, QuizResult, QuizTally, TrailId, VideoId,
};

use crate::repository::{OutcomeRow, QuizResultRow, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn usize_to_i64(field: &'static str, v: usize) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn bool_from_i64(field: &'static str, v: i64) -> Result<bool, StorageError> {
    match v {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(StorageError::Serialization(format!("invalid {field}: {v}"))),
    }
}

/// Split an outcome kind into its `(kind, selected_answer, is_correct)` columns.
pub(crate) fn kind_columns(kind: OutcomeKind) -> Result<(&'static str, Option<i64>, i64), StorageError> {
    match kind {
        OutcomeKind::Answered { selected, correct } => Ok((
            kind.label(),
            Some(usize_to_i64("selected_answer", selected)?),
            i64::from(correct),
        )),
        OutcomeKind::Skipped => Ok((kind.label(), None, 0)),
    }
}

pub(crate) fn parse_kind(
    kind: &str,
    selected: Option<i64>,
    is_correct: i64,
) -> Result<OutcomeKind, StorageError> {
    match kind {
        "answered" => {
            let selected = selected
                .ok_or_else(|| ser("answered outcome without selected_answer"))
                .and_then(|v| {
                    usize::try_from(v)
                        .map_err(|_| ser(format!("invalid selected_answer: {v}")))
                })?;
            Ok(OutcomeKind::Answered {
                selected,
                correct: bool_from_i64("is_correct", is_correct)?,
            })
        }
        "skipped" => Ok(OutcomeKind::Skipped),
        other => Err(ser(format!("invalid outcome kind: {other}"))),
    }
}

pub(crate) fn map_outcome_row(row: &sqlx::sqlite::SqliteRow) -> Result<OutcomeRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let checkpoint_id = CheckpointId::new(row.try_get::<String, _>("checkpoint_id").map_err(ser)?)
        .map_err(ser)?;
    let video_id =
        VideoId::new(row.try_get::<String, _>("video_id").map_err(ser)?).map_err(ser)?;
    let trail_id = row
        .try_get::<Option<String>, _>("trail_id")
        .map_err(ser)?
        .map(TrailId::new)
        .transpose()
        .map_err(ser)?;
    let kind = parse_kind(
        &row.try_get::<String, _>("kind").map_err(ser)?,
        row.try_get("selected_answer").map_err(ser)?,
        row.try_get("is_correct").map_err(ser)?,
    )?;

    let outcome = CheckpointOutcome {
        checkpoint_id,
        video_id,
        trail_id,
        kind,
        recorded_at: row.try_get("recorded_at").map_err(ser)?,
        synced: bool_from_i64("synced", row.try_get("synced").map_err(ser)?)?,
        score_impact: row.try_get("score_impact").map_err(ser)?,
    };

    Ok(OutcomeRow { id, outcome })
}

pub(crate) fn map_quiz_result(row: &sqlx::sqlite::SqliteRow) -> Result<QuizResult, StorageError> {
    let video_id =
        VideoId::new(row.try_get::<String, _>("video_id").map_err(ser)?).map_err(ser)?;
    let trail_id = row
        .try_get::<Option<String>, _>("trail_id")
        .map_err(ser)?
        .map(TrailId::new)
        .transpose()
        .map_err(ser)?;
    let count = |field: &'static str| -> Result<u32, StorageError> {
        u32_from_i64(field, row.try_get::<i64, _>(field).map_err(ser)?)
    };
    let tally = QuizTally {
        score: count("score")?,
        total_points: count("total_points")?,
        correct_first_try: count("correct_first_try")?,
        correct_second_try: count("correct_second_try")?,
        exhausted: count("exhausted")?,
        exercises_passed: count("exercises_passed")?,
        total_items: count("total_items")?,
    };
    let completed_at = row.try_get("completed_at").map_err(ser)?;

    QuizResult::new(video_id, trail_id, tally, completed_at).map_err(ser)
}

pub(crate) fn map_quiz_result_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<QuizResultRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    Ok(QuizResultRow {
        id,
        result: map_quiz_result(row)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_columns_round_trip() {
        let answered = OutcomeKind::Answered {
            selected: 3,
            correct: true,
        };
        let (label, selected, correct) = kind_columns(answered).unwrap();
        assert_eq!(parse_kind(label, selected, correct).unwrap(), answered);

        let (label, selected, correct) = kind_columns(OutcomeKind::Skipped).unwrap();
        assert_eq!(
            parse_kind(label, selected, correct).unwrap(),
            OutcomeKind::Skipped
        );
    }

    #[test]
    fn parse_kind_rejects_garbage() {
        assert!(parse_kind("answered", None, 1).is_err());
        assert!(parse_kind("answered", Some(-1), 0).is_err());
        assert!(parse_kind("answered", Some(1), 2).is_err());
        assert!(parse_kind("paused", None, 0).is_err());
    }
}
