use rusqlite::{Connection, Transaction, TransactionBehavior, params};

use super::pipeline::Outcome;
use super::staleness::WriteKind;
use crate::error::{WriteError, WriteStep};
use crate::model::Topic;

/// Persists a topic and everything it owns as one transaction.
///
/// Parents are written before children so foreign keys always resolve.
/// Rows missing from `topic` but present in the store are left alone.
pub fn write_topic(
    connection: &mut Connection,
    topic: &Topic,
    kind: WriteKind,
) -> Result<Outcome, WriteError> {
    let topic_id = topic.id;
    let fail = move |step: WriteStep| {
        move |source: rusqlite::Error| WriteError {
            topic_id,
            step,
            source,
        }
    };

    // IMMEDIATE takes the write lock up front; a deferred transaction could
    // hit SQLITE_BUSY halfway through while another worker holds it.
    let tx = connection
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(fail(WriteStep::Begin))?;

    upsert_profiles(&tx, topic).map_err(fail(WriteStep::Profiles))?;
    upsert_topic_row(&tx, topic).map_err(fail(WriteStep::Topic))?;
    upsert_comments(&tx, topic).map_err(|(step, source)| fail(step)(source))?;
    upsert_poll(&tx, topic).map_err(|(step, source)| fail(step)(source))?;

    tx.commit().map_err(fail(WriteStep::Commit))?;

    Ok(match kind {
        WriteKind::Create => Outcome::Created,
        WriteKind::Update => Outcome::Updated,
    })
}

fn upsert_profiles(tx: &Transaction<'_>, topic: &Topic) -> rusqlite::Result<()> {
    let mut statement = tx.prepare(
        "
        INSERT INTO profiles(id, first_name, last_name, screen_name, photo)
        VALUES(?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(id) DO UPDATE SET
          first_name=excluded.first_name,
          last_name=excluded.last_name,
          screen_name=excluded.screen_name,
          photo=excluded.photo
        ",
    )?;

    for profile in topic.participants().values() {
        statement.execute(params![
            profile.id,
            &profile.first_name,
            &profile.last_name,
            &profile.screen_name,
            &profile.photo
        ])?;
    }

    Ok(())
}

fn upsert_topic_row(tx: &Transaction<'_>, topic: &Topic) -> rusqlite::Result<()> {
    tx.execute(
        "
        INSERT INTO topics(id, title, is_closed, is_fixed, created_at, updated_at, created_by, updated_by)
        VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(id) DO UPDATE SET
          title=excluded.title,
          is_closed=excluded.is_closed,
          is_fixed=excluded.is_fixed,
          created_at=excluded.created_at,
          updated_at=excluded.updated_at,
          created_by=excluded.created_by,
          updated_by=excluded.updated_by
        ",
        params![
            topic.id,
            &topic.title,
            topic.is_closed,
            topic.is_fixed,
            topic.created_at,
            topic.updated_at,
            topic.created_by.id,
            topic.updated_by.id
        ],
    )?;
    Ok(())
}

// A comment keeps the topic it was first stored under.
fn upsert_comments(tx: &Transaction<'_>, topic: &Topic) -> Result<(), (WriteStep, rusqlite::Error)> {
    let at = |step: WriteStep| move |source: rusqlite::Error| (step, source);

    let mut comment_statement = tx
        .prepare(
            "
            INSERT INTO comments(id, from_id, date, text, likes, reply_to_uid, reply_to_cid, topic_id)
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
              from_id=excluded.from_id,
              date=excluded.date,
              text=excluded.text,
              likes=excluded.likes,
              reply_to_uid=excluded.reply_to_uid,
              reply_to_cid=excluded.reply_to_cid
            ",
        )
        .map_err(at(WriteStep::Comments))?;
    let mut attachment_statement = tx
        .prepare(
            "
            INSERT INTO attachments(content, comment_id)
            VALUES(?1, ?2)
            ON CONFLICT(comment_id, content) DO NOTHING
            ",
        )
        .map_err(at(WriteStep::Attachments))?;

    for comment in &topic.comments {
        comment_statement
            .execute(params![
                comment.id,
                comment.from_id,
                comment.date,
                &comment.text,
                comment.likes,
                comment.reply_to_uid,
                comment.reply_to_cid,
                topic.id
            ])
            .map_err(at(WriteStep::Comments))?;

        for attachment in &comment.attachments {
            attachment_statement
                .execute(params![attachment, comment.id])
                .map_err(at(WriteStep::Attachments))?;
        }
    }

    Ok(())
}

fn upsert_poll(tx: &Transaction<'_>, topic: &Topic) -> Result<(), (WriteStep, rusqlite::Error)> {
    let Some(poll) = &topic.poll else {
        return Ok(());
    };
    let at = |step: WriteStep| move |source: rusqlite::Error| (step, source);

    tx.execute(
        "
        INSERT INTO polls(id, question, votes, multiple, end_date, closed, topic_id)
        VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(id) DO UPDATE SET
          question=excluded.question,
          votes=excluded.votes,
          multiple=excluded.multiple,
          end_date=excluded.end_date,
          closed=excluded.closed
        ",
        params![
            poll.id,
            &poll.question,
            poll.votes,
            poll.multiple,
            poll.end_date,
            poll.closed,
            topic.id
        ],
    )
    .map_err(at(WriteStep::Poll))?;

    let mut answer_statement = tx
        .prepare(
            "
            INSERT INTO poll_answers(id, text, votes, rate, poll_id)
            VALUES(?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
              text=excluded.text,
              votes=excluded.votes,
              rate=excluded.rate
            ",
        )
        .map_err(at(WriteStep::PollAnswers))?;

    for answer in &poll.answers {
        answer_statement
            .execute(params![answer.id, &answer.text, answer.votes, answer.rate, poll.id])
            .map_err(at(WriteStep::PollAnswers))?;
    }

    Ok(())
}
