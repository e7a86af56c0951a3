//! `murmur history` subcommands.

use std::io::Write;

use murmur_store::{MessageRecord, SessionId, SessionRecord, Store, StoreError};

use crate::{CliError, clock::date_time};

/// Print every recorded session, newest first.
pub fn list<S: Store>(store: &S, out: &mut impl Write) -> Result<(), CliError> {
    let sessions = store.list_sessions()?;
    if sessions.is_empty() {
        writeln!(out, "no recorded sessions")?;
        return Ok(());
    }

    for session in &sessions {
        writeln!(out, "{}", session_line(session))?;
    }
    Ok(())
}

/// Print one session and its transcript.
pub fn show<S: Store>(store: &S, id: SessionId, out: &mut impl Write) -> Result<(), CliError> {
    let session = store.session(id)?.ok_or(StoreError::SessionNotFound(id))?;
    writeln!(out, "{}", session_line(&session))?;

    for message in store.session_history(id)? {
        writeln!(out, "  {}", message_line(&message))?;
    }
    Ok(())
}

/// Print lines containing `keyword`, newest first.
pub fn search<S: Store>(store: &S, keyword: &str, out: &mut impl Write) -> Result<(), CliError> {
    let hits = store.search_messages(keyword)?;
    if hits.is_empty() {
        writeln!(out, "no lines match {keyword:?}")?;
        return Ok(());
    }

    for hit in &hits {
        writeln!(
            out,
            "#{} {} {}:{} {}",
            hit.message.session_id,
            hit.role,
            hit.host,
            hit.port,
            message_line(&hit.message)
        )?;
    }
    Ok(())
}

/// Delete a session and its transcript.
pub fn delete<S: Store>(store: &S, id: SessionId, out: &mut impl Write) -> Result<(), CliError> {
    if !store.delete_session(id)? {
        return Err(StoreError::SessionNotFound(id).into());
    }
    writeln!(out, "deleted session {id}")?;
    Ok(())
}

fn session_line(session: &SessionRecord) -> String {
    let ended = session.ended_at_secs.map_or_else(|| "-".to_string(), date_time);
    format!(
        "#{} {} {}:{} started {} ended {} ({})",
        session.id,
        session.role,
        session.host,
        session.port,
        date_time(session.started_at_secs),
        ended,
        session.status
    )
}

fn message_line(message: &MessageRecord) -> String {
    format!(
        "[{}] [{}] {}: {}",
        date_time(message.timestamp_secs),
        message.kind,
        message.sender,
        message.text
    )
}
