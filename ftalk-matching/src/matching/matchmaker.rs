//! Session lifecycle state machine.
//!
//! States: `waiting -> matched -> active -> ended`, with `matched/active ->
//! waiting` on skip and `* -> ended` on end or block. Matching mutates two
//! session rows; every transition goes through the guarded updates in
//! [`crate::store::sessions`] so a concurrent writer loses cleanly (zero
//! rows affected) instead of corrupting the pairing. Store failures
//! propagate; there are no internal retries beyond re-running the pool
//! search after a lost claim.

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use ftalk_shared::errors::{AppError, AppResult, ErrorCode};

use crate::events::publisher;
use crate::matching::scorer::{self, CandidateProfile};
use crate::models::{
    ChatMatch, ChatMessage, ChatSession, NewChatBlock, NewChatMatch, NewChatMessage,
    NewChatReport, NewChatSession, SessionStatus,
};
use crate::store::{cache, sessions as store};
use crate::AppState;

/// How many times a lost optimistic claim re-runs the pool search before
/// giving up with "no match".
const MAX_MATCH_ATTEMPTS: usize = 3;

pub struct SessionCriteria {
    pub interests: Vec<String>,
    pub age_min: Option<i32>,
    pub age_max: Option<i32>,
    pub location: Option<String>,
    pub gender: Option<String>,
    pub chat_type: String,
}

pub struct MatchOutcome {
    pub match_record: ChatMatch,
    pub session: ChatSession,
    pub partner_session: ChatSession,
}

#[derive(Debug, Serialize)]
struct MatchedPayload {
    match_id: Uuid,
    session_id: Uuid,
    partner_session_id: Uuid,
    partner_id: Uuid,
    compatibility_score: f64,
    shared_interests: Vec<String>,
}

#[derive(Debug, Serialize)]
struct PartnerLeftPayload {
    session_id: Uuid,
    reason: String,
}

type PooledConn = diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<diesel::PgConnection>>;

fn db_conn(state: &AppState) -> AppResult<PooledConn> {
    state
        .db
        .get()
        .map_err(|e| AppError::internal(format!("database pool error: {e}")))
}

// ---------------------------------------------------------------------------
// create_session
// ---------------------------------------------------------------------------

pub async fn create_session(
    state: &AppState,
    user_id: Uuid,
    criteria: SessionCriteria,
) -> AppResult<ChatSession> {
    let mut conn = db_conn(state)?;

    if store::live_session_for_user(&mut conn, user_id)?.is_some() {
        return Err(AppError::new(
            ErrorCode::ActiveSessionExists,
            "you already have a live chat session",
        ));
    }

    let new_session = NewChatSession {
        user_id,
        interests: criteria.interests,
        age_min: criteria.age_min,
        age_max: criteria.age_max,
        location: criteria.location,
        gender: criteria.gender,
        chat_type: criteria.chat_type,
        status: SessionStatus::Waiting.as_str().to_string(),
    };

    let session = store::insert_session(&mut conn, &new_session)?;

    tracing::info!(
        session_id = %session.id,
        user_id = %user_id,
        chat_type = %session.chat_type,
        "chat session created"
    );

    Ok(session)
}

// ---------------------------------------------------------------------------
// find_match
// ---------------------------------------------------------------------------

pub async fn find_match(
    state: &AppState,
    session_id: Uuid,
    user_id: Uuid,
) -> AppResult<Option<MatchOutcome>> {
    // Serialize concurrent attempts by the same user; a second caller just
    // gets "no match yet" and retries.
    if !cache::acquire_match_lock(&state.redis, &user_id).await {
        return Ok(None);
    }

    let result = find_match_inner(state, session_id, user_id).await;
    cache::release_match_lock(&state.redis, &user_id).await;
    result
}

async fn find_match_inner(
    state: &AppState,
    session_id: Uuid,
    user_id: Uuid,
) -> AppResult<Option<MatchOutcome>> {
    let mut conn = db_conn(state)?;

    let session = store::get_session(&mut conn, session_id)?
        .ok_or_else(|| AppError::new(ErrorCode::SessionNotFound, "chat session not found"))?;

    if session.user_id != user_id {
        return Err(AppError::new(
            ErrorCode::NotSessionParticipant,
            "this session does not belong to you",
        ));
    }
    if session.status() != SessionStatus::Waiting {
        return Err(AppError::new(
            ErrorCode::SessionNotWaiting,
            "session is not waiting for a match",
        ));
    }

    let blocked = store::blocked_user_ids(&mut conn, user_id)?;
    let own_profile = CandidateProfile::from(&session);

    for attempt in 0..MAX_MATCH_ATTEMPTS {
        let pool = store::waiting_pool(&mut conn, &session, state.config.waiting_ttl_secs)?;

        let candidates: Vec<ChatSession> = pool
            .into_iter()
            .filter(|c| !blocked.contains(&c.user_id))
            .collect();

        let candidate_ids: Vec<Uuid> = candidates.iter().map(|c| c.user_id).collect();
        let cooldowns = cache::skip_cooldowns_batch(&state.redis, &user_id, &candidate_ids).await;

        let eligible: Vec<&ChatSession> = candidates
            .iter()
            .zip(cooldowns.iter())
            .filter(|(_, on_cooldown)| !**on_cooldown)
            .map(|(c, _)| c)
            .collect();

        let profiles: Vec<CandidateProfile> =
            eligible.iter().map(|c| CandidateProfile::from(*c)).collect();

        let Some((best_idx, best_score)) = scorer::select_best(&own_profile, &profiles) else {
            return Ok(None);
        };
        let candidate = eligible[best_idx];
        let now = Utc::now();

        // Claim the candidate first, then ourselves. Either claim can lose
        // to a concurrent matcher; affected-row count 0 tells us.
        if store::claim_waiting(&mut conn, candidate.id, user_id, now)? == 0 {
            tracing::debug!(
                attempt,
                candidate_session = %candidate.id,
                "candidate claimed by a concurrent matcher, re-searching"
            );
            continue;
        }

        if store::claim_waiting(&mut conn, session.id, candidate.user_id, now)? == 0 {
            // Our own session left `waiting` under us; undo the candidate
            // claim and report the conflict.
            store::release_claim(&mut conn, candidate.id)?;
            return Err(AppError::new(
                ErrorCode::SessionNotWaiting,
                "session was matched or ended by a concurrent request",
            ));
        }

        let shared = scorer::shared_interests(&own_profile, &profiles[best_idx]);
        let match_record = store::insert_match(
            &mut conn,
            &NewChatMatch {
                session_a_id: session.id,
                session_b_id: candidate.id,
                user_a_id: user_id,
                user_b_id: candidate.user_id,
                compatibility_score: best_score,
                shared_interests: shared.clone(),
            },
        )?;

        let refreshed = store::get_session(&mut conn, session.id)?
            .ok_or_else(|| AppError::new(ErrorCode::SessionNotFound, "chat session not found"))?;
        let partner_session = store::get_session(&mut conn, candidate.id)?
            .ok_or_else(|| AppError::new(ErrorCode::SessionNotFound, "partner session not found"))?;

        cache::set_active_pair(&state.redis, &match_record.id, &user_id, &candidate.user_id).await;

        let _ = state.io.to(format!("user:{user_id}")).emit(
            "matched",
            &MatchedPayload {
                match_id: match_record.id,
                session_id: session.id,
                partner_session_id: candidate.id,
                partner_id: candidate.user_id,
                compatibility_score: best_score,
                shared_interests: shared.clone(),
            },
        );
        let _ = state.io.to(format!("user:{}", candidate.user_id)).emit(
            "matched",
            &MatchedPayload {
                match_id: match_record.id,
                session_id: candidate.id,
                partner_session_id: session.id,
                partner_id: user_id,
                compatibility_score: best_score,
                shared_interests: shared,
            },
        );

        publisher::publish_session_matched(&state.rabbitmq, &match_record).await;

        tracing::info!(
            match_id = %match_record.id,
            session_a = %session.id,
            session_b = %candidate.id,
            score = best_score,
            "match committed"
        );

        return Ok(Some(MatchOutcome {
            match_record,
            session: refreshed,
            partner_session,
        }));
    }

    tracing::debug!(session_id = %session_id, "match attempts exhausted by races");
    Ok(None)
}

// ---------------------------------------------------------------------------
// skip_match
// ---------------------------------------------------------------------------

pub async fn skip_match(
    state: &AppState,
    session_id: Uuid,
    user_id: Uuid,
    reason: Option<String>,
) -> AppResult<ChatSession> {
    let mut conn = db_conn(state)?;

    let session = store::get_session(&mut conn, session_id)?
        .ok_or_else(|| AppError::new(ErrorCode::SessionNotFound, "chat session not found"))?;

    if session.user_id != user_id {
        return Err(AppError::new(
            ErrorCode::NotSessionParticipant,
            "this session does not belong to you",
        ));
    }

    match session.status() {
        SessionStatus::Ended => {
            return Err(AppError::new(ErrorCode::SessionEnded, "session has ended"));
        }
        // Nothing to skip; the session is already back in the pool.
        SessionStatus::Waiting => return Ok(session),
        SessionStatus::Matched | SessionStatus::Active => {}
    }

    let partner_id = session.matched_user_id;
    let partner_session = match partner_id {
        Some(pid) => store::linked_partner_session(&mut conn, pid, user_id)?,
        None => None,
    };

    store::reset_to_waiting(&mut conn, session.id)?;
    if let Some(ref ps) = partner_session {
        store::reset_to_waiting(&mut conn, ps.id)?;
    }

    if let Some(pid) = partner_id {
        cache::set_skip_cooldown(&state.redis, &user_id, &pid, state.config.skip_cooldown_secs).await;
        cache::clear_active_pair(&state.redis, &user_id, &pid).await;

        let _ = state.io.to(format!("user:{pid}")).emit(
            "partner_left",
            &PartnerLeftPayload {
                session_id: partner_session.as_ref().map(|p| p.id).unwrap_or(session.id),
                reason: "skipped".into(),
            },
        );
    }

    publisher::publish_session_skipped(
        &state.rabbitmq,
        session.id,
        partner_session.as_ref().map(|p| p.id),
        user_id,
        reason.clone(),
    )
    .await;

    tracing::info!(
        session_id = %session.id,
        user_id = %user_id,
        reason = reason.as_deref().unwrap_or("none"),
        "match skipped, both sides back to waiting"
    );

    let refreshed = store::get_session(&mut conn, session.id)?
        .ok_or_else(|| AppError::new(ErrorCode::SessionNotFound, "chat session not found"))?;
    Ok(refreshed)
}

// ---------------------------------------------------------------------------
// end_session
// ---------------------------------------------------------------------------

pub async fn end_session(state: &AppState, session_id: Uuid, user_id: Uuid) -> AppResult<ChatSession> {
    {
        // Ending is owner-only; blocking (below) may be done by either
        // participant.
        let mut conn = db_conn(state)?;
        let session = store::get_session(&mut conn, session_id)?
            .ok_or_else(|| AppError::new(ErrorCode::SessionNotFound, "chat session not found"))?;
        if session.user_id != user_id {
            return Err(AppError::new(
                ErrorCode::NotSessionParticipant,
                "this session does not belong to you",
            ));
        }
    }
    end_session_with_reason(state, session_id, user_id, "user_ended").await
}

async fn end_session_with_reason(
    state: &AppState,
    session_id: Uuid,
    user_id: Uuid,
    reason: &str,
) -> AppResult<ChatSession> {
    let mut conn = db_conn(state)?;

    let session = store::get_session(&mut conn, session_id)?
        .ok_or_else(|| AppError::new(ErrorCode::SessionNotFound, "chat session not found"))?;

    if !session.is_participant(user_id) {
        return Err(AppError::new(
            ErrorCode::NotSessionParticipant,
            "you are not a participant of this session",
        ));
    }

    // Ending twice is a no-op, not an error.
    if session.status() == SessionStatus::Ended {
        return Ok(session);
    }

    let now = Utc::now();
    store::end_session_row(&mut conn, session.id, now)?;

    // The other row of the pairing is owned by matched_user_id; end it too.
    let linked_session = match session.matched_user_id {
        Some(pid) => store::linked_partner_session(&mut conn, pid, session.user_id)?,
        None => None,
    };
    if let Some(ref ls) = linked_session {
        store::end_session_row(&mut conn, ls.id, now)?;
    }

    let duration_secs = (now - session.matched_at.unwrap_or(session.created_at)).num_seconds();

    if let Some(pid) = session.matched_user_id {
        cache::clear_active_pair(&state.redis, &session.user_id, &pid).await;
    }
    cache::clear_session_msgs(&state.redis, &session.id).await;

    // Tell the participant who didn't initiate the end.
    if let Some(other) = session.partner_id(user_id) {
        let other_session_id = if other == session.user_id {
            session.id
        } else {
            linked_session.as_ref().map(|l| l.id).unwrap_or(session.id)
        };
        let _ = state.io.to(format!("user:{other}")).emit(
            "partner_left",
            &PartnerLeftPayload {
                session_id: other_session_id,
                reason: reason.into(),
            },
        );
    }

    publisher::publish_session_ended(
        &state.rabbitmq,
        session.id,
        user_id,
        session.partner_id(user_id),
        duration_secs,
        reason,
    )
    .await;

    tracing::info!(
        session_id = %session.id,
        ended_by = %user_id,
        reason = reason,
        duration_secs,
        "chat session ended"
    );

    let refreshed = store::get_session(&mut conn, session.id)?
        .ok_or_else(|| AppError::new(ErrorCode::SessionNotFound, "chat session not found"))?;
    Ok(refreshed)
}

// ---------------------------------------------------------------------------
// Messaging
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatMessageEvent<'a> {
    session_id: Uuid,
    message: &'a ChatMessage,
}

pub async fn send_message(
    state: &AppState,
    session_id: Uuid,
    sender_id: Uuid,
    content: String,
    message_type: String,
) -> AppResult<ChatMessage> {
    let mut conn = db_conn(state)?;

    let session = store::get_session(&mut conn, session_id)?
        .ok_or_else(|| AppError::new(ErrorCode::SessionNotFound, "chat session not found"))?;

    if !session.is_participant(sender_id) {
        return Err(AppError::new(
            ErrorCode::NotSessionParticipant,
            "you are not a participant of this session",
        ));
    }

    match session.status() {
        SessionStatus::Ended => {
            return Err(AppError::new(ErrorCode::SessionEnded, "session has ended"));
        }
        SessionStatus::Waiting => {
            return Err(AppError::conflict("session has no partner yet"));
        }
        SessionStatus::Matched => {
            // Messaging is the activation signal; promote both rows. Losing
            // either promotion race to the partner is harmless.
            store::promote_to_active(&mut conn, session.id)?;
            if let Some(pid) = session.matched_user_id {
                if let Some(ps) = store::linked_partner_session(&mut conn, pid, session.user_id)? {
                    store::promote_to_active(&mut conn, ps.id)?;
                }
            }
        }
        SessionStatus::Active => {}
    }

    let message = store::insert_message(
        &mut conn,
        &NewChatMessage {
            session_id,
            sender_id,
            content,
            message_type,
        },
    )?;

    cache::increment_session_msgs(&state.redis, &session_id).await;

    let event = ChatMessageEvent {
        session_id,
        message: &message,
    };
    let _ = state.io.to(format!("session:{session_id}")).emit("chat_message", &event);
    if let Some(partner) = session.partner_id(sender_id) {
        let _ = state.io.to(format!("user:{partner}")).emit("chat_message", &event);
    }

    Ok(message)
}

pub async fn get_messages(
    state: &AppState,
    session_id: Uuid,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> AppResult<Vec<ChatMessage>> {
    let mut conn = db_conn(state)?;

    let session = store::get_session(&mut conn, session_id)?
        .ok_or_else(|| AppError::new(ErrorCode::SessionNotFound, "chat session not found"))?;

    if !session.is_participant(user_id) {
        return Err(AppError::new(
            ErrorCode::NotSessionParticipant,
            "you are not a participant of this session",
        ));
    }

    Ok(store::messages_page(&mut conn, session_id, limit.clamp(1, 100), offset.max(0))?)
}

// ---------------------------------------------------------------------------
// Safety: report / block
// ---------------------------------------------------------------------------

pub async fn report_user(
    state: &AppState,
    session_id: Uuid,
    reporter_id: Uuid,
    reason: String,
    description: Option<String>,
) -> AppResult<crate::models::ChatReport> {
    let mut conn = db_conn(state)?;

    let session = store::get_session(&mut conn, session_id)?
        .ok_or_else(|| AppError::new(ErrorCode::SessionNotFound, "chat session not found"))?;

    if !session.is_participant(reporter_id) {
        return Err(AppError::new(
            ErrorCode::NotSessionParticipant,
            "you are not a participant of this session",
        ));
    }

    let reported_id = session.partner_id(reporter_id).ok_or_else(|| {
        AppError::bad_request("session has no partner to report")
    })?;

    let report = store::insert_report(
        &mut conn,
        &NewChatReport {
            session_id,
            reporter_id,
            reported_id,
            reason,
            description,
        },
    )?;

    publisher::publish_report_created(&state.rabbitmq, &report).await;

    tracing::info!(
        report_id = %report.id,
        session_id = %session_id,
        reporter = %reporter_id,
        "user reported"
    );

    Ok(report)
}

pub async fn block_user(
    state: &AppState,
    session_id: Uuid,
    blocker_id: Uuid,
    blocked_id: Uuid,
    reason: Option<String>,
) -> AppResult<crate::models::ChatBlock> {
    if blocker_id == blocked_id {
        return Err(AppError::new(ErrorCode::CannotBlockSelf, "you cannot block yourself"));
    }

    let block = {
        let mut conn = db_conn(state)?;

        let session = store::get_session(&mut conn, session_id)?
            .ok_or_else(|| AppError::new(ErrorCode::SessionNotFound, "chat session not found"))?;

        if !session.is_participant(blocker_id) {
            return Err(AppError::new(
                ErrorCode::NotSessionParticipant,
                "you are not a participant of this session",
            ));
        }
        if !session.is_participant(blocked_id) {
            return Err(AppError::bad_request("blocked user is not part of this session"));
        }

        store::insert_block(
            &mut conn,
            &NewChatBlock {
                session_id,
                blocker_id,
                blocked_id,
                reason,
            },
        )?
    };

    // A block always terminates the session, whoever was blocked.
    end_session_with_reason(state, session_id, blocker_id, "blocked").await?;

    publisher::publish_block_created(&state.rabbitmq, &block).await;

    tracing::info!(
        block_id = %block.id,
        session_id = %session_id,
        blocker = %blocker_id,
        blocked = %blocked_id,
        "user blocked, session ended"
    );

    Ok(block)
}
