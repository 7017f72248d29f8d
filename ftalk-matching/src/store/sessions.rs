//! Relational store for chat sessions and their satellite records.
//!
//! Every status transition is a guarded update (`WHERE status = ...`)
//! returning the affected-row count. A zero-row result means a concurrent
//! writer got there first; callers decide whether that is a retry, a no-op
//! or an error. The database is the source of truth — the Redis mirror in
//! [`super::cache`] is only an accelerator.

use chrono::{DateTime, Duration, Utc};
use diesel::dsl::count_star;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::models::{
    CallSession, ChatBlock, ChatMatch, ChatMessage, ChatPreferences, ChatReport, ChatSession,
    NewCallSession, NewChatBlock, NewChatMatch, NewChatMessage, NewChatReport, NewChatSession,
    SessionStatus, UpsertChatPreferences,
};
use crate::schema::{
    call_sessions, chat_blocks, chat_matches, chat_messages, chat_preferences, chat_reports,
    chat_sessions,
};

// --- Sessions ---

pub fn insert_session(conn: &mut PgConnection, new_session: &NewChatSession) -> QueryResult<ChatSession> {
    diesel::insert_into(chat_sessions::table)
        .values(new_session)
        .get_result(conn)
}

pub fn get_session(conn: &mut PgConnection, session_id: Uuid) -> QueryResult<Option<ChatSession>> {
    chat_sessions::table
        .find(session_id)
        .first::<ChatSession>(conn)
        .optional()
}

/// The user's current live session (waiting, matched or active), if any.
pub fn live_session_for_user(conn: &mut PgConnection, user_id: Uuid) -> QueryResult<Option<ChatSession>> {
    chat_sessions::table
        .filter(chat_sessions::user_id.eq(user_id))
        .filter(chat_sessions::status.eq_any(SessionStatus::LIVE))
        .order(chat_sessions::created_at.desc())
        .first::<ChatSession>(conn)
        .optional()
}

/// Other waiting sessions eligible to be paired with `session`: same chat
/// type, at least one shared interest, and not older than the waiting TTL.
/// Oldest first, so long-waiting users win score ties.
pub fn waiting_pool(
    conn: &mut PgConnection,
    session: &ChatSession,
    waiting_ttl_secs: i64,
) -> QueryResult<Vec<ChatSession>> {
    let freshness_floor = Utc::now() - Duration::seconds(waiting_ttl_secs);

    chat_sessions::table
        .filter(chat_sessions::status.eq(SessionStatus::Waiting.as_str()))
        .filter(chat_sessions::id.ne(session.id))
        .filter(chat_sessions::user_id.ne(session.user_id))
        .filter(chat_sessions::chat_type.eq(&session.chat_type))
        .filter(chat_sessions::interests.overlaps_with(&session.interests))
        .filter(chat_sessions::created_at.gt(freshness_floor))
        .order(chat_sessions::created_at.asc())
        .load::<ChatSession>(conn)
}

/// The partner's own session row in a live pairing with `user_id`.
pub fn linked_partner_session(
    conn: &mut PgConnection,
    partner_id: Uuid,
    user_id: Uuid,
) -> QueryResult<Option<ChatSession>> {
    chat_sessions::table
        .filter(chat_sessions::user_id.eq(partner_id))
        .filter(chat_sessions::matched_user_id.eq(user_id))
        .filter(chat_sessions::status.eq_any([
            SessionStatus::Matched.as_str(),
            SessionStatus::Active.as_str(),
        ]))
        .first::<ChatSession>(conn)
        .optional()
}

/// Transition `waiting -> matched`, claiming the row for `partner_user_id`.
/// Zero rows affected = lost the race.
pub fn claim_waiting(
    conn: &mut PgConnection,
    session_id: Uuid,
    partner_user_id: Uuid,
    matched_at: DateTime<Utc>,
) -> QueryResult<usize> {
    diesel::update(
        chat_sessions::table
            .find(session_id)
            .filter(chat_sessions::status.eq(SessionStatus::Waiting.as_str())),
    )
    .set((
        chat_sessions::status.eq(SessionStatus::Matched.as_str()),
        chat_sessions::matched_user_id.eq(Some(partner_user_id)),
        chat_sessions::matched_at.eq(Some(matched_at)),
    ))
    .execute(conn)
}

/// Roll a freshly claimed row back to `waiting`. Only touches rows still in
/// `matched` so it cannot clobber a session the partner already activated.
pub fn release_claim(conn: &mut PgConnection, session_id: Uuid) -> QueryResult<usize> {
    diesel::update(
        chat_sessions::table
            .find(session_id)
            .filter(chat_sessions::status.eq(SessionStatus::Matched.as_str())),
    )
    .set((
        chat_sessions::status.eq(SessionStatus::Waiting.as_str()),
        chat_sessions::matched_user_id.eq(None::<Uuid>),
        chat_sessions::matched_at.eq(None::<DateTime<Utc>>),
    ))
    .execute(conn)
}

/// Skip: `matched|active -> waiting` with cleared match fields.
pub fn reset_to_waiting(conn: &mut PgConnection, session_id: Uuid) -> QueryResult<usize> {
    diesel::update(
        chat_sessions::table
            .find(session_id)
            .filter(chat_sessions::status.eq_any([
                SessionStatus::Matched.as_str(),
                SessionStatus::Active.as_str(),
            ])),
    )
    .set((
        chat_sessions::status.eq(SessionStatus::Waiting.as_str()),
        chat_sessions::matched_user_id.eq(None::<Uuid>),
        chat_sessions::matched_at.eq(None::<DateTime<Utc>>),
    ))
    .execute(conn)
}

/// Terminal transition. Zero rows affected = the session was already ended,
/// which callers treat as an idempotent no-op.
pub fn end_session_row(
    conn: &mut PgConnection,
    session_id: Uuid,
    ended_at: DateTime<Utc>,
) -> QueryResult<usize> {
    diesel::update(
        chat_sessions::table
            .find(session_id)
            .filter(chat_sessions::status.ne(SessionStatus::Ended.as_str())),
    )
    .set((
        chat_sessions::status.eq(SessionStatus::Ended.as_str()),
        chat_sessions::ended_at.eq(Some(ended_at)),
    ))
    .execute(conn)
}

/// First-message promotion, `matched -> active`. Losing this race to the
/// partner's first message is fine; the caller only needs the session to be
/// active afterwards.
pub fn promote_to_active(conn: &mut PgConnection, session_id: Uuid) -> QueryResult<usize> {
    diesel::update(
        chat_sessions::table
            .find(session_id)
            .filter(chat_sessions::status.eq(SessionStatus::Matched.as_str())),
    )
    .set(chat_sessions::status.eq(SessionStatus::Active.as_str()))
    .execute(conn)
}

// --- Matches ---

pub fn insert_match(conn: &mut PgConnection, new_match: &NewChatMatch) -> QueryResult<ChatMatch> {
    diesel::insert_into(chat_matches::table)
        .values(new_match)
        .get_result(conn)
}

// --- Messages ---

pub fn insert_message(conn: &mut PgConnection, new_message: &NewChatMessage) -> QueryResult<ChatMessage> {
    diesel::insert_into(chat_messages::table)
        .values(new_message)
        .get_result(conn)
}

pub fn messages_page(
    conn: &mut PgConnection,
    session_id: Uuid,
    limit: i64,
    offset: i64,
) -> QueryResult<Vec<ChatMessage>> {
    chat_messages::table
        .filter(chat_messages::session_id.eq(session_id))
        .order(chat_messages::created_at.asc())
        .offset(offset)
        .limit(limit)
        .load::<ChatMessage>(conn)
}

// --- Preferences ---

pub fn get_preferences(conn: &mut PgConnection, user_id: Uuid) -> QueryResult<Option<ChatPreferences>> {
    chat_preferences::table
        .find(user_id)
        .first::<ChatPreferences>(conn)
        .optional()
}

pub fn upsert_preferences(
    conn: &mut PgConnection,
    prefs: &UpsertChatPreferences,
) -> QueryResult<ChatPreferences> {
    diesel::insert_into(chat_preferences::table)
        .values(prefs)
        .on_conflict(chat_preferences::user_id)
        .do_update()
        .set(prefs)
        .get_result(conn)
}

// --- Safety records ---

pub fn insert_report(conn: &mut PgConnection, new_report: &NewChatReport) -> QueryResult<ChatReport> {
    diesel::insert_into(chat_reports::table)
        .values(new_report)
        .get_result(conn)
}

pub fn insert_block(conn: &mut PgConnection, new_block: &NewChatBlock) -> QueryResult<ChatBlock> {
    diesel::insert_into(chat_blocks::table)
        .values(new_block)
        .get_result(conn)
}

/// Everyone this user has blocked, or been blocked by. Used as a hard
/// exclusion when filtering match candidates.
pub fn blocked_user_ids(conn: &mut PgConnection, user_id: Uuid) -> QueryResult<Vec<Uuid>> {
    let mut blocked: Vec<Uuid> = chat_blocks::table
        .filter(chat_blocks::blocker_id.eq(user_id))
        .select(chat_blocks::blocked_id)
        .load::<Uuid>(conn)?;

    let blocked_by: Vec<Uuid> = chat_blocks::table
        .filter(chat_blocks::blocked_id.eq(user_id))
        .select(chat_blocks::blocker_id)
        .load::<Uuid>(conn)?;

    blocked.extend(blocked_by);
    blocked.sort_unstable();
    blocked.dedup();
    Ok(blocked)
}

// --- History & stats ---

pub fn ended_sessions_page(
    conn: &mut PgConnection,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> QueryResult<(Vec<ChatSession>, i64)> {
    let total: i64 = chat_sessions::table
        .filter(chat_sessions::user_id.eq(user_id))
        .filter(chat_sessions::status.eq(SessionStatus::Ended.as_str()))
        .select(count_star())
        .first(conn)?;

    let items = chat_sessions::table
        .filter(chat_sessions::user_id.eq(user_id))
        .filter(chat_sessions::status.eq(SessionStatus::Ended.as_str()))
        .order(chat_sessions::created_at.desc())
        .offset(offset)
        .limit(limit)
        .load::<ChatSession>(conn)?;

    Ok((items, total))
}

pub struct UserChatStats {
    pub total_sessions: i64,
    pub total_matches: i64,
    pub messages_sent: i64,
}

pub fn user_stats(conn: &mut PgConnection, user_id: Uuid) -> QueryResult<UserChatStats> {
    let total_sessions: i64 = chat_sessions::table
        .filter(chat_sessions::user_id.eq(user_id))
        .select(count_star())
        .first(conn)?;

    let total_matches: i64 = chat_matches::table
        .filter(
            chat_matches::user_a_id
                .eq(user_id)
                .or(chat_matches::user_b_id.eq(user_id)),
        )
        .select(count_star())
        .first(conn)?;

    let messages_sent: i64 = chat_messages::table
        .filter(chat_messages::sender_id.eq(user_id))
        .select(count_star())
        .first(conn)?;

    Ok(UserChatStats {
        total_sessions,
        total_matches,
        messages_sent,
    })
}

/// Number of sessions currently live, backing the online counter.
pub fn live_session_count(conn: &mut PgConnection) -> QueryResult<i64> {
    chat_sessions::table
        .filter(chat_sessions::status.eq_any(SessionStatus::LIVE))
        .select(count_star())
        .first(conn)
}

// --- Calls ---

pub fn insert_call(conn: &mut PgConnection, new_call: &NewCallSession) -> QueryResult<CallSession> {
    diesel::insert_into(call_sessions::table)
        .values(new_call)
        .get_result(conn)
}

pub fn get_call(conn: &mut PgConnection, call_id: Uuid) -> QueryResult<Option<CallSession>> {
    call_sessions::table
        .find(call_id)
        .first::<CallSession>(conn)
        .optional()
}

/// An unterminated call already bound to this chat session, if any.
/// Calls are 1:1 with their chat session while live.
pub fn open_call_for_session(
    conn: &mut PgConnection,
    chat_session_id: Uuid,
) -> QueryResult<Option<CallSession>> {
    call_sessions::table
        .filter(call_sessions::chat_session_id.eq(chat_session_id))
        .filter(call_sessions::status.ne("ended"))
        .first::<CallSession>(conn)
        .optional()
}

pub fn pending_calls_for(
    conn: &mut PgConnection,
    callee_id: Uuid,
    now: DateTime<Utc>,
) -> QueryResult<Vec<CallSession>> {
    call_sessions::table
        .filter(call_sessions::callee_id.eq(callee_id))
        .filter(call_sessions::status.eq_any(["initiated", "ringing"]))
        .filter(call_sessions::expires_at.gt(now))
        .order(call_sessions::created_at.desc())
        .load::<CallSession>(conn)
}

/// `initiated -> ringing`, guarded.
pub fn mark_call_ringing(conn: &mut PgConnection, call_id: Uuid) -> QueryResult<usize> {
    diesel::update(
        call_sessions::table
            .find(call_id)
            .filter(call_sessions::status.eq("initiated")),
    )
    .set(call_sessions::status.eq("ringing"))
    .execute(conn)
}

/// Answer: `initiated|ringing -> active|ended`, guarded.
pub fn answer_call(
    conn: &mut PgConnection,
    call_id: Uuid,
    accepted: bool,
    now: DateTime<Utc>,
) -> QueryResult<Option<CallSession>> {
    let new_status = if accepted { "active" } else { "ended" };
    let ended_at = if accepted { None } else { Some(now) };

    diesel::update(
        call_sessions::table
            .find(call_id)
            .filter(call_sessions::status.eq_any(["initiated", "ringing"])),
    )
    .set((
        call_sessions::status.eq(new_status),
        call_sessions::responded_at.eq(Some(now)),
        call_sessions::ended_at.eq(ended_at),
    ))
    .get_result::<CallSession>(conn)
    .optional()
}

pub fn end_call_row(conn: &mut PgConnection, call_id: Uuid, now: DateTime<Utc>) -> QueryResult<usize> {
    diesel::update(
        call_sessions::table
            .find(call_id)
            .filter(call_sessions::status.ne("ended")),
    )
    .set((
        call_sessions::status.eq("ended"),
        call_sessions::ended_at.eq(Some(now)),
    ))
    .execute(conn)
}

pub fn expire_call_row(conn: &mut PgConnection, call_id: Uuid, now: DateTime<Utc>) -> QueryResult<usize> {
    diesel::update(
        call_sessions::table
            .find(call_id)
            .filter(call_sessions::status.eq_any(["initiated", "ringing"])),
    )
    .set((
        call_sessions::status.eq("ended"),
        call_sessions::ended_at.eq(Some(now)),
    ))
    .execute(conn)
}
