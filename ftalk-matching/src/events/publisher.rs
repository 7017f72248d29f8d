use uuid::Uuid;

use ftalk_shared::clients::rabbitmq::RabbitMQClient;
use ftalk_shared::types::event::{payloads, routing_keys, Event};

use crate::models::{CallSession, ChatBlock, ChatMatch, ChatReport};

pub async fn publish_session_matched(rabbitmq: &RabbitMQClient, record: &ChatMatch) {
    let event = Event::new(
        "ftalk-matching",
        routing_keys::CHAT_SESSION_MATCHED,
        payloads::SessionMatched {
            match_id: record.id,
            session_a_id: record.session_a_id,
            session_b_id: record.session_b_id,
            user_a_id: record.user_a_id,
            user_b_id: record.user_b_id,
            compatibility_score: record.compatibility_score,
        },
    )
    .with_user(record.user_a_id);

    if let Err(e) = rabbitmq.publish(routing_keys::CHAT_SESSION_MATCHED, &event).await {
        tracing::error!(error = %e, "failed to publish session.matched event");
    }
}

pub async fn publish_session_skipped(
    rabbitmq: &RabbitMQClient,
    session_id: Uuid,
    partner_session_id: Option<Uuid>,
    skipped_by: Uuid,
    reason: Option<String>,
) {
    let event = Event::new(
        "ftalk-matching",
        routing_keys::CHAT_SESSION_SKIPPED,
        payloads::SessionSkipped {
            session_id,
            partner_session_id,
            skipped_by,
            reason,
        },
    )
    .with_user(skipped_by);

    if let Err(e) = rabbitmq.publish(routing_keys::CHAT_SESSION_SKIPPED, &event).await {
        tracing::error!(error = %e, "failed to publish session.skipped event");
    }
}

pub async fn publish_session_ended(
    rabbitmq: &RabbitMQClient,
    session_id: Uuid,
    ended_by: Uuid,
    partner_id: Option<Uuid>,
    duration_secs: i64,
    end_reason: &str,
) {
    let event = Event::new(
        "ftalk-matching",
        routing_keys::CHAT_SESSION_ENDED,
        payloads::SessionEnded {
            session_id,
            ended_by,
            partner_id,
            duration_secs,
            end_reason: end_reason.to_string(),
        },
    )
    .with_user(ended_by);

    if let Err(e) = rabbitmq.publish(routing_keys::CHAT_SESSION_ENDED, &event).await {
        tracing::error!(error = %e, "failed to publish session.ended event");
    }
}

pub async fn publish_report_created(rabbitmq: &RabbitMQClient, report: &ChatReport) {
    let event = Event::new(
        "ftalk-matching",
        routing_keys::CHAT_REPORT_CREATED,
        payloads::ReportCreated {
            report_id: report.id,
            session_id: report.session_id,
            reporter_id: report.reporter_id,
            reported_id: report.reported_id,
            reason: report.reason.clone(),
        },
    )
    .with_user(report.reporter_id);

    if let Err(e) = rabbitmq.publish(routing_keys::CHAT_REPORT_CREATED, &event).await {
        tracing::error!(error = %e, "failed to publish report.created event");
    }
}

pub async fn publish_block_created(rabbitmq: &RabbitMQClient, block: &ChatBlock) {
    let event = Event::new(
        "ftalk-matching",
        routing_keys::CHAT_BLOCK_CREATED,
        payloads::BlockCreated {
            block_id: block.id,
            session_id: block.session_id,
            blocker_id: block.blocker_id,
            blocked_id: block.blocked_id,
        },
    )
    .with_user(block.blocker_id);

    if let Err(e) = rabbitmq.publish(routing_keys::CHAT_BLOCK_CREATED, &event).await {
        tracing::error!(error = %e, "failed to publish block.created event");
    }
}

pub async fn publish_call_requested(rabbitmq: &RabbitMQClient, call: &CallSession) {
    let event = Event::new(
        "ftalk-matching",
        routing_keys::CHAT_CALL_REQUESTED,
        payloads::CallRequested {
            call_id: call.id,
            chat_session_id: call.chat_session_id,
            caller_id: call.caller_id,
            callee_id: call.callee_id,
            call_type: call.call_type.clone(),
        },
    )
    .with_user(call.caller_id);

    if let Err(e) = rabbitmq.publish(routing_keys::CHAT_CALL_REQUESTED, &event).await {
        tracing::error!(error = %e, "failed to publish call.requested event");
    }
}

pub async fn publish_call_responded(rabbitmq: &RabbitMQClient, call: &CallSession, accepted: bool) {
    let event = Event::new(
        "ftalk-matching",
        routing_keys::CHAT_CALL_RESPONDED,
        payloads::CallResponded {
            call_id: call.id,
            chat_session_id: call.chat_session_id,
            caller_id: call.caller_id,
            callee_id: call.callee_id,
            accepted,
        },
    )
    .with_user(call.callee_id);

    if let Err(e) = rabbitmq.publish(routing_keys::CHAT_CALL_RESPONDED, &event).await {
        tracing::error!(error = %e, "failed to publish call.responded event");
    }
}
