//! Suggestion scoring and ranking
//!
//! Pure transformation from raw source signals to one ranked, capped list
//! of suggestions. Deterministic given fixed inputs and a fixed `now`; no
//! I/O and no randomness, which makes this the unit-test surface for the
//! whole pipeline.

use beacon_domain::{
    CalendarEvent, ChatMessage, ChatMessageKind, EmailMessage, Priority, Suggestion,
    SuggestionSource,
};
use chrono::{DateTime, Duration, Utc};
use lazy_static::lazy_static;
use regex::Regex;

/// Maximum number of suggestions returned per invocation.
pub const MAX_SUGGESTIONS: usize = 10;

/// Subject keywords that force an email suggestion to high priority.
const ACTION_WORDS: [&str; 6] = ["urgent", "asap", "deadline", "follow up", "review", "approve"];

/// Chat messages younger than this many hours earn a recency bonus.
const RECENT_CHAT_WINDOW_HOURS: i64 = 6;

const CHAT_TITLE_MAX_CHARS: usize = 60;

lazy_static! {
    /// Matches `"Display Name <addr@host>"` (quotes optional).
    static ref FROM_HEADER_RE: Regex =
        Regex::new(r#"^\s*"?([^"<]*?)"?\s*<\s*([^>]+?)\s*>\s*$"#)
            .expect("hard-coded sender regex is valid");
}

/// Merge and rank all source signals into at most [`MAX_SUGGESTIONS`]
/// suggestions, descending by score. The sort is stable, so ties keep
/// their original relative order (calendar, then email, then chat).
#[must_use]
pub fn rank(
    events: &[CalendarEvent],
    emails: &[EmailMessage],
    messages: &[ChatMessage],
    now: DateTime<Utc>,
) -> Vec<Suggestion> {
    let mut suggestions: Vec<Suggestion> = Vec::new();

    suggestions.extend(events.iter().filter_map(|event| score_event(event, now)));
    suggestions.extend(emails.iter().map(score_email));
    suggestions.extend(messages.iter().filter_map(|message| score_chat(message, now)));

    suggestions.sort_by(|a, b| b.score.cmp(&a.score));
    suggestions.truncate(MAX_SUGGESTIONS);
    suggestions
}

/// Score a calendar event by proximity. Events that have already started
/// are skipped.
fn score_event(event: &CalendarEvent, now: DateTime<Utc>) -> Option<Suggestion> {
    if event.start <= now {
        return None;
    }

    let minutes_until = (event.start - now).num_minutes();
    let (score, priority) = if minutes_until <= 30 {
        (100, Priority::High)
    } else if minutes_until <= 120 {
        (80, Priority::High)
    } else if same_utc_day(event.start, now) {
        (60, Priority::Medium)
    } else if next_utc_day(event.start, now) {
        (40, Priority::Low)
    } else {
        (20, Priority::Low)
    };

    let mut context = relative_start(event.start, now, minutes_until);
    if let Some(location) = &event.location {
        context = format!("{context} \u{2022} {location}");
    }

    Some(Suggestion {
        id: format!("calendar-{}", event.id),
        title: event.title.clone(),
        source: SuggestionSource::Calendar,
        source_id: event.id.clone(),
        priority,
        context: Some(context),
        due_date: Some(event.start),
        score,
    })
}

/// Score an email. Base 50/medium; starred forces 90/high before the
/// unread bonus; action words in the subject force high and add 30;
/// unread adds 20 on top of everything.
fn score_email(email: &EmailMessage) -> Suggestion {
    let mut score: i64 = 50;
    let mut priority = Priority::Medium;

    if email.is_starred {
        score = 90;
        priority = Priority::High;
    }

    let subject = email.subject.to_lowercase();
    if ACTION_WORDS.iter().any(|word| subject.contains(word)) {
        score += 30;
        priority = Priority::High;
    }

    if email.is_unread {
        score += 20;
    }

    Suggestion {
        id: format!("email-{}", email.id),
        title: email.subject.clone(),
        source: SuggestionSource::Email,
        source_id: email.id.clone(),
        priority,
        context: Some(format!("From {}", sender_name(&email.from))),
        due_date: None,
        score,
    }
}

/// Score a chat message by kind; `Channel` messages never become
/// suggestions. Messages under six hours old earn a +20 recency bonus.
fn score_chat(message: &ChatMessage, now: DateTime<Utc>) -> Option<Suggestion> {
    let (base, priority, label) = match message.kind {
        ChatMessageKind::Mention => (85, Priority::High, "Mention"),
        ChatMessageKind::Dm => (80, Priority::High, "Direct message"),
        ChatMessageKind::Saved => (70, Priority::Medium, "Saved message"),
        ChatMessageKind::Thread => (60, Priority::Medium, "Thread reply"),
        ChatMessageKind::Channel => return None,
    };

    let mut score = base;
    if let Some(age) = message_age(&message.timestamp, now) {
        if age < Duration::hours(RECENT_CHAT_WINDOW_HOURS) {
            score += 20;
        }
    }

    Some(Suggestion {
        id: format!("slack-{}", message.id),
        title: truncate_title(&message.text),
        source: SuggestionSource::Slack,
        source_id: message.id.clone(),
        priority,
        context: Some(format!("{label} from {}", message.user)),
        due_date: None,
        score,
    })
}

/// Parse a sender name from a From header: the display name when present,
/// otherwise the local part of the address.
fn sender_name(from: &str) -> String {
    if let Some(caps) = FROM_HEADER_RE.captures(from) {
        let name = caps.get(1).map_or("", |m| m.as_str().trim());
        if !name.is_empty() {
            return name.to_string();
        }
        let addr = caps.get(2).map_or("", |m| m.as_str());
        return local_part(addr);
    }

    local_part(from.trim())
}

fn local_part(address: &str) -> String {
    address.split('@').next().unwrap_or(address).to_string()
}

/// Age of a Slack-style timestamp (epoch seconds as a decimal string).
/// Unparseable timestamps yield `None` and forfeit the recency bonus.
fn message_age(timestamp: &str, now: DateTime<Utc>) -> Option<Duration> {
    let seconds: i64 = timestamp.split('.').next()?.parse().ok()?;
    let sent_at = DateTime::<Utc>::from_timestamp(seconds, 0)?;
    Some(now - sent_at)
}

fn truncate_title(text: &str) -> String {
    if text.chars().count() <= CHAT_TITLE_MAX_CHARS {
        return text.to_string();
    }

    let mut truncated: String = text.chars().take(CHAT_TITLE_MAX_CHARS).collect();
    truncated.push_str("...");
    truncated
}

fn relative_start(start: DateTime<Utc>, now: DateTime<Utc>, minutes_until: i64) -> String {
    if minutes_until < 60 {
        format!("Starts in {minutes_until} min")
    } else if same_utc_day(start, now) {
        format!("Today at {}", start.format("%H:%M"))
    } else if next_utc_day(start, now) {
        format!("Tomorrow at {}", start.format("%H:%M"))
    } else {
        format!("On {}", start.format("%b %d"))
    }
}

fn same_utc_day(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.date_naive() == b.date_naive()
}

fn next_utc_day(start: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now.date_naive().succ_opt().is_some_and(|tomorrow| start.date_naive() == tomorrow)
}
