//! Fixed assistant texts and the conversations a session starts with.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use crate::error::ChatError;
use crate::session::Session;
use crate::types::{ConversationId, NewMessage};

/// Greeting seeded into every new conversation.
pub const GREETING: &str =
    "سلام! من دستیار هوش مصنوعی شما هستم. می‌توانید در مورد اسناد بارگذاری شده سوال بپرسید.";

/// Title given to conversations created from the UI.
pub const NEW_CONVERSATION_TITLE: &str = "مکالمه جدید";

/// Reply appended whenever a query fails, whatever the cause.
pub const QUERY_FAILURE_BODY: &str = "خطا در دریافت نتایج جستجو. لطفاً مجدداً تلاش کنید.";

/// Body of a successful reply; the structured answer rides alongside.
pub fn answer_body(question: &str) -> String {
    format!("نتایج جستجو برای: {}", question)
}

/// A session holding one new conversation with the greeting.
pub fn fresh_session(summary_max_chars: usize) -> Session {
    Session::new(summary_max_chars)
}

/// A session pre-populated with the three dashboard demo conversations,
/// conversation `"1"` on top and active.
pub fn demo_session(summary_max_chars: usize) -> Result<Session, ChatError> {
    let mut session = Session::empty(summary_max_chars);

    // Oldest first so that "1" ends up on top.
    session.seed_conversation(
        ConversationId::from("3"),
        "مقررات زیست محیطی",
        vec![
            (NewMessage::assistant(GREETING), tehran(2024, 1, 13, 9, 15)),
            (
                NewMessage::user("آیا پروژه جدید نیاز به ارزیابی زیست محیطی دارد؟"),
                tehran(2024, 1, 13, 9, 20),
            ),
        ],
    )?;
    session.seed_conversation(
        ConversationId::from("2"),
        "بودجه شهرداری 1403",
        vec![
            (NewMessage::assistant(GREETING), tehran(2024, 1, 14, 15, 40)),
            (
                NewMessage::user("درآمدهای شهرداری در سال آینده چقدر پیش‌بینی می‌شود؟"),
                tehran(2024, 1, 14, 15, 45),
            ),
        ],
    )?;
    session.seed_conversation(
        ConversationId::from("1"),
        "پرسش درباره قوانین شهرسازی",
        vec![
            (NewMessage::assistant(GREETING), tehran(2024, 1, 15, 10, 25)),
            (
                NewMessage::user("قوانین مربوط به ساخت و ساز در مناطق مسکونی چگونه است؟"),
                tehran(2024, 1, 15, 10, 30),
            ),
            (
                NewMessage::assistant(
                    "بر اساس اسناد بارگذاری شده، قوانین ساخت و ساز در مناطق مسکونی شامل محدودیت‌های زیر است:\n\n\
                     • حداکثر تراکم ساختمانی: 60 درصد\n\
                     • حداکثر تعداد طبقات: 4 طبقه\n\
                     • حداقل فاصله از همجوار: 3 متر\n\
                     • الزام رعایت ضوابط پارکینگ: 1 پارکینگ به ازای هر 100 متر مربع\n\n\
                     آیا سوال خاص‌تری دارید؟",
                )
                .with_documents(vec![
                    "قوانین شهرسازی.pdf".to_string(),
                    "ضوابط ساخت و ساز.pdf".to_string(),
                ]),
                tehran(2024, 1, 15, 10, 31),
            ),
        ],
    )?;

    Ok(session)
}

/// Tehran standard time is UTC+03:30.
const TEHRAN_OFFSET_MINUTES: i64 = 210;

/// Tehran wall-clock time as UTC.
fn tehran(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, 0))
        .map(|local| Utc.from_utc_datetime(&(local - Duration::minutes(TEHRAN_OFFSET_MINUTES))))
        .unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sender;

    #[test]
    fn test_answer_body_echoes_question() {
        assert_eq!(answer_body("چیست؟"), "نتایج جستجو برای: چیست؟");
    }

    #[test]
    fn test_fresh_session_has_one_greeting() {
        let session = fresh_session(120);
        assert_eq!(session.conversations().len(), 1);
        let messages = session.active_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body(), GREETING);
        assert_eq!(messages[0].sender(), Sender::Assistant);
        assert_eq!(session.conversations()[0].title, NEW_CONVERSATION_TITLE);
    }

    #[test]
    fn test_demo_order_and_active() {
        let session = demo_session(120).unwrap();
        let ids: Vec<&str> = session
            .conversations()
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(session.active_id().map(|id| id.as_str()), Some("1"));
    }

    #[test]
    fn test_demo_counts_match_threads() {
        let session = demo_session(120).unwrap();
        for conv in session.conversations() {
            assert_eq!(conv.message_count, session.messages(&conv.id).len());
        }
        assert_eq!(session.active_messages().len(), 3);
    }

    #[test]
    fn test_demo_cited_documents() {
        let session = demo_session(120).unwrap();
        let last = &session.active_messages()[2];
        let docs = last.documents().unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0], "قوانین شهرسازی.pdf");
    }

    #[test]
    fn test_demo_last_message_is_user_question() {
        let session = demo_session(120).unwrap();
        let budget = &session.conversations()[1];
        assert_eq!(
            budget.last_message,
            "درآمدهای شهرداری در سال آینده چقدر پیش‌بینی می‌شود؟"
        );
    }

    #[test]
    fn test_tehran_offset() {
        let t = tehran(2024, 1, 15, 10, 30);
        assert_eq!(t.to_rfc3339(), "2024-01-15T07:00:00+00:00");
    }
}
