//! Markdown rendering of a session's roll log.

use crate::models::{LoggedRoll, SessionRecord};

/// Media type for exported roll logs.
pub const MARKDOWN_CONTENT_TYPE: &str = "text/markdown; charset=utf-8";

/// Timestamp format used in roll bullets (UTC).
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render the roll log of `session`.
///
/// One bullet per roll, oldest first:
///
/// ```text
/// # Session Night One (6f1c...) Roll Log
///
/// - [Forest Encounters](#0b7e...) - 2025-02-23 14:55:52: Encounter: Wolves, Weather: Fog
/// ```
pub fn render_session_log(session: &SessionRecord, rolls: &[LoggedRoll]) -> String {
    let mut ordered: Vec<&LoggedRoll> = rolls.iter().collect();
    ordered.sort_by_key(|r| r.roll.rolled_at);

    let mut out = format!(
        "# Session {} ({}) Roll Log\n\n",
        session.name, session.session_id
    );

    for logged in ordered {
        let parts: Vec<String> = logged
            .results
            .iter()
            .map(|r| format!("{}: {}", r.display_name(), r.value))
            .collect();

        out.push_str(&format!(
            "- [{}](#{}) - {}: {}\n",
            logged.roll.table_title,
            logged.roll.table_id,
            logged.roll.rolled_at.format(TIMESTAMP_FORMAT),
            parts.join(", ")
        ));
    }

    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::{RollRecord, RollResultRecord};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn session() -> SessionRecord {
        SessionRecord {
            session_id: Uuid::new_v4(),
            user_id: "gm".to_string(),
            name: "Night One".to_string(),
            description: "Goblin caves".to_string(),
            created_at: Utc::now(),
        }
    }

    fn logged(
        session_id: Uuid,
        title: &str,
        at: chrono::DateTime<Utc>,
        results: &[(Option<&str>, &str)],
    ) -> LoggedRoll {
        let roll_id = Uuid::new_v4();
        LoggedRoll {
            roll: RollRecord {
                roll_id,
                session_id,
                table_id: Uuid::new_v4(),
                table_title: title.to_string(),
                mode: "row".to_string(),
                rolled_at: at,
            },
            results: results
                .iter()
                .map(|(name, value)| RollResultRecord {
                    result_id: Uuid::new_v4(),
                    roll_id,
                    column_id: Uuid::new_v4(),
                    value: (*value).to_string(),
                    column_name: name.map(str::to_string),
                })
                .collect(),
        }
    }

    #[test]
    fn test_heading_names_session() {
        let s = session();
        let md = render_session_log(&s, &[]);

        assert_eq!(
            md,
            format!("# Session Night One ({}) Roll Log\n\n", s.session_id)
        );
    }

    #[test]
    fn test_bullet_format() {
        let s = session();
        let at = Utc.with_ymd_and_hms(2025, 2, 23, 14, 55, 52).unwrap();
        let roll = logged(
            s.session_id,
            "Seeded Test Table",
            at,
            &[(Some("Encounter"), "Test Encounter"), (Some("Environment"), "Swamp")],
        );
        let table_id = roll.roll.table_id;

        let md = render_session_log(&s, &[roll]);

        let expected = format!(
            "- [Seeded Test Table](#{}) - 2025-02-23 14:55:52: Encounter: Test Encounter, Environment: Swamp\n",
            table_id
        );
        assert!(md.ends_with(&expected), "unexpected markdown:\n{}", md);
    }

    #[test]
    fn test_rolls_are_ordered_by_timestamp() {
        let s = session();
        let early = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();

        let rolls = vec![
            logged(s.session_id, "Later Table", late, &[(Some("A"), "1")]),
            logged(s.session_id, "Earlier Table", early, &[(Some("A"), "2")]),
        ];

        let md = render_session_log(&s, &rolls);
        let earlier = md.find("Earlier Table").unwrap();
        let later = md.find("Later Table").unwrap();
        assert!(earlier < later);
    }

    #[test]
    fn test_missing_column_name_falls_back_to_id() {
        let s = session();
        let roll = logged(s.session_id, "Orphaned", Utc::now(), &[(None, "Ghost")]);
        let column_id = roll.results.first().unwrap().column_id;

        let md = render_session_log(&s, &[roll]);
        assert!(md.contains(&format!("{}: Ghost", column_id)));
    }
}
