//! Status message templates.
//!
//! The user-visible vocabulary is a closed set keyed by
//! [`SubmissionStatus`]. Dynamic segments are limited to pre-approved
//! constants (the fallback contact); user input is never interpolated
//! into a rendered message. Multi-line messages are fixed line arrays —
//! rendering as markup is the front-end's concern and never required.

use minireg_types::records::SubmissionStatus;

/// Contact shown to users who are not registered yet.
pub const FALLBACK_CONTACT: &str = "0909090909";

const MSG_ALREADY_REGISTERED: &str = "You have already registered";
const MSG_NOT_REGISTERED: &str = "You haven't registered";
const MSG_TRANSIENT: &str = "An error occurred. Please try again later.";

/// Render a status as its fixed message lines.
pub fn message_lines(status: &SubmissionStatus) -> Vec<String> {
    match status {
        SubmissionStatus::AlreadyRegistered => vec![MSG_ALREADY_REGISTERED.to_string()],
        SubmissionStatus::NotRegistered => vec![
            MSG_NOT_REGISTERED.to_string(),
            format!("Please contact: {FALLBACK_CONTACT}"),
        ],
        SubmissionStatus::Invalid(failure) => vec![failure.message().to_string()],
        SubmissionStatus::TransientError => vec![MSG_TRANSIENT.to_string()],
    }
}

/// Render a status as a single newline-joined string.
pub fn message_text(status: &SubmissionStatus) -> String {
    message_lines(status).join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use minireg_types::records::ValidationFailure;

    #[test]
    fn test_not_registered_includes_fallback_contact() {
        let lines = message_lines(&SubmissionStatus::NotRegistered);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "You haven't registered");
        assert!(lines[1].contains(FALLBACK_CONTACT));
    }

    #[test]
    fn test_already_registered_single_line() {
        assert_eq!(
            message_lines(&SubmissionStatus::AlreadyRegistered),
            vec!["You have already registered"]
        );
    }

    #[test]
    fn test_invalid_uses_field_level_message() {
        let lines = message_lines(&SubmissionStatus::Invalid(ValidationFailure::Length));
        assert_eq!(
            lines,
            vec!["Phone number must be exactly 10 characters long."]
        );
        let lines = message_lines(&SubmissionStatus::Invalid(ValidationFailure::Format));
        assert!(lines[0].starts_with("Invalid phone number format"));
    }

    #[test]
    fn test_no_markup_in_any_template() {
        let statuses = [
            SubmissionStatus::AlreadyRegistered,
            SubmissionStatus::NotRegistered,
            SubmissionStatus::Invalid(ValidationFailure::Length),
            SubmissionStatus::Invalid(ValidationFailure::Format),
            SubmissionStatus::TransientError,
        ];
        for status in &statuses {
            for line in message_lines(status) {
                assert!(
                    !line.contains('<') && !line.contains('>'),
                    "template contains markup: {line}"
                );
            }
        }
    }

    #[test]
    fn test_message_text_joins_with_newline() {
        assert_eq!(
            message_text(&SubmissionStatus::NotRegistered),
            format!("You haven't registered\nPlease contact: {FALLBACK_CONTACT}")
        );
    }
}
