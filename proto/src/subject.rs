use crate::error::ProtoError;

fn is_valid_subject(subject: &str) -> bool {
    !subject.is_empty() && !subject.chars().any(|c| c.is_whitespace())
}

pub(crate) fn validate_subject(subject: &str) -> Result<(), ProtoError> {
    if is_valid_subject(subject) {
        Ok(())
    } else {
        Err(ProtoError::BadSubject(subject.to_owned()))
    }
}

/// Subjects may carry the `*` (one token) and `>` (tail) wildcards only when
/// subscribing.
pub fn is_wildcard(subject: &str) -> bool {
    subject.split('.').any(|token| token == "*" || token == ">")
}
