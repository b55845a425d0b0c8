//! Parsing of slash commands and name/room field rules.

use charla_proto::MAX_NAME_LEN;

/// A parsed slash command.
///
/// Arguments are the first whitespace-delimited token after the verb,
/// already truncated to the field limit; `None` when the user typed the
/// verb alone.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Command<'a> {
    /// `/nick <name>`
    Nick(Option<&'a str>),
    /// `/join <room>`
    Join(Option<&'a str>),
    /// Any other slash-prefixed line.
    Unknown,
}

/// Parses a line that starts with `/`.
pub(crate) fn parse_command(line: &str) -> Command<'_> {
    let mut parts = line.split_whitespace();
    let verb = parts.next().unwrap_or("");

    match verb {
        "/nick" => Command::Nick(parts.next().map(truncate_field)),
        "/join" => Command::Join(parts.next().map(truncate_field)),
        _ => Command::Unknown,
    }
}

/// Clamps a name or room field to its visible-length limit.
///
/// Truncation lands on a UTF-8 character boundary, so a multi-byte
/// character straddling the limit is dropped whole.
pub(crate) fn truncate_field(raw: &str) -> &str {
    if raw.len() <= MAX_NAME_LEN {
        return raw;
    }
    let mut end = MAX_NAME_LEN;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    &raw[..end]
}

/// Whether a name is reserved for the system.
///
/// "TÚ" is the client's own local echo label and "SERVER" prefixes system
/// messages; both are rejected case-insensitively, unlike the
/// case-sensitive uniqueness rule for ordinary names.
pub(crate) fn is_reserved_name(name: &str) -> bool {
    let lowered = name.to_lowercase();
    lowered == "tú" || lowered == "server"
}
