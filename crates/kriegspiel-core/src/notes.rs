//! Note logs and the transport messages built from them
//!
//! Each seat owns an append-only log of notes revealed to it (referee
//! announcements, legality answers). Before every decision the bridge joins
//! the agent's own log and its opponent's log into two delimited strings.
//! Insertion order is reveal order and is never re-sorted: later notes may
//! supersede earlier ones.
//!
//! A note containing the delimiter is escaped as `\;` (and a literal
//! backslash as `\\`), so notes free of both characters join unchanged.

use serde::{Deserialize, Serialize};

use crate::game::StateSnapshot;
use crate::player::Seats;

/// Separator between notes in a transport message
pub const NOTE_DELIMITER: char = ';';

const ESCAPE: char = '\\';

/// Ordered, append-only log of notes revealed to one seat
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteLog(Vec<String>);

impl NoteLog {
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, note: impl Into<String>) {
        self.0.push(note.into());
    }

    pub fn entries(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for NoteLog {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Join a log into a single transport string
pub fn join_notes(log: &NoteLog) -> String {
    let mut out = String::new();
    for (i, note) in log.entries().iter().enumerate() {
        if i > 0 {
            out.push(NOTE_DELIMITER);
        }
        for c in note.chars() {
            if c == NOTE_DELIMITER || c == ESCAPE {
                out.push(ESCAPE);
            }
            out.push(c);
        }
    }
    out
}

/// Split a transport string back into notes, undoing [`join_notes`]
pub fn split_transport(message: &str) -> Vec<String> {
    if message.is_empty() {
        return Vec::new();
    }

    let mut notes = Vec::new();
    let mut current = String::new();
    let mut chars = message.chars();
    while let Some(c) = chars.next() {
        match c {
            ESCAPE => {
                // Trailing lone escape is kept literally
                current.push(chars.next().unwrap_or(ESCAPE));
            }
            NOTE_DELIMITER => notes.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    notes.push(current);
    notes
}

/// The two strings handed to the agent with every decision request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportMessages {
    /// The agent's own notes ("last try" messages)
    pub own: String,
    /// The opponent seat's notes (referee messages)
    pub referee: String,
}

impl TransportMessages {
    /// Build both messages fresh from the snapshot
    pub fn collect(state: &StateSnapshot, seats: &Seats) -> Self {
        Self {
            own: join_notes(state.notes_for(seats.player)),
            referee: join_notes(state.notes_for(seats.opponent)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(notes: &[&str]) -> NoteLog {
        notes.iter().copied().collect()
    }

    #[test]
    fn test_join_empty_log() {
        assert_eq!(join_notes(&NoteLog::new()), "");
        assert!(split_transport("").is_empty());
    }

    #[test]
    fn test_join_preserves_order() {
        let notes = log(&["a", "b"]);
        assert_eq!(join_notes(&notes), "a;b");
        assert_eq!(join_notes(&log(&["b", "a"])), "b;a");
    }

    #[test]
    fn test_join_is_repeatable() {
        let notes = log(&["Capture at e4", "Check on file"]);
        assert_eq!(join_notes(&notes), join_notes(&notes));
    }

    #[test]
    fn test_delimiter_in_note_is_escaped() {
        let notes = log(&["Capture at e4;pawn", r"back\slash", ""]);
        let joined = join_notes(&notes);
        assert_eq!(joined, r"Capture at e4\;pawn;back\\slash;");
        assert_eq!(split_transport(&joined), notes.entries());
    }

    #[test]
    fn test_collect_uses_both_seats() {
        let mut state = StateSnapshot::default();
        let seats = Seats::assign(2, 2).unwrap();
        state.notes_mut(seats.player).push("Illegal move");
        state.notes_mut(seats.opponent).push("Check on rank");
        state.notes_mut(seats.opponent).push("Capture at d5");

        let messages = TransportMessages::collect(&state, &seats);
        assert_eq!(messages.own, "Illegal move");
        assert_eq!(messages.referee, "Check on rank;Capture at d5");
    }
}
