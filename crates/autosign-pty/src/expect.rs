//! Prompt matching over a [`Terminal`].
//!
//! Patterns live in an ordered [`PatternTable`] keyed by a caller-defined
//! label type, so the table can be swapped per tool version without touching
//! the state machine that consumes [`Event`]s.

use std::time::{Duration, Instant};

use regex_lite::Regex;

use crate::error::{PtyError, PtyResult};
use crate::terminal::{ReadStatus, Terminal};

/// Unmatched output kept for matching; older text is discarded.
const MAX_PENDING: usize = 64 * 1024;

/// Raw output kept for diagnostics; older bytes are discarded.
const MAX_TRANSCRIPT: usize = 1024 * 1024;

/// A pattern hit in the pending buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternMatch<L> {
    pub label: L,
    pub start: usize,
    pub end: usize,
}

/// Ordered list of labelled regular expressions.
#[derive(Debug, Clone)]
pub struct PatternTable<L> {
    entries: Vec<(L, Regex)>,
}

impl<L: Copy> Default for PatternTable<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: Copy> PatternTable<L> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a pattern. Earlier entries win ties.
    pub fn push(&mut self, label: L, pattern: &str) -> PtyResult<()> {
        let regex = Regex::new(pattern).map_err(|e| PtyError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        self.entries.push((label, regex));
        Ok(())
    }

    /// Builder form of [`PatternTable::push`].
    pub fn with(mut self, label: L, pattern: &str) -> PtyResult<Self> {
        self.push(label, pattern)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the match starting earliest in `haystack`.
    pub fn find(&self, haystack: &str) -> Option<PatternMatch<L>> {
        let mut best: Option<PatternMatch<L>> = None;
        for (label, regex) in &self.entries {
            if let Some(m) = regex.find(haystack) {
                let earlier = best.map_or(true, |b| m.start() < b.start);
                if earlier {
                    best = Some(PatternMatch {
                        label: *label,
                        start: m.start(),
                        end: m.end(),
                    });
                }
            }
        }
        best
    }
}

/// What the terminal did next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event<L> {
    Matched(L),
    Eof,
    Timeout,
}

/// Reads a terminal until one of the table's patterns, EOF or the timeout.
#[derive(Debug)]
pub struct Expect<T, L> {
    terminal: T,
    patterns: PatternTable<L>,
    timeout: Duration,
    pending: String,
    transcript: Vec<u8>,
}

impl<T: Terminal, L: Copy> Expect<T, L> {
    pub fn new(terminal: T, patterns: PatternTable<L>, timeout: Duration) -> Self {
        Self {
            terminal,
            patterns,
            timeout,
            pending: String::new(),
            transcript: Vec::new(),
        }
    }

    /// Wait for the next event. The timeout restarts on every call.
    ///
    /// Output already buffered is matched before EOF is reported, so a
    /// terminal marker printed just before exit is never lost.
    pub fn next_event(&mut self) -> PtyResult<Event<L>> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(hit) = self.patterns.find(&self.pending) {
                self.pending.drain(..hit.end);
                return Ok(Event::Matched(hit.label));
            }
            match self.terminal.read_until(deadline)? {
                ReadStatus::Data(bytes) => self.record(&bytes),
                ReadStatus::Eof => return Ok(Event::Eof),
                ReadStatus::TimedOut => return Ok(Event::Timeout),
            }
        }
    }

    pub fn send_line(&mut self, line: &[u8]) -> PtyResult<()> {
        self.terminal.send_line(line)
    }

    /// Record remaining output until EOF or `wait` elapses, matching nothing.
    pub fn drain(&mut self, wait: Duration) -> PtyResult<()> {
        let deadline = Instant::now() + wait;
        loop {
            match self.terminal.read_until(deadline)? {
                ReadStatus::Data(bytes) => self.record(&bytes),
                ReadStatus::Eof | ReadStatus::TimedOut => return Ok(()),
            }
        }
    }

    pub fn terminal_mut(&mut self) -> &mut T {
        &mut self.terminal
    }

    /// Everything read so far, unredacted.
    pub fn transcript(&self) -> &[u8] {
        &self.transcript
    }

    pub fn into_parts(self) -> (T, Vec<u8>) {
        (self.terminal, self.transcript)
    }

    fn record(&mut self, bytes: &[u8]) {
        self.transcript.extend_from_slice(bytes);
        if self.transcript.len() > MAX_TRANSCRIPT {
            // Drop whole lines so no fragment of an echoed line survives.
            let from = self.transcript.len() - MAX_TRANSCRIPT - 1;
            let cut = self.transcript[from..]
                .iter()
                .position(|&b| b == b'\n')
                .map_or(self.transcript.len(), |offset| from + offset + 1);
            self.transcript.drain(..cut);
        }

        self.pending.push_str(&String::from_utf8_lossy(bytes));
        if self.pending.len() > MAX_PENDING {
            let mut cut = self.pending.len() - MAX_PENDING / 2;
            while !self.pending.is_char_boundary(cut) {
                cut += 1;
            }
            self.pending.drain(..cut);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{ScriptedTerminal, Step};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Label {
        Prompt,
        Done,
        Error,
    }

    fn table() -> PatternTable<Label> {
        PatternTable::new()
            .with(Label::Prompt, "Enter passphrase:")
            .unwrap()
            .with(Label::Done, "done")
            .unwrap()
            .with(Label::Error, "(?m)^error:")
            .unwrap()
    }

    #[test]
    fn test_earliest_match_wins() {
        let hit = table().find("xx done Enter passphrase:").unwrap();
        assert_eq!(hit.label, Label::Done);
        assert_eq!(hit.start, 3);
    }

    #[test]
    fn test_tie_goes_to_first_entry() {
        let table = PatternTable::new()
            .with(Label::Error, "abc")
            .unwrap()
            .with(Label::Done, "ab")
            .unwrap();
        assert_eq!(table.find("abc").unwrap().label, Label::Error);
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err = PatternTable::new().with(Label::Prompt, "(unclosed").unwrap_err();
        assert!(matches!(err, PtyError::InvalidPattern { .. }));
    }

    #[test]
    fn test_line_anchor_needs_line_start() {
        assert!(table().find("fatal error: nope").is_none());
        assert_eq!(table().find("ok\nerror: nope").unwrap().label, Label::Error);
    }

    #[test]
    fn test_events_in_order() {
        let (terminal, _log) = ScriptedTerminal::new(vec![
            Step::output("Enter pass"),
            Step::output("phrase: "),
            Step::output("Enter passphrase: done\n"),
            Step::Eof,
        ]);
        let mut expect = Expect::new(terminal, table(), Duration::from_secs(1));

        assert_eq!(expect.next_event().unwrap(), Event::Matched(Label::Prompt));
        assert_eq!(expect.next_event().unwrap(), Event::Matched(Label::Prompt));
        assert_eq!(expect.next_event().unwrap(), Event::Matched(Label::Done));
        assert_eq!(expect.next_event().unwrap(), Event::Eof);
        assert_eq!(
            expect.transcript(),
            b"Enter passphrase: Enter passphrase: done\n"
        );
    }

    #[test]
    fn test_buffered_marker_reported_before_eof() {
        let (terminal, _log) =
            ScriptedTerminal::new(vec![Step::output("error: signing failed\n"), Step::Eof]);
        let mut expect = Expect::new(terminal, table(), Duration::from_secs(1));

        assert_eq!(expect.next_event().unwrap(), Event::Matched(Label::Error));
        assert_eq!(expect.next_event().unwrap(), Event::Eof);
    }

    #[test]
    fn test_drain_records_trailing_output() {
        let (terminal, _log) = ScriptedTerminal::new(vec![
            Step::output("error: gpg exec failed"),
            Step::output(" (2)\n"),
            Step::Eof,
        ]);
        let mut expect = Expect::new(terminal, table(), Duration::from_secs(1));

        assert_eq!(expect.next_event().unwrap(), Event::Matched(Label::Error));
        expect.drain(Duration::from_secs(1)).unwrap();
        assert_eq!(expect.transcript(), b"error: gpg exec failed (2)\n");
    }

    #[test]
    fn test_transcript_trims_whole_lines() {
        let first = "Enter passphrase: hunter2\r\n";
        // Overflow lands inside the first line's secret.
        let mut filler = vec![b'y'; MAX_TRANSCRIPT - 8];
        filler.push(b'\n');
        let (terminal, _log) = ScriptedTerminal::new(vec![
            Step::output(first),
            Step::Output(filler.clone()),
            Step::Eof,
        ]);
        let mut expect = Expect::new(terminal, table(), Duration::from_secs(1));

        expect.drain(Duration::from_secs(1)).unwrap();
        assert_eq!(expect.transcript(), &filler[..]);
        assert!(expect.transcript().len() <= MAX_TRANSCRIPT);
    }

    #[test]
    fn test_timeout_restarts_each_call() {
        let (terminal, _log) = ScriptedTerminal::new(vec![Step::Hang, Step::Hang]);
        let mut expect = Expect::new(terminal, table(), Duration::from_millis(50));

        let started = Instant::now();
        assert_eq!(expect.next_event().unwrap(), Event::Timeout);
        assert_eq!(expect.next_event().unwrap(), Event::Timeout);
        assert!(started.elapsed() >= Duration::from_millis(100));
    }
}
