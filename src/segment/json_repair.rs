use super::*;

/// Recovers parseable JSON from text-generation output: code fences, leading
/// prose, trailing chatter and truncation mid-record.
///
/// `record_markers` name the field that closes a complete record (for
/// example `notes` in extraction records). When present, a truncated tail is
/// first cut back to the last record that ended with one of those fields.
#[derive(Debug, Clone, Default)]
pub struct JsonRepairer {
    record_markers: Vec<String>,
}

pub fn repair_json(raw: &str) -> Result<String, JsonRepairError> {
    JsonRepairer::new().repair(raw)
}

pub fn parse_repaired<T: DeserializeOwned>(raw: &str) -> Result<T, JsonRepairError> {
    JsonRepairer::new().parse(raw)
}

impl JsonRepairer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record_markers<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            record_markers: markers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn repair(&self, raw: &str) -> Result<String, JsonRepairError> {
        if is_valid_json(raw) {
            return Ok(raw.to_string());
        }

        let unfenced = strip_code_fences(raw);
        let Some(candidate) = locate_json(unfenced) else {
            return Err(JsonRepairError::Malformed {
                original: raw.to_string(),
                repaired: unfenced.to_string(),
            });
        };
        if candidate.extent == Extent::Complete {
            return Ok(candidate.text.to_string());
        }
        let body = candidate.text.trim_end();

        if let Some(cut) = self.last_record_boundary(body) {
            let candidate = close_open_brackets(&body[..cut]);
            if is_valid_json(&candidate) {
                debug!(cut, original_len = body.len(), "json repaired at record boundary");
                return Ok(candidate);
            }
        }

        let candidate = balance_truncated(body);
        if is_valid_json(&candidate) {
            debug!(original_len = body.len(), "json repaired by balancing brackets");
            return Ok(candidate);
        }

        Err(JsonRepairError::Malformed {
            original: raw.to_string(),
            repaired: candidate,
        })
    }

    pub fn parse<T: DeserializeOwned>(&self, raw: &str) -> Result<T, JsonRepairError> {
        let repaired = self.repair(raw)?;
        serde_json::from_str(&repaired)
            .map_err(|source| JsonRepairError::Schema { repaired, source })
    }

    fn last_record_boundary(&self, body: &str) -> Option<usize> {
        if self.record_markers.is_empty() {
            return None;
        }

        scan(body)
            .closed_records
            .iter()
            .rev()
            .find(|record| {
                record
                    .last_key
                    .as_deref()
                    .is_some_and(|key| self.record_markers.iter().any(|marker| marker == key))
            })
            .map(|record| record.end)
    }
}

fn is_valid_json(text: &str) -> bool {
    serde_json::from_str::<Value>(text).is_ok()
}

// Fences count only at the start of a line; a fence inside a JSON string
// value sits after an escaped `\n`. The first closing fence that leaves valid
// JSON wins, otherwise the last one.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(fence_start) = line_start_fences(trimmed).next() else {
        return trimmed;
    };

    let after_fence = &trimmed[fence_start + 3..];
    let content_start = after_fence.find('\n').map(|index| index + 1).unwrap_or(0);
    let content = &after_fence[content_start..];
    let closing = line_start_fences(content).collect::<Vec<usize>>();

    let fence_end = closing
        .iter()
        .copied()
        .find(|end| is_valid_json(content[..*end].trim()))
        .or_else(|| closing.last().copied());
    match fence_end {
        Some(end) => content[..end].trim(),
        None => content.trim(),
    }
}

fn line_start_fences(text: &str) -> impl Iterator<Item = usize> + '_ {
    text.match_indices("```")
        .map(|(index, _)| index)
        .filter(move |index| {
            let before = text[..*index].trim_end_matches([' ', '\t']);
            before.is_empty() || before.ends_with('\n')
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extent {
    Complete,
    Truncated,
    Broken,
}

#[derive(Debug)]
struct JsonCandidate<'t> {
    text: &'t str,
    extent: Extent,
}

// Prose around the payload can carry brackets of its own ("Found [3]
// subtopics:"), so every opening bracket outside an earlier candidate is
// measured. A span that parses (fully or up to a truncation) beats one with a
// syntax error; then the widest span wins, ties going to the earlier one.
fn locate_json(text: &str) -> Option<JsonCandidate<'_>> {
    let mut best: Option<(usize, usize, Extent)> = None;
    let mut resume_at = 0usize;

    for (start, character) in text.char_indices() {
        if start < resume_at || !matches!(character, '{' | '[') {
            continue;
        }

        let tail = &text[start..];
        let mut stream = serde_json::Deserializer::from_str(tail).into_iter::<Value>();
        let (end, extent) = match stream.next() {
            Some(Ok(_)) => (start + stream.byte_offset(), Extent::Complete),
            Some(Err(err)) if err.is_eof() => (text.len(), Extent::Truncated),
            _ => (
                start + matching_close(tail).unwrap_or(tail.len()),
                Extent::Broken,
            ),
        };

        let rank = (extent != Extent::Broken, end - start);
        if best.is_none_or(|(best_start, best_end, best_extent)| {
            rank > (best_extent != Extent::Broken, best_end - best_start)
        }) {
            best = Some((start, end, extent));
        }
        resume_at = end;
    }

    best.map(|(start, end, extent)| JsonCandidate {
        text: &text[start..end],
        extent,
    })
}

fn matching_close(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (index, character) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if character == '\\' {
                escaped = true;
            } else if character == '"' {
                in_string = false;
            }
            continue;
        }

        match character {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(index + 1);
                }
            }
            _ => {}
        }
    }

    None
}

#[derive(Debug)]
struct Frame {
    opener: char,
    expect_key: bool,
    last_key: Option<String>,
    pending_key_start: Option<usize>,
}

#[derive(Debug)]
struct ClosedRecord {
    end: usize,
    last_key: Option<String>,
}

#[derive(Debug, Default)]
struct ScanState {
    frames: Vec<Frame>,
    in_string: bool,
    string_start: usize,
    string_is_key: bool,
    closed_records: Vec<ClosedRecord>,
}

impl ScanState {
    fn pending_key_start(&self) -> Option<usize> {
        self.frames.last().and_then(|frame| frame.pending_key_start)
    }

    fn innermost_is_object(&self) -> bool {
        self.frames.last().is_some_and(|frame| frame.opener == '{')
    }

    fn closers(&self) -> String {
        self.frames
            .iter()
            .rev()
            .map(|frame| if frame.opener == '{' { '}' } else { ']' })
            .collect()
    }
}

// Single pass over the text tracking open brackets, string state and the
// key most recently seen in each object.
fn scan(text: &str) -> ScanState {
    let mut state = ScanState::default();
    let mut escaped = false;

    for (index, character) in text.char_indices() {
        if state.in_string {
            if escaped {
                escaped = false;
            } else if character == '\\' {
                escaped = true;
            } else if character == '"' {
                state.in_string = false;
                if state.string_is_key {
                    let key = text[state.string_start + 1..index].to_string();
                    if let Some(frame) = state.frames.last_mut() {
                        frame.last_key = Some(key);
                        frame.pending_key_start = Some(state.string_start);
                    }
                }
            }
            continue;
        }

        match character {
            '"' => {
                state.in_string = true;
                state.string_start = index;
                state.string_is_key = state
                    .frames
                    .last()
                    .is_some_and(|frame| frame.opener == '{' && frame.expect_key);
            }
            '{' | '[' => state.frames.push(Frame {
                opener: character,
                expect_key: character == '{',
                last_key: None,
                pending_key_start: None,
            }),
            '}' | ']' => {
                let Some(frame) = state.frames.pop() else {
                    continue;
                };
                if frame.opener == '{' && !state.frames.is_empty() {
                    state.closed_records.push(ClosedRecord {
                        end: index + 1,
                        last_key: frame.last_key,
                    });
                }
            }
            ':' => {
                if let Some(frame) = state.frames.last_mut() {
                    frame.expect_key = false;
                    frame.pending_key_start = None;
                }
            }
            ',' => {
                if let Some(frame) = state.frames.last_mut() {
                    if frame.opener == '{' {
                        frame.expect_key = true;
                    }
                }
            }
            _ => {}
        }
    }

    state
}

fn close_open_brackets(text: &str) -> String {
    let trimmed = text.trim_end().trim_end_matches(',').trim_end();
    let state = scan(trimmed);
    format!("{}{}", trimmed, state.closers())
}

fn balance_truncated(body: &str) -> String {
    let mut text = body.trim_end().to_string();

    let state = scan(&text);
    if state.in_string {
        let value_in_object = !state.string_is_key && state.innermost_is_object();
        text.truncate(state.string_start);
        if value_in_object {
            text.push_str("\"\"");
        }
    }

    strip_partial_tail(&mut text);

    let state = scan(&text);
    text.push_str(&state.closers());
    text
}

fn strip_partial_tail(text: &mut String) {
    loop {
        let trimmed_len = text.trim_end().len();
        text.truncate(trimmed_len);

        if text.ends_with(',') || text.ends_with(':') {
            text.pop();
            continue;
        }

        if let Some(key_start) = scan(text).pending_key_start() {
            text.truncate(key_start);
            continue;
        }

        let scalar_start = text
            .char_indices()
            .rev()
            .take_while(|(_, character)| {
                character.is_ascii_alphanumeric() || matches!(character, '.' | '+' | '-')
            })
            .last()
            .map(|(index, _)| index);

        if let Some(start) = scalar_start {
            if !is_valid_json(&text[start..]) {
                text.truncate(start);
                continue;
            }
        }

        break;
    }
}
