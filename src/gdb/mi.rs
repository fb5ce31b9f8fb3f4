/// One record of GDB's machine-interface reply stream.
///
/// Result records terminate a command, the stream records carry everything
/// the debugger prints in between. Raw asynchronous lines that are not MI
/// framed (the Black Magic download status among them) arrive as `Output`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiRecord {
    /// `^<status>[,<payload>]` — terminates the current command.
    Result { message: String, payload: String },
    /// `~"..."` console stream output.
    Console(String),
    /// `@"..."` target stream output, e.g. the bus-scan listing.
    Target(String),
    /// `&"..."` log stream output.
    Log(String),
    /// Any other non-empty line, verbatim.
    Output(String),
}

/// Parses one line of MI output. The `(gdb)` prompt and blank lines carry
/// no information and yield `None`.
pub fn parse_line(line: &str) -> Option<MiRecord> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.is_empty() || line.trim() == "(gdb)" {
        return None;
    }

    match line.as_bytes()[0] {
        b'^' => {
            let rest = &line[1..];
            let (message, payload) = match rest.split_once(',') {
                Some((message, payload)) => (message, payload),
                None => (rest, ""),
            };
            Some(MiRecord::Result {
                message: message.to_string(),
                payload: payload.to_string(),
            })
        }
        b'~' => Some(MiRecord::Console(unescape_c_string(&line[1..]))),
        b'@' => Some(MiRecord::Target(unescape_c_string(&line[1..]))),
        b'&' => Some(MiRecord::Log(unescape_c_string(&line[1..]))),
        _ => Some(MiRecord::Output(line.to_string())),
    }
}

/// Strips the surrounding quotes of a stream-record payload and resolves
/// the C-style escapes GDB uses inside it.
fn unescape_c_string(quoted: &str) -> String {
    let inner = quoted
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(quoted);

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                // unknown escape, keep it as-is
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
