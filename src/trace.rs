use serde::Serialize;

/// One dataset line: the whole trace under a single `text` key.
#[derive(Serialize)]
struct TraceRecord<'a> {
    text: &'a str,
}

/// Append-only trace buffer. Every solver decision point goes through
/// `emit`, so the buffer is the authoritative byte-exact record of a solve.
#[derive(Debug, Default)]
pub struct TraceLog {
    buf: String,
    echo: bool,
}

impl TraceLog {
    pub fn new(echo: bool) -> TraceLog {
        TraceLog {
            buf: String::new(),
            echo,
        }
    }

    /// Appends `text` plus a newline, optionally echoing to stdout.
    pub fn emit(&mut self, text: &str) {
        if self.echo {
            println!("{text}");
        }
        self.buf.push_str(text);
        self.buf.push('\n');
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn trimmed(&self) -> &str {
        self.buf.trim()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// The buffer as one JSONL record: `{"text": <trace>}`.
    pub fn jsonl_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(&TraceRecord { text: &self.buf })
    }
}
