//! Argument records for stream commands

use redis::streams::{StreamAutoClaimOptions, StreamReadOptions};
use std::time::Duration;

/// Arguments for `XADD`
#[derive(Debug, Clone, Default)]
pub struct XAddArgs {
    pub stream: String,
    /// Fail with `NotFound` instead of creating a missing stream
    pub no_mkstream: bool,
    /// Trim the stream to roughly (`approx`) or exactly this many entries
    pub max_len: Option<usize>,
    pub approx: bool,
    /// Entry id; `*` (server generated) when `None`
    pub id: Option<String>,
    pub fields: Vec<(String, String)>,
}

impl XAddArgs {
    pub fn new(stream: impl Into<String>) -> Self {
        Self {
            stream: stream.into(),
            ..Default::default()
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn no_mkstream(mut self) -> Self {
        self.no_mkstream = true;
        self
    }

    pub fn max_len(mut self, max_len: usize, approx: bool) -> Self {
        self.max_len = Some(max_len);
        self.approx = approx;
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub(crate) fn command(&self) -> redis::Cmd {
        let mut cmd = redis::cmd("XADD");
        cmd.arg(&self.stream);
        if self.no_mkstream {
            cmd.arg("NOMKSTREAM");
        }
        if let Some(max_len) = self.max_len {
            cmd.arg("MAXLEN");
            if self.approx {
                cmd.arg("~");
            }
            cmd.arg(max_len);
        }
        cmd.arg(self.id.as_deref().unwrap_or("*"));
        for (name, value) in &self.fields {
            cmd.arg(name).arg(value);
        }
        cmd
    }
}

/// Arguments for `XREADGROUP`
#[derive(Debug, Clone)]
pub struct XReadGroupArgs {
    pub group: String,
    pub consumer: String,
    pub streams: Vec<String>,
    /// One id per stream; `>` (new entries only) for streams without one
    pub ids: Vec<String>,
    pub count: Option<usize>,
    /// Block up to this long; `None` returns immediately
    pub block: Option<Duration>,
    pub no_ack: bool,
}

impl XReadGroupArgs {
    pub fn new(group: impl Into<String>, consumer: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            consumer: consumer.into(),
            streams: Vec::new(),
            ids: Vec::new(),
            count: None,
            block: None,
            no_ack: false,
        }
    }

    pub fn stream(mut self, stream: impl Into<String>) -> Self {
        self.streams.push(stream.into());
        self
    }

    pub fn count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn block(mut self, block: Duration) -> Self {
        self.block = Some(block);
        self
    }

    pub fn no_ack(mut self) -> Self {
        self.no_ack = true;
        self
    }

    pub(crate) fn resolved_ids(&self) -> Vec<String> {
        (0..self.streams.len())
            .map(|i| self.ids.get(i).cloned().unwrap_or_else(|| ">".to_string()))
            .collect()
    }

    pub(crate) fn options(&self) -> StreamReadOptions {
        let mut options = StreamReadOptions::default().group(&self.group, &self.consumer);
        if let Some(count) = self.count {
            options = options.count(count);
        }
        if let Some(block) = self.block {
            options = options.block(block.as_millis() as usize);
        }
        if self.no_ack {
            options = options.noack();
        }
        options
    }
}

/// Arguments for `XAUTOCLAIM`
#[derive(Debug, Clone)]
pub struct XAutoClaimArgs {
    pub stream: String,
    pub group: String,
    pub consumer: String,
    /// Only claim entries pending for at least this long
    pub min_idle: Duration,
    pub start: String,
    pub count: Option<usize>,
}

impl XAutoClaimArgs {
    pub fn new(
        stream: impl Into<String>,
        group: impl Into<String>,
        consumer: impl Into<String>,
        min_idle: Duration,
    ) -> Self {
        Self {
            stream: stream.into(),
            group: group.into(),
            consumer: consumer.into(),
            min_idle,
            start: "0-0".to_string(),
            count: None,
        }
    }

    pub fn start(mut self, start: impl Into<String>) -> Self {
        self.start = start.into();
        self
    }

    pub fn count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub(crate) fn options(&self) -> StreamAutoClaimOptions {
        let options = StreamAutoClaimOptions::default();
        match self.count {
            Some(count) => options.count(count),
            None => options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_of(cmd: &redis::Cmd) -> Vec<String> {
        cmd.args_iter()
            .map(|arg| match arg {
                redis::Arg::Simple(bytes) => String::from_utf8_lossy(bytes).into_owned(),
                redis::Arg::Cursor => "<cursor>".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_xadd_command_defaults() {
        let args = XAddArgs::new("events").field("kind", "click");
        assert_eq!(args_of(&args.command()), ["XADD", "events", "*", "kind", "click"]);
    }

    #[test]
    fn test_xadd_command_options() {
        let args = XAddArgs::new("events")
            .no_mkstream()
            .max_len(1000, true)
            .id("5-0")
            .field("a", "1");
        assert_eq!(
            args_of(&args.command()),
            ["XADD", "events", "NOMKSTREAM", "MAXLEN", "~", "1000", "5-0", "a", "1"]
        );
    }

    #[test]
    fn test_read_group_ids_default_to_new_entries() {
        let mut args = XReadGroupArgs::new("g", "c").stream("s1").stream("s2");
        args.ids = vec!["0".to_string()];
        assert_eq!(args.resolved_ids(), ["0", ">"]);
    }

    #[test]
    fn test_autoclaim_defaults() {
        let args = XAutoClaimArgs::new("s", "g", "c", Duration::from_secs(30));
        assert_eq!(args.start, "0-0");
        assert_eq!(args.count, None);
    }
}
