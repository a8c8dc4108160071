use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;

use cmdserver_frame::{Frame, FrameReader, OUTPUT};

use crate::error::{ClientError, Result};

const CAPABILITIES_PREFIX: &str = "capabilities: ";
const ENCODING_PREFIX: &str = "encoding: ";

/// Capability every usable server must advertise.
pub const RUNCOMMAND: &str = "runcommand";

/// Session metadata announced by the server's hello message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hello {
    /// Capability tokens, e.g. `runcommand` and `getencoding`.
    pub capabilities: BTreeSet<String>,
    /// The server's encoding label.
    pub encoding: String,
    /// Any further `key: value` lines (newer servers send `pid`, `pgid`, ...).
    pub fields: BTreeMap<String, String>,
}

impl Hello {
    /// Returns true if the server advertised `name`.
    pub fn has_capability(&self, name: &str) -> bool {
        self.capabilities.contains(name)
    }

    /// The server's process id, when announced.
    pub fn pid(&self) -> Option<u32> {
        self.fields.get("pid").and_then(|pid| pid.parse().ok())
    }
}

/// Read and validate the hello frame the server sends right after startup.
pub fn read_hello<R: Read>(reader: &mut FrameReader<R>) -> Result<Hello> {
    let frame = reader.read_frame()?;
    let payload = match frame {
        Frame::Data {
            channel: OUTPUT,
            payload,
        } => payload,
        other => {
            return Err(ClientError::Protocol(format!(
                "expected hello on channel 'o', got channel '{}'",
                char::from(other.channel())
            )));
        }
    };

    let hello = parse_hello(&payload)?;
    tracing::debug!(
        capabilities = ?hello.capabilities,
        encoding = %hello.encoding,
        "command server hello"
    );
    Ok(hello)
}

/// Parse a hello payload.
///
/// The first line lists capabilities and the second names the encoding. A
/// server without `runcommand` is rejected with a capability error.
pub fn parse_hello(payload: &[u8]) -> Result<Hello> {
    let text = std::str::from_utf8(payload)
        .map_err(|err| ClientError::Protocol(format!("hello is not valid UTF-8: {err}")))?;
    let mut lines = text.split('\n');

    let first = lines.next().unwrap_or_default();
    let caps = first
        .strip_prefix(CAPABILITIES_PREFIX)
        .map(str::trim)
        .filter(|rest| !rest.is_empty())
        .ok_or_else(|| bad_hello(CAPABILITIES_PREFIX, first))?;
    let capabilities: BTreeSet<String> = caps.split_whitespace().map(str::to_string).collect();

    if !capabilities.contains(RUNCOMMAND) {
        return Err(ClientError::Capability(RUNCOMMAND.to_string()));
    }

    let second = lines.next().unwrap_or_default();
    let encoding = second
        .strip_prefix(ENCODING_PREFIX)
        .map(str::trim)
        .filter(|rest| !rest.is_empty())
        .ok_or_else(|| bad_hello(ENCODING_PREFIX, second))?
        .to_string();

    let fields = lines
        .filter_map(|line| line.split_once(": "))
        .map(|(key, value)| (key.to_string(), value.trim().to_string()))
        .collect();

    Ok(Hello {
        capabilities,
        encoding,
        fields,
    })
}

fn bad_hello(expected: &str, got: &str) -> ClientError {
    ClientError::Protocol(format!(
        "bad hello message: expected '{expected}', got {got:?}"
    ))
}
