//! The runcommand exchange.
//!
//! One command is written, then reply frames are routed to handlers until
//! the result channel ends the exchange:
//!
//! ```text
//!   AwaitingFrame ──(o/e/d…: output handler)──▶ AwaitingFrame
//!   AwaitingFrame ──(I/L: input handler, reply)─▶ AwaitingFrame
//!   AwaitingFrame ──(lowercase, unhandled)──────▶ AwaitingFrame
//!   AwaitingFrame ──(r: return code)────────────▶ Terminated
//!   AwaitingFrame ──(uppercase, unhandled)──────▶ fault
//! ```

use std::io::{Read, Write};

use cmdserver_frame::{
    decode_result, is_required, join_args, BlockWriter, Frame, FrameReader, RESULT,
};

use crate::error::{ClientError, Result};

/// Control line that announces a command on the server's input stream.
pub const RUNCOMMAND_LINE: &[u8] = b"runcommand\n";

/// Receives the payload of one output frame.
pub type OutputHandler<'a> = Box<dyn FnMut(&[u8]) -> Result<()> + 'a>;

/// Produces the reply to an input request of the given size.
pub type InputHandler<'a> = Box<dyn FnMut(usize) -> Result<Vec<u8>> + 'a>;

/// A handler bound to one channel.
pub enum Handler<'a> {
    Output(OutputHandler<'a>),
    Input(InputHandler<'a>),
}

/// Per-command channel bindings.
#[derive(Default)]
pub struct Handlers<'a> {
    entries: Vec<(u8, Handler<'a>)>,
}

impl<'a> Handlers<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an output handler, replacing any handler already on `channel`.
    pub fn on_output(
        mut self,
        channel: u8,
        handler: impl FnMut(&[u8]) -> Result<()> + 'a,
    ) -> Self {
        self.insert(channel, Handler::Output(Box::new(handler)));
        self
    }

    /// Bind an input handler, replacing any handler already on `channel`.
    pub fn on_input(
        mut self,
        channel: u8,
        handler: impl FnMut(usize) -> Result<Vec<u8>> + 'a,
    ) -> Self {
        self.insert(channel, Handler::Input(Box::new(handler)));
        self
    }

    pub fn insert(&mut self, channel: u8, handler: Handler<'a>) {
        match self.entries.iter_mut().find(|(id, _)| *id == channel) {
            Some(entry) => entry.1 = handler,
            None => self.entries.push((channel, handler)),
        }
    }

    pub fn contains(&self, channel: u8) -> bool {
        self.entries.iter().any(|(id, _)| *id == channel)
    }

    /// Classify `channel` against the registered handlers.
    pub fn role(&mut self, channel: u8) -> ChannelRole<'_, 'a> {
        match self.entries.iter_mut().find(|(id, _)| *id == channel) {
            Some((_, Handler::Input(handler))) => ChannelRole::Input(handler),
            Some((_, Handler::Output(handler))) => ChannelRole::Output(handler),
            None if channel == RESULT => ChannelRole::Result,
            None if is_required(channel) => ChannelRole::UnrecognizedRequired,
            None => ChannelRole::UnrecognizedOptional,
        }
    }
}

/// What the dispatcher does with a frame on a given channel.
pub enum ChannelRole<'h, 'a> {
    /// Consume the payload, send nothing back.
    Output(&'h mut OutputHandler<'a>),
    /// Produce a reply block.
    Input(&'h mut InputHandler<'a>),
    /// Decode the return code and stop.
    Result,
    /// Uppercase with no handler: the exchange is malformed.
    UnrecognizedRequired,
    /// Lowercase with no handler: skip it.
    UnrecognizedOptional,
}

/// Drives runcommand exchanges over one stream pair.
///
/// Any failure inside an exchange leaves the server mid-command, so the
/// dispatcher refuses further commands after one.
pub struct Dispatcher<R, W> {
    reader: FrameReader<R>,
    writer: BlockWriter<W>,
    faulted: bool,
}

impl<R: Read, W: Write> Dispatcher<R, W> {
    pub fn new(reader: FrameReader<R>, writer: BlockWriter<W>) -> Self {
        Self {
            reader,
            writer,
            faulted: false,
        }
    }

    /// Returns true once an exchange has failed part-way.
    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    /// Send one command and route its reply frames until the return code arrives.
    pub fn run_command<S: AsRef<str>>(
        &mut self,
        args: &[S],
        handlers: &mut Handlers<'_>,
    ) -> Result<i32> {
        if self.faulted {
            return Err(ClientError::Poisoned);
        }

        tracing::debug!(
            command = args.first().map(|arg| arg.as_ref()).unwrap_or_default(),
            argc = args.len(),
            "runcommand"
        );

        match self.exchange(args, handlers) {
            Ok(code) => {
                tracing::debug!(code, "command finished");
                Ok(code)
            }
            Err(err) => {
                self.faulted = true;
                Err(err)
            }
        }
    }

    fn exchange<S: AsRef<str>>(&mut self, args: &[S], handlers: &mut Handlers<'_>) -> Result<i32> {
        self.writer.write_line(RUNCOMMAND_LINE)?;
        self.writer.write_block(&join_args(args))?;

        loop {
            let frame = self.reader.read_frame()?;
            let channel = frame.channel();

            match (handlers.role(channel), frame) {
                (ChannelRole::Input(produce), Frame::Request { size, .. }) => {
                    let mut reply = produce(size)?;
                    if reply.len() > size {
                        tracing::warn!(
                            channel = %char::from(channel),
                            requested = size,
                            produced = reply.len(),
                            "input reply capped to requested size"
                        );
                        reply.truncate(size);
                    }
                    self.writer.write_block(&reply)?;
                }
                (ChannelRole::Output(consume), Frame::Data { payload, .. }) => {
                    consume(&payload[..])?;
                }
                (ChannelRole::Result, Frame::Data { payload, .. }) => {
                    return Ok(decode_result(&payload)?);
                }
                (ChannelRole::UnrecognizedRequired, _) => {
                    return Err(ClientError::Protocol(format!(
                        "unexpected data on required channel '{}'",
                        char::from(channel)
                    )));
                }
                (ChannelRole::UnrecognizedOptional, frame) => {
                    tracing::debug!(
                        channel = %char::from(channel),
                        wire_size = frame.wire_size(),
                        "skipping optional channel"
                    );
                }
                (ChannelRole::Input(_), Frame::Data { .. }) => {
                    return Err(shape_mismatch(channel, "data", "an input request"));
                }
                (ChannelRole::Output(_) | ChannelRole::Result, Frame::Request { .. }) => {
                    return Err(shape_mismatch(channel, "an input request", "data"));
                }
            }
        }
    }

    /// Split back into the reader and writer halves.
    pub fn into_parts(self) -> (FrameReader<R>, BlockWriter<W>) {
        (self.reader, self.writer)
    }
}

fn shape_mismatch(channel: u8, got: &str, expected: &str) -> ClientError {
    ClientError::Protocol(format!(
        "channel '{}' carried {got}, handler expects {expected}",
        char::from(channel)
    ))
}

#[cfg(all(test, unix))]
mod tests {
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::os::unix::net::UnixStream;
    use std::thread;

    use cmdserver_frame::{split_args, BLOCK_INPUT, DEBUG, ERROR, LINE_INPUT, OUTPUT};

    use super::*;

    /// Scripted server output, built frame by frame.
    #[derive(Default)]
    struct Script(Vec<u8>);

    impl Script {
        fn data(mut self, channel: u8, payload: &[u8]) -> Self {
            self.0.push(channel);
            self.0.extend_from_slice(&(payload.len() as u32).to_be_bytes());
            self.0.extend_from_slice(payload);
            self
        }

        fn request(mut self, channel: u8, size: u32) -> Self {
            self.0.push(channel);
            self.0.extend_from_slice(&size.to_be_bytes());
            self
        }

        fn result(self, code: i32) -> Self {
            self.data(RESULT, &code.to_be_bytes())
        }

        fn dispatcher(self) -> Dispatcher<Cursor<Vec<u8>>, Cursor<Vec<u8>>> {
            Dispatcher::new(
                FrameReader::new(Cursor::new(self.0)),
                BlockWriter::new(Cursor::new(Vec::new())),
            )
        }
    }

    fn written(dispatcher: Dispatcher<Cursor<Vec<u8>>, Cursor<Vec<u8>>>) -> Vec<u8> {
        dispatcher.into_parts().1.into_inner().into_inner()
    }

    fn command_bytes(args: &[&str]) -> Vec<u8> {
        let payload = join_args(args);
        let mut out = RUNCOMMAND_LINE.to_vec();
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(&payload);
        out
    }

    #[test]
    fn output_then_result() {
        let mut dispatcher = Script::default().data(OUTPUT, b"ok\n").result(0).dispatcher();
        let out = RefCell::new(Vec::new());
        let mut handlers = Handlers::new().on_output(OUTPUT, |data| {
            out.borrow_mut().extend_from_slice(data);
            Ok(())
        });

        let code = dispatcher.run_command(&["id"], &mut handlers).unwrap();
        drop(handlers);

        assert_eq!(code, 0);
        assert_eq!(out.into_inner(), b"ok\n");
        assert_eq!(written(dispatcher), command_bytes(&["id"]));
    }

    #[test]
    fn negative_return_code() {
        let mut dispatcher = Script::default().result(-1).dispatcher();
        let code = dispatcher.run_command(&["verify"], &mut Handlers::new()).unwrap();
        assert_eq!(code, -1);
    }

    #[test]
    fn unhandled_required_channel_fails_and_writes_nothing_more() {
        let mut dispatcher = Script::default()
            .data(b'X', b"surprise")
            .result(0)
            .dispatcher();

        let err = dispatcher.run_command(&["id"], &mut Handlers::new()).unwrap_err();
        assert!(matches!(err, ClientError::Protocol(msg) if msg.contains("required channel 'X'")));
        assert!(dispatcher.is_faulted());
        assert_eq!(written(dispatcher), command_bytes(&["id"]));
    }

    #[test]
    fn unhandled_input_request_is_a_required_channel_fault() {
        let mut dispatcher = Script::default().request(LINE_INPUT, 4096).dispatcher();
        let err = dispatcher.run_command(&["commit"], &mut Handlers::new()).unwrap_err();
        assert!(matches!(err, ClientError::Protocol(_)));
    }

    #[test]
    fn unhandled_optional_channels_are_skipped() {
        let mut dispatcher = Script::default()
            .data(DEBUG, b"debug noise")
            .data(ERROR, b"dropped")
            .data(b'z', b"")
            .result(0)
            .dispatcher();

        let code = dispatcher.run_command(&["id"], &mut Handlers::new()).unwrap();
        assert_eq!(code, 0);
    }

    #[test]
    fn input_request_gets_exactly_one_reply() {
        let mut dispatcher = Script::default()
            .request(BLOCK_INPUT, 4096)
            .data(OUTPUT, b"applying patch\n")
            .result(0)
            .dispatcher();
        let sizes = RefCell::new(Vec::new());
        let mut handlers = Handlers::new()
            .on_input(BLOCK_INPUT, |size| {
                sizes.borrow_mut().push(size);
                Ok(b"diff --git a/a b/a\n".to_vec())
            })
            .on_output(OUTPUT, |_| Ok(()));

        let code = dispatcher.run_command(&["import", "-"], &mut handlers).unwrap();
        drop(handlers);

        assert_eq!(code, 0);
        assert_eq!(sizes.into_inner(), vec![4096]);

        let mut expected = command_bytes(&["import", "-"]);
        expected.extend_from_slice(&19u32.to_be_bytes());
        expected.extend_from_slice(b"diff --git a/a b/a\n");
        assert_eq!(written(dispatcher), expected);
    }

    #[test]
    fn empty_reply_signals_end_of_input() {
        let mut dispatcher = Script::default()
            .request(BLOCK_INPUT, 10)
            .result(0)
            .dispatcher();
        let mut handlers = Handlers::new().on_input(BLOCK_INPUT, |_| Ok(Vec::new()));

        dispatcher.run_command(&["import", "-"], &mut handlers).unwrap();
        drop(handlers);

        let mut expected = command_bytes(&["import", "-"]);
        expected.extend_from_slice(&[0, 0, 0, 0]);
        assert_eq!(written(dispatcher), expected);
    }

    #[test]
    fn oversized_reply_is_capped_to_requested_size() {
        let mut dispatcher = Script::default()
            .request(LINE_INPUT, 4)
            .result(0)
            .dispatcher();
        let mut handlers = Handlers::new().on_input(LINE_INPUT, |_| Ok(b"yes please\n".to_vec()));

        dispatcher.run_command(&["merge"], &mut handlers).unwrap();
        drop(handlers);

        let mut expected = command_bytes(&["merge"]);
        expected.extend_from_slice(&4u32.to_be_bytes());
        expected.extend_from_slice(b"yes ");
        assert_eq!(written(dispatcher), expected);
    }

    #[test]
    fn handler_error_propagates_and_poisons() {
        let mut dispatcher = Script::default()
            .data(OUTPUT, b"x")
            .result(0)
            .data(OUTPUT, b"y")
            .result(0)
            .dispatcher();
        let mut handlers = Handlers::new()
            .on_output(OUTPUT, |_| Err(ClientError::Protocol("sink full".to_string())));

        let err = dispatcher.run_command(&["id"], &mut handlers).unwrap_err();
        assert!(matches!(err, ClientError::Protocol(msg) if msg == "sink full"));

        let err = dispatcher.run_command(&["id"], &mut Handlers::new()).unwrap_err();
        assert!(matches!(err, ClientError::Poisoned));
    }

    #[test]
    fn eof_before_result_is_a_protocol_error() {
        let mut dispatcher = Script::default().data(OUTPUT, b"partial").dispatcher();
        let mut handlers = Handlers::new().on_output(OUTPUT, |_| Ok(()));

        let err = dispatcher.run_command(&["log"], &mut handlers).unwrap_err();
        assert!(err.is_protocol());
        assert!(matches!(
            err,
            ClientError::Frame(cmdserver_frame::FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn malformed_result_payload() {
        let mut dispatcher = Script::default().data(RESULT, b"\0\0").dispatcher();
        let err = dispatcher.run_command(&["id"], &mut Handlers::new()).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Frame(cmdserver_frame::FrameError::InvalidResult { len: 2 })
        ));
    }

    #[test]
    fn input_handler_on_data_channel_is_rejected() {
        let mut dispatcher = Script::default().data(OUTPUT, b"x").result(0).dispatcher();
        let mut handlers = Handlers::new().on_input(OUTPUT, |_| Ok(Vec::new()));

        let err = dispatcher.run_command(&["id"], &mut handlers).unwrap_err();
        assert!(matches!(err, ClientError::Protocol(_)));
    }

    #[test]
    fn registering_twice_replaces_handler() {
        let mut handlers = Handlers::new()
            .on_input(OUTPUT, |_| Ok(Vec::new()))
            .on_output(OUTPUT, |_| Ok(()));

        assert!(handlers.contains(OUTPUT));
        assert!(matches!(handlers.role(OUTPUT), ChannelRole::Output(_)));
        assert!(matches!(handlers.role(RESULT), ChannelRole::Result));
        assert!(matches!(handlers.role(b'Q'), ChannelRole::UnrecognizedRequired));
        assert!(matches!(handlers.role(b'q'), ChannelRole::UnrecognizedOptional));
    }

    #[test]
    fn consecutive_commands_on_one_stream() {
        let mut dispatcher = Script::default()
            .data(OUTPUT, b"first")
            .result(0)
            .data(OUTPUT, b"second")
            .result(1)
            .dispatcher();
        let out = RefCell::new(Vec::new());
        let mut handlers = Handlers::new().on_output(OUTPUT, |data| {
            out.borrow_mut().extend_from_slice(data);
            Ok(())
        });

        assert_eq!(dispatcher.run_command(&["a"], &mut handlers).unwrap(), 0);
        assert_eq!(dispatcher.run_command(&["b"], &mut handlers).unwrap(), 1);
        drop(handlers);
        assert_eq!(out.into_inner(), b"firstsecond");
    }

    #[test]
    fn scripted_server_over_socket_pair() {
        let (client, server) = UnixStream::pair().unwrap();

        let server = thread::spawn(move || {
            let mut reader = server.try_clone().unwrap();
            let mut line = [0u8; 11];
            reader.read_exact(&mut line).unwrap();
            assert_eq!(&line, RUNCOMMAND_LINE);

            let mut len = [0u8; 4];
            reader.read_exact(&mut len).unwrap();
            let mut payload = vec![0u8; u32::from_be_bytes(len) as usize];
            reader.read_exact(&mut payload).unwrap();
            let args: Vec<String> = split_args(&payload)
                .into_iter()
                .map(|a| String::from_utf8(a.to_vec()).unwrap())
                .collect();
            assert_eq!(args, ["commit", "-m", "message"]);

            let mut writer = server;
            let script = Script::default().request(LINE_INPUT, 4096);
            writer.write_all(&script.0).unwrap();

            reader.read_exact(&mut len).unwrap();
            let mut answer = vec![0u8; u32::from_be_bytes(len) as usize];
            reader.read_exact(&mut answer).unwrap();

            let script = Script::default().data(OUTPUT, &answer).result(0);
            writer.write_all(&script.0).unwrap();
        });

        let mut dispatcher = Dispatcher::new(
            FrameReader::new(client.try_clone().unwrap()),
            BlockWriter::new(client),
        );
        let out = RefCell::new(Vec::new());
        let mut handlers = Handlers::new()
            .on_input(LINE_INPUT, |_| Ok(b"y\n".to_vec()))
            .on_output(OUTPUT, |data| {
                out.borrow_mut().extend_from_slice(data);
                Ok(())
            });

        let code = dispatcher
            .run_command(&["commit", "-m", "message"], &mut handlers)
            .unwrap();
        drop(handlers);

        assert_eq!(code, 0);
        assert_eq!(out.into_inner(), b"y\n");
        server.join().unwrap();
    }
}
