use crate::{Command, JobId, ProtocolError, Response, Result, TubeName, MAX_BODY_SIZE, MAX_HEADER_LEN};
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

const CRLF: &[u8] = b"\r\n";

/// Client-side codec for the beanstalkd text protocol
///
/// Commands are single CRLF-terminated lines. Responses are a header line,
/// optionally followed by `<bytes>` of body and a trailing CRLF for
/// `RESERVED <id> <bytes>` and `OK <bytes>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BeanstalkCodec;

/// Parsed header line. Body-carrying variants still need their payload.
enum Header {
    Complete(Response),
    Reserved { id: JobId, len: usize },
    Ok { len: usize },
}

impl Decoder for BeanstalkCodec {
    type Item = Response;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        let line_len = match find_crlf(src) {
            Some(pos) => pos,
            None => {
                if src.len() > MAX_HEADER_LEN + CRLF.len() {
                    return Err(ProtocolError::HeaderTooLong(src.len()));
                }
                return Ok(None);
            }
        };

        if line_len > MAX_HEADER_LEN {
            return Err(ProtocolError::HeaderTooLong(line_len));
        }

        let parsed = {
            let line = &src[..line_len];
            let header = std::str::from_utf8(line)
                .map_err(|_| ProtocolError::MalformedHeader(String::from_utf8_lossy(line).into_owned()))?;
            parse_header(header)?
        };
        let header_len = line_len + CRLF.len();

        let (body_len, reserved_id) = match parsed {
            Header::Complete(response) => {
                src.advance(header_len);
                return Ok(Some(response));
            }
            Header::Reserved { id, len } => (len, Some(id)),
            Header::Ok { len } => (len, None),
        };

        if body_len > MAX_BODY_SIZE {
            return Err(ProtocolError::BodyTooLarge(body_len));
        }

        // Leave the buffer untouched until the whole frame has arrived
        let frame_len = header_len + body_len + CRLF.len();
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        if &src[header_len + body_len..frame_len] != CRLF {
            let header = String::from_utf8_lossy(&src[..line_len]).into_owned();
            return Err(ProtocolError::MissingBodyTerminator(header));
        }

        src.advance(header_len);
        let body = src.split_to(body_len).freeze();
        src.advance(CRLF.len());

        let response = match reserved_id {
            Some(id) => Response::Reserved { id, body },
            None => Response::Ok(body),
        };

        Ok(Some(response))
    }
}

impl Encoder<Command> for BeanstalkCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Command, dst: &mut BytesMut) -> Result<()> {
        let line = item.to_string();

        dst.reserve(line.len() + CRLF.len());
        dst.put_slice(line.as_bytes());
        dst.put_slice(CRLF);

        Ok(())
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(CRLF.len()).position(|window| window == CRLF)
}

fn parse_header(header: &str) -> Result<Header> {
    let malformed = || ProtocolError::MalformedHeader(header.to_string());
    let mut parts = header.split(' ');
    let keyword = parts.next().unwrap_or_default();
    let mut arg = || parts.next().ok_or_else(malformed);

    let parsed = match keyword {
        "RESERVED" => {
            let id = arg()?.parse().map_err(|_| malformed())?;
            let len = arg()?.parse().map_err(|_| malformed())?;
            Header::Reserved { id, len }
        }
        "OK" => {
            let len = arg()?.parse().map_err(|_| malformed())?;
            Header::Ok { len }
        }
        "USING" => {
            let tube = TubeName::new(arg()?).map_err(|_| malformed())?;
            Header::Complete(Response::Using(tube))
        }
        "WATCHING" => {
            let count = arg()?.parse().map_err(|_| malformed())?;
            Header::Complete(Response::Watching(count))
        }
        "DELETED" => Header::Complete(Response::Deleted),
        "NOT_FOUND" => Header::Complete(Response::NotFound),
        "NOT_IGNORED" => Header::Complete(Response::NotIgnored),
        "TIMED_OUT" => Header::Complete(Response::TimedOut),
        "DEADLINE_SOON" => Header::Complete(Response::DeadlineSoon),
        "OUT_OF_MEMORY" => Header::Complete(Response::OutOfMemory),
        "INTERNAL_ERROR" => Header::Complete(Response::InternalError),
        "BAD_FORMAT" => Header::Complete(Response::BadFormat),
        "UNKNOWN_COMMAND" => Header::Complete(Response::UnknownCommand),
        _ => return Err(ProtocolError::UnexpectedResponse(header.to_string())),
    };

    Ok(parsed)
}
