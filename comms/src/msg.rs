use std::{borrow::Cow, io};

use bytemuck::{Pod, Zeroable};

use crate::{Deserialize, Serialize};

type Header = u32;
const HEADER_SIZE: usize = size_of::<Header>();

const ERR_H: Header = 0;
const CONTROL_H: Header = 1;
const MINLOC_H: Header = 2;
const COORD_X_H: Header = 3;
const COORD_Y_H: Header = 4;

/// A `(value, rank)` pair as carried by the minloc reduction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinLoc {
    pub value: f64,
    pub rank: usize,
}

/// The axis a transferred coordinate belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// The payload data for the `Data` variant of the `Msg` enum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Payload {
    MinLoc(MinLoc),
    Coordinate(Axis, f64),
}

/// The command for the `Control` variant of the `Msg` enum.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Hello { rank: usize, size: usize },
    Barrier,
    Disconnect,
}

/// The application layer message for the entire system.
#[derive(Debug)]
pub enum Msg<'a> {
    Control(Command),
    Data(Payload),
    Err(Cow<'a, str>),
}

impl Msg<'_> {
    /// A short name of the message kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Msg::Control(Command::Hello { .. }) => "control/hello",
            Msg::Control(Command::Barrier) => "control/barrier",
            Msg::Control(Command::Disconnect) => "control/disconnect",
            Msg::Data(Payload::MinLoc(_)) => "data/minloc",
            Msg::Data(Payload::Coordinate(Axis::X, _)) => "data/x",
            Msg::Data(Payload::Coordinate(Axis::Y, _)) => "data/y",
            Msg::Err(_) => "err",
        }
    }

    fn buf_is_too_small<T>(size: usize, expected: usize) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("The given buffer is too small {size}, must at least be {expected} bytes"),
        ))
    }

    fn invalid_kind<T>(kind: Header) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Received an invalid kind header {kind}"),
        ))
    }
}

/// Plain-old-data layout of a `MinLoc` on the wire.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct MinLocWire {
    value: f64,
    rank: u64,
}

fn read_pod<T: Pod>(body: &[u8]) -> io::Result<T> {
    if body.len() != size_of::<T>() {
        return Msg::buf_is_too_small(body.len(), size_of::<T>());
    }

    bytemuck::try_pod_read_unaligned(body)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("{e:?}")))
}

impl<'a> Serialize<'a> for Msg<'a> {
    fn serialize(&'a self, buf: &mut Vec<u8>) -> Option<&'a [u8]> {
        match self {
            Msg::Err(e) => {
                buf.extend_from_slice(&ERR_H.to_be_bytes());
                Some(e.as_bytes())
            }
            Msg::Control(cmd) => {
                buf.extend_from_slice(&CONTROL_H.to_be_bytes());

                // SAFETY: Serialize impl for `Command` is derived and not implemented
                //         by hand. Nor has a non string-key map inside.
                serde_json::to_writer(buf, cmd).unwrap();
                None
            }
            Msg::Data(Payload::MinLoc(minloc)) => {
                buf.extend_from_slice(&MINLOC_H.to_be_bytes());

                let wire = MinLocWire {
                    value: minloc.value,
                    rank: minloc.rank as u64,
                };

                buf.extend_from_slice(bytemuck::bytes_of(&wire));
                None
            }
            Msg::Data(Payload::Coordinate(axis, value)) => {
                let header = match axis {
                    Axis::X => COORD_X_H,
                    Axis::Y => COORD_Y_H,
                };

                buf.extend_from_slice(&header.to_be_bytes());
                buf.extend_from_slice(bytemuck::bytes_of(value));
                None
            }
        }
    }
}

impl<'a> Deserialize<'a> for Msg<'a> {
    fn deserialize(buf: &'a [u8]) -> io::Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Self::buf_is_too_small(buf.len(), HEADER_SIZE);
        }

        let (kind_buf, rest) = buf.split_at(HEADER_SIZE);

        // SAFETY: We splitted the buffer to be of size `HEADER_SIZE` just above.
        let kind = Header::from_be_bytes(kind_buf.try_into().unwrap());

        match kind {
            ERR_H => {
                let string = str::from_utf8(rest)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

                Ok(Self::Err(Cow::Borrowed(string)))
            }
            CONTROL_H => {
                let cmd = serde_json::from_slice(rest)?;
                Ok(Self::Control(cmd))
            }
            MINLOC_H => {
                let wire: MinLocWire = read_pod(rest)?;
                let minloc = MinLoc {
                    value: wire.value,
                    rank: wire.rank as usize,
                };

                Ok(Self::Data(Payload::MinLoc(minloc)))
            }
            COORD_X_H | COORD_Y_H => {
                let axis = if kind == COORD_X_H { Axis::X } else { Axis::Y };
                let value: f64 = read_pod(rest)?;
                Ok(Self::Data(Payload::Coordinate(axis, value)))
            }
            other => Self::invalid_kind(other),
        }
    }
}
