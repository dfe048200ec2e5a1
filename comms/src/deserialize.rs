use std::io;

/// Decodes a message from the body of one received frame.
///
/// The length prefix is already stripped, `buf` holds exactly the bytes the
/// peer's `Serialize` impl produced, zero-copy tail included. Implementors
/// may borrow from `buf` for as long as the receive buffer lives.
pub trait Deserialize<'a>: Sized {
    /// Fails with `InvalidData` when `buf` is not a well formed message.
    fn deserialize(buf: &'a [u8]) -> io::Result<Self>;
}
