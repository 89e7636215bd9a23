//! Emitting `(key, record)` pairs to the shuffle.
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};

use crate::error::Error;
use crate::record::Record;

use super::OutputKey;

/// Hands pairs over to whatever groups and sorts them.
///
/// Implementors must forward the record unmodified, and may block
/// while the downstream consumer is busy.
pub trait Emit {
    fn emit(&mut self, key: OutputKey, record: Record) -> Result<(), Error>;
}

/// In-memory collection, mostly useful for tests.
impl Emit for Vec<(OutputKey, Record)> {
    fn emit(&mut self, key: OutputKey, record: Record) -> Result<(), Error> {
        self.push((key, record));
        Ok(())
    }
}

impl<E: Emit + ?Sized> Emit for &mut E {
    fn emit(&mut self, key: OutputKey, record: Record) -> Result<(), Error> {
        (**self).emit(key, record)
    }
}

/// Bounded channel emitter.
///
/// [Emit::emit] blocks when `bound` pairs are waiting on the receiving end.
/// There is no timeout: stopping a blocked worker is up to whoever drives it.
pub struct ChannelEmitter {
    tx: SyncSender<(OutputKey, Record)>,
}

impl ChannelEmitter {
    /// Create a new emitter along with its receiving end.
    pub fn bounded(bound: usize) -> (Self, Receiver<(OutputKey, Record)>) {
        let (tx, rx) = sync_channel(bound);
        (Self { tx }, rx)
    }
}

impl Emit for ChannelEmitter {
    fn emit(&mut self, key: OutputKey, record: Record) -> Result<(), Error> {
        self.tx
            .send((key, record))
            .map_err(|_| Error::Emit("shuffle receiver has been dropped".to_string()))
    }
}
