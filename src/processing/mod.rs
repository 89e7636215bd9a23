/*! Record preprocessing.

- [KeyDeriver] validates records and derives their shuffle [OutputKey],
- [ConsistencyGuard] tracks the time bucket baseline of a shard,
- [Emit] hands `(key, record)` pairs to the shuffle,
- [Mapper] ties them together for a single worker.
!*/
mod emitter;
mod guard;
mod key;
mod mapper;

pub use emitter::{ChannelEmitter, Emit};
pub use guard::{ConsistencyGuard, GuardState, MismatchWarning};
pub use key::{derive_key, structural_hash, KeyDeriver, KeyLayout, OutputKey, HASHCODE_FIELD};
pub use mapper::{Mapper, ShardSummary};
