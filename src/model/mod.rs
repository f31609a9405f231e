//! Tracked users and channels.

mod channel;
mod user;

pub use self::channel::{Channel, ChannelMembership, DestinationFlag};
pub use self::user::{SkeletonStatus, User};
