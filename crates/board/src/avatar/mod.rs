pub mod cache;
pub mod identicon;

pub use cache::{AvatarCache, DEFAULT_AVATAR_CACHE_CAPACITY};
pub use identicon::{Cell, Hsl, IDENTICON_SIZE, Identicon};
