pub mod normalize;
pub mod pairing;

pub use normalize::NameMode;
pub use pairing::Matcher;
