mod match_collection;

pub use match_collection::{
    MatchCollection,
    MatchGuard,
    MatchIterator,
};
