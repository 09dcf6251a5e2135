pub mod expansion;
pub mod forwarder;
pub mod normalize;
pub mod outcome;
