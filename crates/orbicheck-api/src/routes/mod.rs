pub mod data;
pub mod dedupe;
pub mod normalize;
pub mod orders;
pub mod rules;
pub mod validate;
pub mod verify;
