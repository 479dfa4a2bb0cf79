//! The focus-depth and reference-layer engine. Nothing in here draws;
//! visibility reaches the screen through the `Surface` traits.

pub mod debounce;
pub mod focus;
pub mod gestures;
pub mod input;
pub mod layout;
pub mod parser;
pub mod visibility;
