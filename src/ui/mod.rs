//! Drawing. Each layer renders into the frame buffer in stacking order;
//! opacity is applied by blending colours towards the background.

pub mod atmosphere;
pub mod cards;
pub mod editor;
pub mod status;
pub mod surface;
pub mod weather;
