//! Interactive 3D visualiser for robot middleware traffic: a frame tree,
//! plain markers and server-driven interactive markers, drawn through an
//! orbit camera and manipulated by touch.

pub mod engine;
pub mod messages;
pub mod rpc;
pub mod tools;
