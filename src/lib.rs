// Turret Storm: survive the turrets' bullet patterns for as long as you can.
//
// The library is the simulation only.  The terminal front end in
// `main.rs` feeds it elapsed time and pointer input and draws the result.

pub mod compute;
pub mod config;
pub mod entities;
pub mod geometry;
pub mod patterns;
pub mod scheduler;
pub mod turret;
