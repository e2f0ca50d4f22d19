// mailmask-server/src/lib.rs
pub mod api;
