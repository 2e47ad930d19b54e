pub mod replay;
pub mod verify;
