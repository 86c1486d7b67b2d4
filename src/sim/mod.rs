pub mod audio;
pub mod event;
pub mod save;
pub mod session;
pub mod timers;
pub mod world;
