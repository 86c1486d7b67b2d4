pub mod balloon;
pub mod picker;
pub mod rules;
