pub mod fragment;
pub mod ids;
pub mod player;
pub mod story;
