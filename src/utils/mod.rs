pub mod fallback;
pub mod text;
pub mod threads;
