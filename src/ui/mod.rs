pub mod controls;
pub mod pipe;
pub mod util;
