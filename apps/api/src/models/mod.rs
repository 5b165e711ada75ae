pub mod claim;
pub mod evidence;
pub mod opportunity;
pub mod profile;
