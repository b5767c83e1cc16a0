pub mod mcg;
pub mod pcg;
