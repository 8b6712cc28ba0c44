pub mod artist;
pub mod imprint;
pub mod label;
pub mod tape;
pub mod track;
