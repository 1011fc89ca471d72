pub mod mpv;

pub use mpv::MpvPlayer;
