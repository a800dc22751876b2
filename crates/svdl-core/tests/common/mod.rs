pub mod concat_stub;
pub mod video_server;
