pub mod ffmpeg_container_writer;
