pub mod file_replay_camera;
