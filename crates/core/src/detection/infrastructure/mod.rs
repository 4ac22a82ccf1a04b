pub mod image_frame_reader;
pub mod replay_face_detector;
