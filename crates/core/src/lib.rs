//! Camera frame pipeline: synchronized audio/video recording with
//! orientation-aware, single-flight face detection.

pub mod shared {
    pub mod audio_chunk;
    pub mod callback_slot;
    pub mod constants;
    pub mod error;
    pub mod frame;
    pub mod media_time;
    pub mod sample_buffer;
    pub mod settings;
}

pub mod orientation {
    pub mod domain {
        pub mod device_orientation;
        pub mod orientation_mapper;
        pub mod orientation_tracker;
    }
}

pub mod detection {
    pub mod domain {
        pub mod detection_config;
        pub mod detection_error;
        pub mod detection_event;
        pub mod face_detector;
        pub mod face_record;
        pub mod face_remapper;
    }
    pub mod infrastructure;
}

pub mod recording {
    pub mod domain {
        pub mod container_writer;
        pub mod output_location;
        pub mod recording_error;
        pub mod recording_result;
        pub mod recording_state;
    }
    pub mod infrastructure;
}

pub mod capture {
    pub mod domain {
        pub mod camera_provider;
        pub mod capture_error;
        pub mod sample_sink;
    }
    pub mod infrastructure;
}

pub mod pipeline;
