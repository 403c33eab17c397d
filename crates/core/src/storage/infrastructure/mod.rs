pub mod json_face_store;
