pub mod process_launcher;
