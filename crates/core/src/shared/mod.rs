pub mod unique_path;
