pub mod dbr_count;
pub mod dbr_dict;
pub mod dbr_filter;
pub mod error;
pub mod fastx_utils;
pub mod quality;
pub mod read_id;
pub mod tag_map;
pub mod tasks;
