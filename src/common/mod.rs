pub mod command_utils;
