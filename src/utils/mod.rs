pub mod file_io;

pub mod time;

pub mod wait;

#[cfg(test)]
mod file_io_test;
