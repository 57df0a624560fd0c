pub mod codec;
pub mod decoder;
pub mod io;
pub mod settings;
pub mod zlib;
