#![allow(dead_code)]

pub mod album_server;
pub mod workdir;
